use crate::api::cookies::{append_cookie, build_cookie, cookie_value, expired_cookie, CookieOptions};
use axum::{
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};

pub const FLASH_COOKIE: &str = "helpdesk_flash";

/// Flash notices survive one redirect
const FLASH_MAX_AGE: u64 = 60;

/// One-shot messages shown on the next rendered page.
///
/// Only the code travels in the cookie, so the client never controls the
/// text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    LoginRequired,
    LoginFailed,
    LoginError,
    TooManyAttempts,
    SessionEnded,
    LoggedOut,
    AdminRequired,
    SuperAdminRequired,
    RequestRejected,
    StatusUpdated,
    AccountUnlocked,
    RateLimitReset,
    ActionFailed,
}

impl Notice {
    const ALL: [Notice; 13] = [
        Notice::LoginRequired,
        Notice::LoginFailed,
        Notice::LoginError,
        Notice::TooManyAttempts,
        Notice::SessionEnded,
        Notice::LoggedOut,
        Notice::AdminRequired,
        Notice::SuperAdminRequired,
        Notice::RequestRejected,
        Notice::StatusUpdated,
        Notice::AccountUnlocked,
        Notice::RateLimitReset,
        Notice::ActionFailed,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Notice::LoginRequired => "login_required",
            Notice::LoginFailed => "login_failed",
            Notice::LoginError => "login_error",
            Notice::TooManyAttempts => "too_many_attempts",
            Notice::SessionEnded => "session_ended",
            Notice::LoggedOut => "logged_out",
            Notice::AdminRequired => "admin_required",
            Notice::SuperAdminRequired => "super_admin_required",
            Notice::RequestRejected => "request_rejected",
            Notice::StatusUpdated => "status_updated",
            Notice::AccountUnlocked => "account_unlocked",
            Notice::RateLimitReset => "rate_limit_reset",
            Notice::ActionFailed => "action_failed",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|notice| notice.code() == code)
    }

    pub fn message(&self) -> &'static str {
        match self {
            Notice::LoginRequired => "Please log in to access this page.",
            Notice::LoginFailed => "Invalid username or password.",
            Notice::LoginError => "An error occurred during login. Please try again.",
            Notice::TooManyAttempts => "Too many login attempts. Please try again later.",
            Notice::SessionEnded => "Your session has expired. Please log in again.",
            Notice::LoggedOut => "You have been logged out.",
            Notice::AdminRequired => "Access denied. Admin privileges required.",
            Notice::SuperAdminRequired => "Access denied. Super admin privileges required.",
            Notice::RequestRejected => "Your request could not be verified. Please try again.",
            Notice::StatusUpdated => "User status updated.",
            Notice::AccountUnlocked => "Account unlocked.",
            Notice::RateLimitReset => "Login rate limit cleared for that address.",
            Notice::ActionFailed => "The requested change could not be made.",
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            Notice::LoggedOut | Notice::StatusUpdated | Notice::AccountUnlocked | Notice::RateLimitReset
        )
    }
}

/// Read the pending notice, if any
pub fn read_notice(headers: &HeaderMap) -> Option<Notice> {
    cookie_value(headers, FLASH_COOKIE).and_then(|code| Notice::from_code(&code))
}

/// Redirect to `location`, carrying `notice` to the next page
pub fn redirect_with_notice(location: &str, notice: Notice) -> Response {
    let mut response = Redirect::to(location).into_response();
    append_cookie(
        response.headers_mut(),
        build_cookie(FLASH_COOKIE, notice.code(), CookieOptions::lax(false, Some(FLASH_MAX_AGE))),
    );
    response
}

/// Mark the notice consumed once a page has displayed it
pub fn consume_notice(headers: &mut HeaderMap) {
    append_cookie(headers, expired_cookie(FLASH_COOKIE, false));
}
