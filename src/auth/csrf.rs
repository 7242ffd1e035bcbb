// Double-submit CSRF tokens: an HttpOnly cookie echoed back in a form field

use crate::api::cookies::{build_cookie, cookie_value, CookieOptions};
use crate::crypto::{constant_time_eq, random_token};
use crate::errors::{AppError, Result};
use axum::http::{HeaderMap, HeaderValue};

pub const CSRF_COOKIE: &str = "helpdesk_csrf";
pub const CSRF_FIELD: &str = "_csrf";

const CSRF_TOKEN_BYTES: usize = 32;

/// Token to embed in a rendered form.
///
/// Reuses the browser's existing token; otherwise mints one and returns the
/// cookie that must accompany the page.
pub fn form_token(headers: &HeaderMap, secure: bool) -> (String, Option<HeaderValue>) {
    match cookie_value(headers, CSRF_COOKIE) {
        Some(token) if is_well_formed(&token) => (token, None),
        _ => {
            let token = random_token(CSRF_TOKEN_BYTES);
            let cookie = build_cookie(CSRF_COOKIE, &token, CookieOptions::strict(secure, None));
            (token, cookie)
        }
    }
}

/// Check the submitted form token against the cookie
pub fn verify(headers: &HeaderMap, submitted: &str) -> Result<()> {
    let expected = cookie_value(headers, CSRF_COOKIE).ok_or(AppError::InvalidCsrfToken)?;

    if submitted.is_empty() || !constant_time_eq(expected.as_bytes(), submitted.as_bytes()) {
        return Err(AppError::InvalidCsrfToken);
    }
    Ok(())
}

fn is_well_formed(token: &str) -> bool {
    token.len() == CSRF_TOKEN_BYTES * 2 && token.chars().all(|c| c.is_ascii_hexdigit())
}
