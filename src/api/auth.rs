// Login and logout endpoints

use crate::api::cookies::append_cookie;
use crate::api::extract::ClientIp;
use crate::api::flash::{consume_notice, read_notice, redirect_with_notice, Notice};
use crate::api::routes::{AppState, DASHBOARD_PATH, LOGIN_PATH};
use crate::api::views;
use crate::auth::gate::{evaluate_session, GateOutcome};
use crate::auth::session::{clear_session_cookie, session_cookie, session_id_from_headers};
use crate::auth::{create_session_data, csrf};
use crate::domain::User;
use crate::observability::MetricsRecorder;
use crate::validation::validate_login_form;
use axum::{
    extract::{rejection::FormRejection, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

// ============================================================================
// Request Types
// ============================================================================

/// Missing fields deserialize as empty so they fail validation like any
/// other bad input
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "_csrf")]
    pub csrf: String,
}

#[derive(Debug, Deserialize)]
pub struct CsrfForm {
    #[serde(default, rename = "_csrf")]
    pub csrf: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /auth/login
pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session_id = session_id_from_headers(&headers, &state.session_config);
    if session_id.is_some() {
        if let Ok(GateOutcome::Valid(_)) =
            evaluate_session(state.sessions.as_ref(), state.users.as_ref(), session_id).await
        {
            return Redirect::to(DASHBOARD_PATH).into_response();
        }
    }

    let (token, csrf_cookie) = csrf::form_token(&headers, state.session_config.cookie_secure);
    let notice = read_notice(&headers);

    let mut response = Html(views::login_page(notice, &token)).into_response();
    append_cookie(response.headers_mut(), csrf_cookie);
    if notice.is_some() {
        consume_notice(response.headers_mut());
    }
    response
}

/// POST /auth/login
///
/// Every credential failure yields the same redirect and notice.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!(ip = ?ip, error = %rejection, "Login body rejected");
            MetricsRecorder::record_login("invalid_input");
            return redirect_with_notice(LOGIN_PATH, Notice::LoginFailed);
        }
    };

    if let Err(e) = csrf::verify(&headers, &form.csrf) {
        warn!(ip = ?ip, error = %e, "Login rejected: CSRF token mismatch");
        MetricsRecorder::record_login("csrf_rejected");
        return redirect_with_notice(LOGIN_PATH, Notice::LoginFailed);
    }

    let credentials = match validate_login_form(&form.username, &form.password) {
        Ok(credentials) => credentials,
        Err(errors) => {
            debug!(ip = ?ip, ?errors, "Login form rejected");
            MetricsRecorder::record_login("invalid_input");
            return redirect_with_notice(LOGIN_PATH, Notice::LoginFailed);
        }
    };

    match state
        .authenticator
        .authenticate(&credentials.username, &credentials.password)
        .await
    {
        Ok(Some(user)) => start_session(&state, &headers, &user, ip.as_deref()).await,
        Ok(None) => {
            warn!(username = %credentials.username, ip = ?ip, "Failed login attempt");
            redirect_with_notice(LOGIN_PATH, Notice::LoginFailed)
        }
        Err(e) => {
            error!(error = %e, "Login failed due to an internal error");
            MetricsRecorder::record_login("error");
            redirect_with_notice(LOGIN_PATH, Notice::LoginError)
        }
    }
}

/// Issue a fresh session id; any id the browser already had is discarded
async fn start_session(state: &AppState, headers: &HeaderMap, user: &User, ip: Option<&str>) -> Response {
    if let Some(previous) = session_id_from_headers(headers, &state.session_config) {
        if let Err(e) = state.sessions.destroy(&previous).await {
            warn!(error = %e, "Failed to discard previous session");
        }
    }

    match state.sessions.create(&create_session_data(user)).await {
        Ok(session_id) => {
            info!(user_id = user.id, role = %user.role, ip = ?ip, "User logged in");
            let mut response = Redirect::to(DASHBOARD_PATH).into_response();
            append_cookie(
                response.headers_mut(),
                session_cookie(&state.session_config, &session_id),
            );
            response
        }
        Err(e) => {
            error!(user_id = user.id, error = %e, "Failed to create session");
            redirect_with_notice(LOGIN_PATH, Notice::LoginError)
        }
    }
}

/// POST /auth/logout
///
/// Destroys the session when there is one and always lands on the login
/// page; a failed destroy is logged, never shown.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<CsrfForm>, FormRejection>,
) -> Response {
    let submitted = match &form {
        Ok(Form(form)) => form.csrf.as_str(),
        Err(rejection) => {
            debug!(error = %rejection, "Logout body rejected");
            ""
        }
    };

    if csrf::verify(&headers, submitted).is_err() {
        warn!("Logout rejected: CSRF token mismatch");
        return redirect_with_notice(DASHBOARD_PATH, Notice::RequestRejected);
    }

    if let Some(session_id) = session_id_from_headers(&headers, &state.session_config) {
        match state.sessions.destroy(&session_id).await {
            Ok(()) => info!(session = ?session_id, "User logged out"),
            Err(e) => error!(error = %e, "Failed to destroy session during logout"),
        }
    }

    let mut response = redirect_with_notice(LOGIN_PATH, Notice::LoggedOut);
    append_cookie(response.headers_mut(), clear_session_cookie(&state.session_config));
    response
}
