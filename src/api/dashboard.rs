use crate::api::cookies::append_cookie;
use crate::api::flash::{consume_notice, read_notice};
use crate::api::routes::AppState;
use crate::api::views;
use crate::auth::{csrf, AuthSession};
use axum::{
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    Extension,
};

/// GET /dashboard
pub async fn show(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    headers: HeaderMap,
) -> Response {
    let (token, csrf_cookie) = csrf::form_token(&headers, state.session_config.cookie_secure);
    let notice = read_notice(&headers);

    let mut response = Html(views::dashboard_page(&session.user, notice, &token)).into_response();
    append_cookie(response.headers_mut(), csrf_cookie);
    if notice.is_some() {
        consume_notice(response.headers_mut());
    }
    response
}
