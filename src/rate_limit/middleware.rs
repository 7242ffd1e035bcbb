use crate::api::flash::{redirect_with_notice, Notice};
use crate::api::routes::{AppState, LOGIN_PATH};
use crate::observability::MetricsRecorder;
use crate::rate_limit::limiter::RateLimitResult;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::HeaderName, Extensions, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

/// Rate limit identifier shared by requests without a client address
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Client address for rate limiting and audit records.
///
/// `X-Forwarded-For` is only honoured behind a trusted proxy; otherwise the
/// peer address of the connection is used.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions, trust_proxy: bool) -> Option<String> {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return Some(ip.to_string());
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// Rate limit login submissions per client address.
///
/// A rejected request never reaches the handler.
pub async fn login_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ip = client_ip(request.headers(), request.extensions(), state.trust_proxy);
    let identifier = ip.as_deref().unwrap_or(UNKNOWN_CLIENT);

    let result = match state.login_limiter.check(identifier).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Login rate limiter unavailable");
            return redirect_with_notice(LOGIN_PATH, Notice::LoginError);
        }
    };

    if !result.allowed {
        tracing::warn!(
            ip = %identifier,
            limit = %result.limit,
            current = %result.current,
            "Login rate limit exceeded"
        );
        MetricsRecorder::record_rate_limit_exceeded(state.login_limiter.scope());

        let mut response = redirect_with_notice(LOGIN_PATH, Notice::TooManyAttempts);
        add_rate_limit_headers(response.headers_mut(), &result);
        return response;
    }

    let mut response = next.run(request).await;
    add_rate_limit_headers(response.headers_mut(), &result);
    response
}

/// Standard `RateLimit-*` headers, plus `Retry-After` when rejected
pub fn add_rate_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    let mut set = |name: &'static str, value: String| {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    };

    set("ratelimit-limit", result.limit.to_string());
    set("ratelimit-remaining", result.remaining.to_string());
    set("ratelimit-reset", result.reset_after.to_string());
    set("ratelimit-policy", format!("{};w={}", result.limit, result.window));

    if let Some(retry_after) = result.retry_after() {
        set("retry-after", retry_after.to_string());
    }
}
