use axum::http::{header, HeaderMap, HeaderValue};

/// Attributes shared by every cookie the service sets
#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub secure: bool,
    pub same_site: &'static str,
    /// `None` yields a browser-session cookie
    pub max_age: Option<u64>,
}

impl CookieOptions {
    pub fn lax(secure: bool, max_age: Option<u64>) -> Self {
        Self {
            secure,
            same_site: "Lax",
            max_age,
        }
    }

    pub fn strict(secure: bool, max_age: Option<u64>) -> Self {
        Self {
            secure,
            same_site: "Strict",
            max_age,
        }
    }
}

/// Build an HttpOnly Set-Cookie value
pub fn build_cookie(name: &str, value: &str, options: CookieOptions) -> Option<HeaderValue> {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite={}; Path=/",
        name, value, options.same_site
    );
    if let Some(max_age) = options.max_age {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

/// Set-Cookie value that removes `name` from the browser
pub fn expired_cookie(name: &str, secure: bool) -> Option<HeaderValue> {
    build_cookie(name, "", CookieOptions::lax(secure, Some(0)))
}

/// Read a cookie from the request's Cookie headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Append a Set-Cookie header, keeping any already present
pub fn append_cookie(headers: &mut HeaderMap, cookie: Option<HeaderValue>) {
    if let Some(cookie) = cookie {
        headers.append(header::SET_COOKIE, cookie);
    }
}
