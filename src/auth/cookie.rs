//! Session cookie handling
//!
//! The session token is carried in an HTTP-only `token` cookie with
//! `SameSite=Strict`. `Secure` is added outside dev mode.

use hyper::header::{HeaderMap, AUTHORIZATION, COOKIE};

use super::jwt::extract_token_from_header;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "token";

/// Build the `Set-Cookie` value that stores a session token
pub fn session_cookie(token: &str, max_age_seconds: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build the `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

/// Find a cookie value by name in a `Cookie` header value
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Extract the session token from request headers.
///
/// The `token` cookie wins; `Authorization: Bearer` is the fallback.
pub fn extract_session_token(headers: &HeaderMap) -> Option<&str> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|header| cookie_value(header, SESSION_COOKIE));

    from_cookie.or_else(|| {
        extract_token_from_header(headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()))
    })
}
