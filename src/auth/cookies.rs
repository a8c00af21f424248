//! Minimal cookie parsing and `Set-Cookie` formatting.

use axum::http::{HeaderMap, header};

/// Value of the first cookie named `name` across all `Cookie` headers.
pub fn get<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"'))
}

/// Format a `Set-Cookie` value scoped to the whole site with `SameSite=Lax`.
pub fn build(name: &str, value: &str, max_age: i64, http_only: bool, secure: bool) -> String {
    let mut cookie = format!("{}={}; Path=/; Max-Age={}; SameSite=Lax", name, value, max_age);
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
