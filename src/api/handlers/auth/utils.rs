//! Small helpers for input normalization and credential extraction.

use axum::http::{header::AUTHORIZATION, header::COOKIE, HeaderMap};
use regex::Regex;
use std::sync::LazyLock;

// Compiled once; the pattern is a literal, so construction cannot fail at
// runtime with anything a caller could handle.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Usernames are stored lowercase so lookups are case-insensitive.
pub(super) fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    EMAIL_RE.is_match(email_normalized)
}

/// Read a named cookie from the request headers.
pub(super) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let key = parts.next().map(str::trim);
        let val = parts.next().map(str::trim).unwrap_or_default();
        if key == Some(name) && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

/// Read a bearer token from the `Authorization` header.
pub(super) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn normalize_username_trims_and_lowercases() {
        assert_eq!(normalize_username(" Alice "), "alice");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn email_pattern_compiles_and_is_reusable() {
        // First call initializes the static; later calls reuse it.
        assert!(valid_email("first@example.com"));
        assert!(valid_email("second@example.com"));
        assert!(!valid_email("still broken"));
    }

    #[test]
    fn cookie_value_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; accessToken=abc.def.ghi; other=1"),
        );
        assert_eq!(
            cookie_value(&headers, "accessToken"),
            Some("abc.def.ghi".to_string())
        );
        assert_eq!(cookie_value(&headers, "refreshToken"), None);
    }

    #[test]
    fn cookie_value_ignores_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("accessToken="));
        assert_eq!(cookie_value(&headers, "accessToken"), None);
    }

    #[test]
    fn bearer_token_strips_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def".to_string()));
    }

    #[test]
    fn bearer_token_rejects_empty_or_missing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
