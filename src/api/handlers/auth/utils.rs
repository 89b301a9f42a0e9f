//! Header helpers shared by the auth handlers.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{AUTHORIZATION, COOKIE, FORWARDED},
};

pub const RATE_LIMIT_HEADER: &str = "x-login-ratelimit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-login-ratelimit-remaining";

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Whether the client reached us over HTTPS, as reported by the proxy in front.
pub(super) fn request_is_secure(headers: &HeaderMap) -> bool {
    let forwarded_proto = headers
        .get(X_FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"));
    if forwarded_proto {
        return true;
    }

    // Forwarded: for=1.2.3.4;proto=https, for=...
    headers
        .get(FORWARDED)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .is_some_and(|first_hop| {
            first_hop.split(';').any(|pair| {
                let mut parts = pair.trim().splitn(2, '=');
                let key = parts.next().unwrap_or_default().trim();
                let value = parts.next().unwrap_or_default().trim().trim_matches('"');
                key.eq_ignore_ascii_case("proto") && value.eq_ignore_ascii_case("https")
            })
        })
}

/// Insert `X-Login-RateLimit` and `X-Login-RateLimit-Remaining`.
pub(super) fn insert_rate_limit_headers(headers: &mut HeaderMap, ceiling: i64, remaining: i64) {
    headers.insert(RATE_LIMIT_HEADER, HeaderValue::from(ceiling));
    headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(remaining));
}

/// Bearer token first, then the named cookie.
pub(super) fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == cookie_name && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
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
