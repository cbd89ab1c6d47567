//! # Authentication Module
//!
//! API key authentication and nonce checks for the recorder HTTP API.
//!
//! ## Configuration
//!
//! - `RECORDER_API_KEY`: If set, all requests (except /health) require this key
//!
//! ## Usage
//!
//! Send the API key in the Authorization header:
//! ```text
//! Authorization: Bearer <your-api-key>
//! ```
//!
//! A browser cannot set that header on a navigation, `fetch` or
//! `EventSource`. Open the review page once as `/admin?key=<your-api-key>`:
//! the response sets an `HttpOnly` cookie scoped to `/admin`, and the page's
//! own query and message requests authenticate with it.

use axum::{
    body::Body,
    extract::Query,
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use subtle::ConstantTimeEq;

/// Cookie carrying the key for the review page's own requests.
pub const KEY_COOKIE: &str = "recorder_key";

/// Path prefix the cookie is scoped to.
const ADMIN_PATH: &str = "/admin";

// =============================================================================
// CONSTANT-TIME COMPARISON
// =============================================================================

/// Compare two secrets without leaking where they differ or how long they are.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let provided_bytes = provided.as_bytes();
    let expected_bytes = expected.as_bytes();

    // Pad both to the same length so ct_eq always runs over the same bytes.
    let max_len = provided_bytes.len().max(expected_bytes.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided_bytes.len()].copy_from_slice(provided_bytes);
    padded_expected[..expected_bytes.len()].copy_from_slice(expected_bytes);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided_bytes.len() == expected_bytes.len()
}

// =============================================================================
// API KEY AUTHENTICATION
// =============================================================================

/// Get API key from environment variable.
///
/// Returns `Some(key)` if `RECORDER_API_KEY` is set and non-empty,
/// `None` otherwise (disabling authentication).
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("RECORDER_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}

/// Where a request's key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeySource {
    Header,
    Cookie,
    Query,
}

#[derive(Deserialize)]
struct KeyParam {
    key: Option<String>,
}

fn is_admin_path(path: &str) -> bool {
    path == ADMIN_PATH
        || path
            .strip_prefix(ADMIN_PATH)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// The value of `name` in the request's `Cookie` headers.
fn cookie_value(request: &Request<Body>, name: &str) -> Option<String> {
    request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// The key a request presents, and how.
///
/// The header works everywhere. The cookie is read only under `/admin`; the
/// `key` query parameter only on the page itself.
fn provided_key(request: &Request<Body>) -> Option<(String, KeySource)> {
    if let Some(value) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        // Support both "Bearer <key>" and raw "<key>" formats
        let key = value.strip_prefix("Bearer ").unwrap_or(value);
        return Some((key.to_string(), KeySource::Header));
    }

    let path = request.uri().path();
    if !is_admin_path(path) {
        return None;
    }
    if let Some(key) = cookie_value(request, KEY_COOKIE) {
        return Some((key, KeySource::Cookie));
    }
    if path == ADMIN_PATH {
        let key = Query::<KeyParam>::try_from_uri(request.uri())
            .ok()
            .and_then(|Query(param)| param.key)?;
        return Some((key, KeySource::Query));
    }
    None
}

/// `Set-Cookie` value handing the key to the page's later requests.
///
/// `None` when the key holds bytes a cookie value cannot carry.
fn key_cookie(key: &str) -> Option<HeaderValue> {
    if key.bytes().any(|b| matches!(b, b';' | b',' | b'"' | b'\\') || b.is_ascii_whitespace()) {
        return None;
    }
    HeaderValue::from_str(&format!(
        "{KEY_COOKIE}={key}; Path={ADMIN_PATH}; HttpOnly; SameSite=Strict"
    ))
    .ok()
}

/// API key authentication middleware.
///
/// If `RECORDER_API_KEY` is set:
/// - `/health` endpoint is always allowed (for load balancer health checks)
/// - All other endpoints require `Authorization: Bearer <key>` header
/// - `/admin` routes also accept the `recorder_key` cookie, which a valid
///   `/admin?key=<key>` sets
///
/// If `RECORDER_API_KEY` is not set, all requests are allowed.
pub async fn api_key_auth_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(expected) = get_api_key_from_env() else {
        return Ok(next.run(request).await);
    };

    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    match provided_key(&request) {
        Some((provided, source)) if secrets_match(&provided, &expected) => {
            let mut response = next.run(request).await;
            if source == KeySource::Query {
                match key_cookie(&provided) {
                    Some(cookie) => {
                        response.headers_mut().append(header::SET_COOKIE, cookie);
                    }
                    None => tracing::warn!(
                        event = "auth_cookie_skipped",
                        "API key cannot be stored in a cookie; use the Authorization header"
                    ),
                }
            }
            Ok(response)
        }
        Some((_, source)) => {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_api_key",
                source = ?source,
                "Authentication failed: invalid API key"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
