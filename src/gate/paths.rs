//! Protected path set and login redirect contract.
//!
//! This is the single source of truth for which prefixes the edge gate
//! protects and how the `next` return path is encoded. The client guard
//! builds its login URL through the same function, so both layers populate
//! `next` identically.

use axum::http::Uri;
use url::form_urlencoded;

/// Path prefixes that never reach the upstream renderer unauthenticated:
/// the account area and the gated AI-chat feature.
pub const PROTECTED_PREFIXES: &[&str] = &["/me", "/orgs", "/chat"];

pub const LOGIN_PATH: &str = "/login";

/// Whether the edge gate protects this path. Matches whole segments only,
/// so `/members` is not captured by the `/me` prefix.
#[must_use]
pub fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Builds the login URL with `next` set to the given return path.
#[must_use]
pub fn login_url(next: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={encoded}")
}

/// The originally requested path plus query string, as captured at
/// redirect time.
#[must_use]
pub fn original_path(uri: &Uri) -> String {
    match uri.query() {
        Some(query) => format!("{}?{query}", uri.path()),
        None => uri.path().to_string(),
    }
}
