//! Edge gate middleware: a coarse, fast first filter in front of the
//! portal renderer. It reads a plaintext cookie purely as a presence
//! signal of "previously logged in" and redirects everything else to the
//! login page before any protected markup is served. Verification of the
//! actual identity stays with the API and the client-side guard.

use crate::{
    gate::{paths, GateState},
    session::SessionState,
};
use axum::{
    extract::{Request, State},
    http::{header::COOKIE, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::debug;

pub async fn edge_gate(
    State(state): State<Arc<GateState>>,
    request: Request,
    next: Next,
) -> Response {
    if paths::is_protected(request.uri().path()) {
        let present = cookie_present(request.headers(), &state.cookie_name);
        if let SessionState::Unauthenticated = SessionState::from_cookie(present) {
            let next_path = paths::original_path(request.uri());
            debug!("no `{}` cookie, redirecting {next_path}", state.cookie_name);
            return Redirect::temporary(&paths::login_url(&next_path)).into_response();
        }
    }
    next.run(request).await
}

/// A blank value counts as absent; the cookie is a presence signal, not a
/// credential.
fn cookie_present(headers: &HeaderMap, name: &str) -> bool {
    cookie_value(headers, name).is_some_and(|value| !value.trim().is_empty())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name {
            return Some(val.to_string());
        }
    }
    None
}
