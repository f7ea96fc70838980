//! Access-token refresh against the portal API.
//!
//! The refresh credential is an `HttpOnly` cookie the client never reads;
//! the cookie store attached to the shared HTTP client sends it
//! automatically. No `Authorization` header is attached here, which keeps
//! the flow independent of the token it is trying to replace.

use crate::session::SessionStore;
use reqwest::Client;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::{debug, instrument};

const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

/// Mints a new access token using the refresh cookie.
///
/// On success the store is updated before returning. Every failure mode
/// (transport error, non-2xx, unparseable or empty body) is normalized to
/// `None` so callers can uniformly treat "no new token" as "must
/// re-authenticate"; this function never errors outward.
#[instrument(skip_all)]
pub async fn refresh_access_token(
    http: &Client,
    base_url: &str,
    session: &SessionStore,
) -> Option<SecretString> {
    let url = format!("{}{REFRESH_PATH}", base_url.trim().trim_end_matches('/'));

    let response = match http.post(&url).send().await {
        Ok(response) => response,
        Err(err) => {
            debug!("refresh request failed: {err}");
            return None;
        }
    };

    if !response.status().is_success() {
        debug!("refresh rejected: {}", response.status());
        return None;
    }

    let body: RefreshResponse = match response.json().await {
        Ok(body) => body,
        Err(err) => {
            debug!("refresh response not parseable: {err}");
            return None;
        }
    };

    if body.access_token.is_empty() {
        debug!("refresh response carried an empty token");
        return None;
    }

    let token = SecretString::from(body.access_token);
    session.set_token(token.clone());
    Some(token)
}
