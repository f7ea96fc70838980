//! HTTP client for the portal API with consistent timeouts and one uniform
//! auth policy. The client attaches bearer tokens from an injected
//! [`SessionStore`], adds the organization-context header for org-scoped
//! calls, and resolves an expired token with exactly one refresh followed by
//! exactly one retry. It never navigates; an unrecoverable 401 is returned
//! as [`ApiError::AuthRequired`] for the caller's router to act on.

pub mod refresh;

use crate::{org::OrgId, session::SessionStore, APP_USER_AGENT};
use reqwest::{header::AUTHORIZATION, Client, Method, Response, StatusCode};
use secrecy::SecretString;
use serde::{de::DeserializeOwned, Serialize};
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, instrument};

/// Default request timeout applied to every API call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error body characters surfaced to callers.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub enum ApiError {
    Config(String),
    Network(String),
    Timeout(String),
    Http { status: u16, message: String },
    Parse(String),
    Serialization(String),
    InvalidOrgId(String),
    AuthRequired { next: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Config(message) => write!(formatter, "Config error: {message}"),
            ApiError::Network(message) => write!(formatter, "Network error: {message}"),
            ApiError::Timeout(message) => write!(formatter, "Timeout: {message}"),
            ApiError::Http { status, message } => {
                write!(formatter, "Request failed ({status}): {message}")
            }
            ApiError::Parse(message) => write!(formatter, "Response error: {message}"),
            ApiError::Serialization(message) => write!(formatter, "Request error: {message}"),
            ApiError::InvalidOrgId(id) => write!(formatter, "Invalid organization id: {id:?}"),
            ApiError::AuthRequired { next } => {
                write!(formatter, "Authentication required, return to {next}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Per-request options for [`ApiClient::send`] and the typed helpers.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Attach `Authorization: Bearer <token>` from the session store.
    ///
    /// Authenticated mutating requests share the single-retry-after-refresh
    /// policy with GETs; the small double-submission risk of that retry is a
    /// documented limitation, not hidden behavior.
    pub auth: bool,
    /// Validated organization context, attached as the `x-org-id` header.
    pub org: Option<OrgId>,
    /// JSON request body.
    pub body: Option<serde_json::Value>,
    /// Path the user should return to after re-authenticating. Defaults to
    /// the request path when unset.
    pub return_to: Option<String>,
}

impl RequestOptions {
    /// Options for a bearer-authenticated request.
    #[must_use]
    pub fn authenticated() -> Self {
        Self {
            auth: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_return_to(mut self, path: impl Into<String>) -> Self {
        self.return_to = Some(path.into());
        self
    }
}

/// Lifecycle of a single authenticated request through the 401 policy.
///
/// `Initial -> AwaitingRefresh -> Retried` is the only path that issues a
/// second attempt; any other transition ends in `Failed`, so a request can
/// never retry more than once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RequestPhase {
    Initial,
    AwaitingRefresh,
    Retried,
    Failed,
}

/// Portal API client bound to a base URL and a shared [`SessionStore`].
///
/// The underlying reqwest client keeps a cookie store so the `HttpOnly`
/// refresh credential set at login rides along on refresh calls.
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: SessionStore,
    refresh_lock: Arc<tokio::sync::Mutex<()>>,
}

impl ApiClient {
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_store(true)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|err| ApiError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            session,
            refresh_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request, resolving an expired token with at most one refresh
    /// and one retry.
    ///
    /// # Errors
    /// Returns [`ApiError::AuthRequired`] when a 401 survives the refresh
    /// policy (the store is cleared first), or a transport/parse error.
    #[instrument(skip(self, options))]
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Response, ApiError> {
        let url = self.endpoint(path);
        let mut phase = RequestPhase::Initial;
        loop {
            // Read before the attempt so a rotation done by a concurrent
            // request between attempt and refresh is visible below.
            let generation = self.session.generation();
            let response = self.execute(method.clone(), &url, options).await?;
            if !(options.auth && response.status() == StatusCode::UNAUTHORIZED) {
                return Ok(response);
            }

            phase = match phase {
                RequestPhase::Initial => RequestPhase::AwaitingRefresh,
                RequestPhase::AwaitingRefresh | RequestPhase::Retried | RequestPhase::Failed => {
                    RequestPhase::Failed
                }
            };
            if phase == RequestPhase::AwaitingRefresh
                && self.refreshed_token(generation).await.is_some()
            {
                phase = RequestPhase::Retried;
                continue;
            }

            // Refresh failed, or the retried request was rejected again.
            debug!("unrecoverable 401 for {path}, clearing session");
            self.session.clear();
            return Err(ApiError::AuthRequired {
                next: options
                    .return_to
                    .clone()
                    .unwrap_or_else(|| path.to_string()),
            });
        }
    }

    /// Fetches JSON from the API.
    ///
    /// # Errors
    /// Returns an error for transport failures, non-2xx responses, or
    /// undecodable bodies.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, options).await?;
        handle_json_response(response).await
    }

    /// Fetches JSON, treating 204 and (unauthenticated) 401 as `None`.
    ///
    /// With `options.auth` set, a 401 never reaches this mapping; it is
    /// consumed by the refresh policy in [`ApiClient::send`].
    ///
    /// # Errors
    /// Returns an error for transport failures or other non-2xx responses.
    pub async fn get_optional_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Option<T>, ApiError> {
        let response = self.send(Method::GET, path, options).await?;
        if response.status() == StatusCode::NO_CONTENT
            || response.status() == StatusCode::UNAUTHORIZED
        {
            return Ok(None);
        }
        handle_json_response(response).await.map(Some)
    }

    /// Posts JSON and parses a JSON response.
    ///
    /// # Errors
    /// Returns an error if the body cannot be encoded, the request fails, or
    /// the response cannot be decoded.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        let options = options.clone().with_body(encode_body(body)?);
        let response = self.send(Method::POST, path, &options).await?;
        handle_json_response(response).await
    }

    /// Posts JSON and expects an empty response body.
    ///
    /// # Errors
    /// Returns an error if the body cannot be encoded or the request fails.
    pub async fn post_json_empty<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        options: &RequestOptions,
    ) -> Result<(), ApiError> {
        let options = options.clone().with_body(encode_body(body)?);
        let response = self.send(Method::POST, path, &options).await?;
        handle_empty_response(response).await
    }

    /// Posts an empty body, used for logout-style endpoints.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn post_empty(&self, path: &str, options: &RequestOptions) -> Result<(), ApiError> {
        let response = self.send(Method::POST, path, options).await?;
        handle_empty_response(response).await
    }

    /// Sends a PATCH with a JSON body and parses a JSON response.
    ///
    /// # Errors
    /// Returns an error if the body cannot be encoded, the request fails, or
    /// the response cannot be decoded.
    pub async fn patch_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        let options = options.clone().with_body(encode_body(body)?);
        let response = self.send(Method::PATCH, path, &options).await?;
        handle_json_response(response).await
    }

    /// Deletes a resource and expects an empty response body.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn delete(&self, path: &str, options: &RequestOptions) -> Result<(), ApiError> {
        let response = self.send(Method::DELETE, path, options).await?;
        handle_empty_response(response).await
    }

    /// One attempt on the wire, with whatever token the store holds now.
    async fn execute(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<Response, ApiError> {
        let mut builder = self.http.request(method, url);
        if options.auth {
            if let Some(bearer) = self.session.bearer() {
                builder = builder.header(AUTHORIZATION, bearer);
            }
        }
        if let Some(org) = &options.org {
            builder = builder.header(crate::org::ORG_HEADER, org.as_str());
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }
        builder.send().await.map_err(map_request_error)
    }

    /// Single-flight refresh shared by all concurrent 401 handlers.
    ///
    /// `seen` is the store generation observed before the failed attempt.
    /// If it moved while waiting for the lock, another request already
    /// rotated the token and this caller reuses it instead of rotating the
    /// refresh credential a second time.
    async fn refreshed_token(&self, seen: u64) -> Option<SecretString> {
        let _guard = self.refresh_lock.lock().await;
        if self.session.generation() != seen {
            return self.session.token();
        }
        refresh::refresh_access_token(&self.http, &self.base_url, &self.session).await
    }

    /// Joins the base URL and the request path, tolerating stray slashes.
    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        let path = path.trim();
        if base.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", base, path.trim_start_matches('/'))
        }
    }
}

fn encode_body<B: Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body)
        .map_err(|err| ApiError::Serialization(format!("Failed to encode request: {err}")))
}

/// Maps transport errors into user-facing variants with timeout detection.
fn map_request_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout("Request timed out. Please try again.".to_string())
    } else {
        ApiError::Network(format!("Unable to reach the server: {err}"))
    }
}

/// Parses JSON responses and surfaces HTTP errors with sanitized bodies.
async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    if response.status().is_success() {
        response
            .json::<T>()
            .await
            .map_err(|err| ApiError::Parse(format!("Failed to decode response: {err}")))
    } else {
        Err(http_error(response).await)
    }
}

/// Handles empty responses and returns sanitized HTTP errors when needed.
async fn handle_empty_response(response: Response) -> Result<(), ApiError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(http_error(response).await)
    }
}

async fn http_error(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ApiError::Http {
        status,
        message: sanitize_body(body),
    }
}

/// Trims and truncates HTTP error bodies for user-facing messages.
fn sanitize_body(body: String) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::org::with_org_context;
    use anyhow::{anyhow, Result};
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn client_with_token(base_url: &str, token: &str) -> Result<ApiClient> {
        let session = SessionStore::new();
        session.set_token(SecretString::from(token.to_string()));
        Ok(ApiClient::new(base_url, session)?)
    }

    #[test]
    fn endpoint_joins_base_and_path() -> Result<()> {
        let client = ApiClient::new("http://api.example/", SessionStore::new())?;
        assert_eq!(
            client.endpoint("/me/profile"),
            "http://api.example/me/profile"
        );
        assert_eq!(
            client.endpoint("me/profile"),
            "http://api.example/me/profile"
        );
        Ok(())
    }

    #[test]
    fn sanitize_body_trims_truncates_and_defaults() {
        assert_eq!(sanitize_body(String::new()), "Request failed.");
        assert_eq!(sanitize_body("  boom  ".to_string()), "boom");
        let long = "x".repeat(500);
        assert_eq!(sanitize_body(long).len(), MAX_ERROR_CHARS);
    }

    #[tokio::test]
    async fn attaches_bearer_token_from_the_store() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me/profile"))
            .and(header("authorization", "Bearer t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "t1")?;
        let body: serde_json::Value = client
            .get_json("/me/profile", &RequestOptions::authenticated())
            .await?;
        assert_eq!(body, json!({"ok": true}));
        Ok(())
    }

    #[tokio::test]
    async fn retries_exactly_once_with_the_new_token() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me/profile"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"accessToken": "fresh"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/me/profile"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "stale")?;
        let body: serde_json::Value = client
            .get_json("/me/profile", &RequestOptions::authenticated())
            .await?;
        assert_eq!(body["id"], "u1");
        assert_eq!(client.session().bearer().as_deref(), Some("Bearer fresh"));
        Ok(())
    }

    #[tokio::test]
    async fn failed_refresh_clears_the_store_and_requires_auth() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me/profile"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "stale")?;
        let err = client
            .get_json::<serde_json::Value>("/me/profile", &RequestOptions::authenticated())
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;
        match err {
            ApiError::AuthRequired { next } => assert_eq!(next, "/me/profile"),
            other => return Err(anyhow!("unexpected error: {other}")),
        }
        assert!(!client.session().has_token());
        Ok(())
    }

    #[tokio::test]
    async fn second_401_after_refresh_stops_without_a_third_attempt() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me/profile"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"accessToken": "fresh"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "stale")?;
        let options = RequestOptions::authenticated().with_return_to("/me?tab=info");
        let err = client
            .get_json::<serde_json::Value>("/me/profile", &options)
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;
        match err {
            ApiError::AuthRequired { next } => assert_eq!(next, "/me?tab=info"),
            other => return Err(anyhow!("unexpected error: {other}")),
        }
        assert!(!client.session().has_token());
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_401s_share_a_single_refresh() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/orgs/members"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"accessToken": "fresh"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/orgs/members"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "stale")?;
        let options = RequestOptions::authenticated();
        let (first, second) = tokio::join!(
            client.get_json::<serde_json::Value>("/orgs/members", &options),
            client.get_json::<serde_json::Value>("/orgs/members", &options),
        );
        assert!(first.is_ok());
        assert!(second.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn non_401_failures_surface_status_and_message() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/orgs/settings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "t1")?;
        let err = client
            .get_json::<serde_json::Value>("/orgs/settings", &RequestOptions::authenticated())
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;
        match err {
            ApiError::Http { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => return Err(anyhow!("unexpected error: {other}")),
        }
        Ok(())
    }

    #[tokio::test]
    async fn unauthenticated_401_maps_to_none_without_retry() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me/profile"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), SessionStore::new())?;
        let profile: Option<serde_json::Value> = client
            .get_optional_json("/me/profile", &RequestOptions::default())
            .await?;
        assert!(profile.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn org_scoped_options_attach_the_org_header() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let org_id = "2f1aab1e-3c11-4e29-9d44-6f5a8b7c0d12";

        Mock::given(method("GET"))
            .and(path("/orgs/members"))
            .and(header("x-org-id", org_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "t1")?;
        let options = with_org_context(Some(org_id), RequestOptions::authenticated())?;
        let members: Vec<serde_json::Value> = client.get_json("/orgs/members", &options).await?;
        assert!(members.is_empty());
        Ok(())
    }
}
