//! Login and logout against the portal API. Login stores the returned
//! bearer token; the server additionally sets the `HttpOnly` refresh cookie
//! and the plaintext presence cookie the edge gate reads.

use crate::{
    api::{ApiClient, ApiError, RequestOptions},
    portal::types::{LoginRequest, LoginResponse, UserProfile},
};
use secrecy::SecretString;
use tracing::debug;

/// Authenticates and stores the returned access token.
///
/// # Errors
/// Returns an error if the request fails or the credentials are rejected.
pub async fn login(client: &ApiClient, request: &LoginRequest) -> Result<UserProfile, ApiError> {
    let response: LoginResponse = client
        .post_json("/auth/login", request, &RequestOptions::default())
        .await?;
    client
        .session()
        .set_token(SecretString::from(response.access_token));
    Ok(response.user)
}

/// Clears the server-side session, then the local token.
///
/// The local store is cleared even when the server call fails; a dangling
/// in-memory token is worse than a dangling server session.
pub async fn logout(client: &ApiClient) -> Result<(), ApiError> {
    let result = client
        .post_empty("/auth/logout", &RequestOptions::authenticated())
        .await;
    client.session().clear();
    if let Err(err) = &result {
        debug!("logout request failed: {err}");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use anyhow::Result;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[tokio::test]
    async fn login_stores_the_access_token() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": "t1",
                "user": {"id": "u1", "email": "a@b.law"}
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), SessionStore::new())?;
        let request = LoginRequest {
            email: "a@b.law".to_string(),
            password: "hunter2".to_string(),
        };
        let user = login(&client, &request).await?;
        assert_eq!(user.id, "u1");
        assert_eq!(client.session().bearer().as_deref(), Some("Bearer t1"));
        Ok(())
    }

    #[tokio::test]
    async fn logout_clears_the_store_even_on_server_failure() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let session = SessionStore::new();
        session.set_token(SecretString::from("t1".to_string()));
        let client = ApiClient::new(server.uri(), session)?;
        let result = logout(&client).await;
        assert!(result.is_err());
        assert!(!client.session().has_token());
        Ok(())
    }
}
