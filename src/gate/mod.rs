//! Edge gate server: request-time interception in front of the portal
//! renderer. Protected path prefixes are checked for the presence cookie
//! before any page code runs; everything that passes is proxied upstream.

pub mod middleware;
pub mod paths;
pub mod proxy;

use crate::APP_USER_AGENT;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

/// Shared state for the gate's middleware and proxy handler.
pub struct GateState {
    /// Base URL of the portal renderer requests are forwarded to.
    pub upstream: Url,
    /// Name of the plaintext presence cookie set at login.
    pub cookie_name: String,
    pub http: reqwest::Client,
}

/// Start the edge gate server.
///
/// # Errors
/// Returns an error if the upstream URL is invalid or the server fails to
/// start.
pub async fn new(port: u16, upstream: String, cookie_name: String) -> Result<()> {
    let upstream = Url::parse(&upstream).context("Invalid upstream URL")?;
    let http = reqwest::Client::builder()
        .user_agent(APP_USER_AGENT)
        .build()?;
    let state = Arc::new(GateState {
        upstream,
        cookie_name,
        http,
    });

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Build the gate router: health endpoint, edge gate middleware, proxy
/// fallback, request-id and trace layers.
pub fn router(state: Arc<GateState>) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .fallback(proxy::forward)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::edge_gate,
                )),
        )
        .with_state(state)
}

// axum handler for health
async fn health() -> impl IntoResponse {
    let body = Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }));

    let mut headers = HeaderMap::new();
    if let Ok(value) = format!("{}:{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")).parse() {
        headers.insert("X-App", value);
    }

    (headers, body)
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
