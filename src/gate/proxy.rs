//! Reverse proxy fallback: requests that clear the edge gate are forwarded
//! to the upstream portal renderer unmodified and the response is relayed
//! back, preserving repeated headers such as `Set-Cookie`.

use crate::gate::GateState;
use anyhow::{Context, Result};
use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::{
        header::{HOST, TRANSFER_ENCODING},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

/// Cap on buffered request/response bodies; the portal serves pages and
/// JSON, not large uploads, through this gate.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub async fn forward(State(state): State<Arc<GateState>>, request: Request) -> Response {
    match forward_inner(&state, request).await {
        Ok(response) => response,
        Err(err) => {
            error!("upstream proxy error: {err:#}");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

async fn forward_inner(state: &GateState, request: Request) -> Result<Response> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .context("Failed to buffer request body")?;

    let mut url = state.upstream.clone();
    url.set_path(parts.uri.path());
    url.set_query(parts.uri.query());

    let mut builder = state.http.request(parts.method.clone(), url);
    for (name, value) in &parts.headers {
        // The upstream client sets its own Host from the URL.
        if name == &HOST {
            continue;
        }
        builder = builder.header(name.clone(), value.clone());
    }

    let upstream = builder
        .body(body)
        .send()
        .await
        .context("Upstream request failed")?;

    let status = upstream.status();
    let mut headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        if name == &TRANSFER_ENCODING {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    let body = upstream
        .bytes()
        .await
        .context("Failed to read upstream body")?;

    Ok((status, headers, body).into_response())
}
