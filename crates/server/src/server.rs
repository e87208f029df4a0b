//! HTTP front for the cache controller.
//!
//! Provides /health, /__worker/status, and a catch-all that proxies every
//! other GET through the controller.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode, Uri, header},
    response::Response,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use rutas_client::{CacheController, FetchOutcome, WorkerStatus};

use crate::error::ProxyError;

/// Response headers that describe the upstream connection, not the body we
/// hand back.
const HOP_HEADERS: &[&str] = &[
    "connection",
    "content-encoding",
    "content-length",
    "keep-alive",
    "transfer-encoding",
];

pub struct ServerState {
    pub controller: CacheController,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(controller: CacheController) -> Self {
        Self { controller, started_at: Utc::now() }
    }
}

pub type SharedState = Arc<ServerState>;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: i64,
}

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/__worker/status", get(worker_status))
        .route("/", get(proxy))
        .route("/{*path}", get(proxy))
        .with_state(state)
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds();
    Json(HealthResponse { status: "ok", uptime_secs })
}

async fn worker_status(State(state): State<SharedState>) -> Result<Json<WorkerStatus>, ProxyError> {
    Ok(Json(state.controller.status().await?))
}

async fn proxy(State(state): State<SharedState>, uri: Uri) -> Result<Response, ProxyError> {
    let relative = uri
        .path_and_query()
        .map_or("", |pq| pq.as_str())
        .trim_start_matches('/');
    let relative = if relative.is_empty() { "./" } else { relative };

    let identity = state.controller.manifest().identity_for(relative)?;
    let outcome = state.controller.handle_fetch(&identity).await.inspect_err(|e| {
        tracing::warn!(request = %identity, error = %e, "proxy request failed");
    })?;

    tracing::debug!(
        request = %identity,
        status = outcome.response.status,
        source = outcome.source.as_str(),
        "proxied"
    );

    Ok(into_response(outcome))
}

fn into_response(outcome: FetchOutcome) -> Response {
    let FetchOutcome { source, response: snapshot } = outcome;

    let mut response = Response::new(Body::from(snapshot.body));
    *response.status_mut() = StatusCode::from_u16(snapshot.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let headers = response.headers_mut();
    for (name, value) in &snapshot.headers {
        if HOP_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            headers.append(name, value);
        }
    }
    headers.insert(HeaderName::from_static("x-cache"), HeaderValue::from_static(source.as_str()));
    if !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    }

    response
}
