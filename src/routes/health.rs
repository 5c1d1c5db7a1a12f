// src/routes/health.rs
//! Liveness endpoint for the AQI service.
//!
//! Sibling module in the `routes` directory following the Explicit Module
//! Boundary Pattern (EMBP): the handler stays private and the gateway
//! (`mod.rs`) merges the subrouter returned by [`router`].

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Handle `GET /health`.
///
/// Never touches the database or the upstream feeds, so it stays green while
/// a feed is down.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Subrouter with the `/health` route, generic over the gateway's state type.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
