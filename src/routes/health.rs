// src/routes/health.rs
//! API health check endpoint for the analytics backend.
//!
//! `/health` verifies the service is running and able to respond to HTTP
//! requests; container orchestrators and the desktop client's reachability
//! probe both use it. It is a sibling module in the `routes` directory:
//! the gateway (`mod.rs`) merges this subrouter into the top-level router
//! so that `main.rs` does not need to know about individual endpoints.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Handle `GET /health`.
///
/// Returns a static JSON object indicating the API is reachable and
/// functioning. This endpoint is deliberately lightweight and touches
/// neither the database nor the token registry.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Create a subrouter containing the `/health` route.
///
/// This router is generic over the application state so it can merge cleanly
/// with the gateway router, regardless of the state type.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
