//! Health check API endpoint.
//!
//! Provides a simple health check endpoint for monitoring and load balancers.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::SharedState;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "ok",
    "version": "0.1.0",
    "uptime_secs": 3600,
    "bluetooth_backend": "mock",
    "connected": false
}))]
pub struct HealthResponse {
    /// Service status.
    #[schema(example = "ok")]
    pub status: String,

    /// Service version from Cargo.toml.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Seconds since the server started.
    #[schema(example = 3600)]
    pub uptime_secs: u64,

    /// Active radio backend, or null when no radio is available.
    #[schema(example = "mock")]
    pub bluetooth_backend: Option<String>,

    /// Whether a beacon is connected.
    #[schema(example = false)]
    pub connected: bool,
}

/// Creates the health router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/health", get(health_check))
}

/// Health check endpoint.
///
/// Reports version, uptime and radio status. Always 200 while the process
/// is serving requests, even without a radio.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    operation_id = "healthCheck",
    summary = "Check service health",
    description = "Returns basic service status information. Use this endpoint \
        for load balancer health checks and monitoring.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let (uptime_secs, beacons) = {
        let state_guard = state.read().await;
        (
            state_guard.started_at.elapsed().as_secs(),
            state_guard.beacons.clone(),
        )
    };

    let (bluetooth_backend, connected) = match beacons {
        Some(beacons) => (
            Some(beacons.backend_name().to_string()),
            beacons.connected().await.is_some(),
        ),
        None => (None, false),
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs,
        bluetooth_backend,
        connected,
    })
}
