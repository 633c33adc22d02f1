//! Tracking API endpoints.
//!
//! Exposes the estimate published by the background tracking loop, plus a
//! way to force an immediate tick.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use beacon_core::{PositionEstimate, Tracker};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the tracking router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/tracking", get(get_tracking))
        .route("/api/tracking/refresh", post(refresh_tracking))
}

/// Observer and beacon positions formatted for display.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "observer_latitude": 40.0,
    "observer_longitude": -75.0,
    "beacon_latitude": "40.0000000",
    "beacon_longitude": "-74.9996292"
}))]
pub struct EstimateDisplay {
    /// Observer latitude, full precision.
    pub observer_latitude: f64,

    /// Observer longitude, full precision.
    pub observer_longitude: f64,

    /// Estimated beacon latitude with seven decimals.
    #[schema(example = "40.0000000")]
    pub beacon_latitude: String,

    /// Estimated beacon longitude with seven decimals.
    #[schema(example = "-74.9996292")]
    pub beacon_longitude: String,
}

impl From<&PositionEstimate> for EstimateDisplay {
    fn from(estimate: &PositionEstimate) -> Self {
        let (beacon_latitude, beacon_longitude) = estimate.estimated.to_fixed_strings();
        Self {
            observer_latitude: estimate.observer.coordinate.latitude,
            observer_longitude: estimate.observer.coordinate.longitude,
            beacon_latitude,
            beacon_longitude,
        }
    }
}

/// Tracking status response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackingResponse {
    /// Tracking session identifier.
    #[schema(example = "0b5e1a8c-8d0c-4c51-9a7e-6a0f7f3f8f0e")]
    pub session_id: String,

    /// Latest estimate, or null before the first successful tick.
    pub estimate: Option<PositionEstimate>,

    /// Display-ready positions for the latest estimate.
    pub display: Option<EstimateDisplay>,
}

impl TrackingResponse {
    fn new(tracker: &Tracker, estimate: Option<PositionEstimate>) -> Self {
        Self {
            session_id: tracker.session_id().to_string(),
            display: estimate.as_ref().map(EstimateDisplay::from),
            estimate,
        }
    }
}

async fn tracker(state: &SharedState) -> ApiResult<Arc<Tracker>> {
    state
        .read()
        .await
        .tracker
        .clone()
        .ok_or_else(ApiError::bluetooth_unavailable)
}

/// Get the latest position estimate.
#[utoipa::path(
    get,
    path = "/api/tracking",
    tag = "tracking",
    operation_id = "getTracking",
    summary = "Get the latest beacon position estimate",
    description = "Returns the most recent estimate published by the tracking \
        loop. Each estimate is one point chosen from a ring of equally \
        plausible candidates; it is illustrative, not a precise fix.",
    responses(
        (status = 200, description = "Latest estimate", body = TrackingResponse),
        (status = 503, description = "Bluetooth radio unavailable", body = ErrorResponse)
    )
)]
pub async fn get_tracking(State(state): State<SharedState>) -> ApiResult<Json<TrackingResponse>> {
    let tracker = tracker(&state).await?;
    let latest = tracker.latest();
    Ok(Json(TrackingResponse::new(&tracker, latest)))
}

/// Produce an estimate now.
#[utoipa::path(
    post,
    path = "/api/tracking/refresh",
    tag = "tracking",
    operation_id = "refreshTracking",
    summary = "Estimate the beacon position immediately",
    description = "Reads the connected beacon's RSSI and the latest observer \
        fix and publishes a new estimate without waiting for the next tick.",
    responses(
        (status = 200, description = "New estimate", body = TrackingResponse),
        (status = 409, description = "No beacon connected or no location fix", body = ErrorResponse),
        (status = 502, description = "Beacon did not report RSSI", body = ErrorResponse),
        (status = 503, description = "Bluetooth radio unavailable", body = ErrorResponse)
    )
)]
pub async fn refresh_tracking(
    State(state): State<SharedState>,
) -> ApiResult<Json<TrackingResponse>> {
    let tracker = tracker(&state).await?;
    let estimate = tracker.tick().await?;
    Ok(Json(TrackingResponse::new(&tracker, Some(estimate))))
}
