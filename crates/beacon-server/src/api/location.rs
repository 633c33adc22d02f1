//! Observer location endpoints.
//!
//! The client that owns the GPS receiver pushes fixes here; the tracker
//! reads the latest one on every tick.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use beacon_core::{Coordinate, LocationFix, LocationSource};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the location router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/location", get(get_location).put(update_location))
}

/// Location update request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "latitude": 40.0,
    "longitude": -75.0,
    "accuracy_m": 4.5
}))]
pub struct UpdateLocationRequest {
    /// Latitude in decimal degrees (-90 to 90).
    #[schema(example = 40.0)]
    pub latitude: f64,

    /// Longitude in decimal degrees (-180 to 180).
    #[schema(example = -75.0)]
    pub longitude: f64,

    /// Horizontal accuracy radius in meters.
    #[schema(example = 4.5)]
    pub accuracy_m: Option<f64>,
}

/// Current location response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LocationResponse {
    /// Latest fix, if one has been received.
    pub fix: Option<LocationFix>,
}

/// Get the latest observer fix.
#[utoipa::path(
    get,
    path = "/api/location",
    tag = "location",
    operation_id = "getLocation",
    summary = "Get the latest observer fix",
    responses(
        (status = 200, description = "Latest fix, or null", body = LocationResponse)
    )
)]
pub async fn get_location(State(state): State<SharedState>) -> Json<LocationResponse> {
    let location = state.read().await.location.clone();
    Json(LocationResponse {
        fix: location.current_fix().await,
    })
}

/// Push a new observer fix.
#[utoipa::path(
    put,
    path = "/api/location",
    tag = "location",
    operation_id = "updateLocation",
    summary = "Update the observer fix",
    description = "Records the observer's current GPS position. Position \
        estimates are computed relative to the most recent fix.",
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "Fix recorded", body = LocationResponse),
        (status = 400, description = "Coordinate out of range or at a pole", body = ErrorResponse)
    )
)]
pub async fn update_location(
    State(state): State<SharedState>,
    Json(request): Json<UpdateLocationRequest>,
) -> ApiResult<Json<LocationResponse>> {
    let location = state.read().await.location.clone();
    let fix = location
        .update(
            Coordinate::new(request.latitude, request.longitude),
            request.accuracy_m,
        )
        .await?;

    Ok(Json(LocationResponse { fix: Some(fix) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_accuracy_is_optional() {
        let request: UpdateLocationRequest =
            serde_json::from_str(r#"{"latitude": 1.5, "longitude": 2.5}"#).unwrap();
        assert_eq!(request.latitude, 1.5);
        assert!(request.accuracy_m.is_none());
    }
}
