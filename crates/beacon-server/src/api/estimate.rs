//! Stateless estimation endpoints.
//!
//! Direct access to the estimator: distance from RSSI, candidate rings and
//! single-bearing positions. Inputs are validated here because the estimator
//! itself accepts anything.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use beacon_core::estimator::{BearingPolicy, FULL_SWEEP_BEARINGS};
use beacon_core::{estimate, estimate_single_position, Coordinate, PathLossModel};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the estimation router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/estimate/distance", post(estimate_distance))
        .route("/api/estimate/ring", post(estimate_ring))
        .route("/api/estimate/position", post(estimate_position))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Distance estimation request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({ "rssi_dbm": -70.0 }))]
pub struct DistanceRequest {
    /// Measured RSSI in dBm.
    #[schema(example = -70.0)]
    pub rssi_dbm: f64,

    /// Override for the expected RSSI at one meter. Defaults to the configured value.
    #[schema(example = -40.0)]
    pub reference_rssi_dbm: Option<f64>,

    /// Override for the path-loss exponent. Defaults to the configured value.
    #[schema(example = 2.0)]
    pub path_loss_exponent: Option<f64>,
}

/// Distance estimation response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "distance_m": 31.622776601683793,
    "model": { "reference_rssi_dbm": -40.0, "path_loss_exponent": 2.0 }
}))]
pub struct DistanceResponse {
    /// Estimated distance in meters.
    pub distance_m: f64,

    /// Model used.
    pub model: PathLossModel,
}

/// Candidate ring request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "observer": { "latitude": 40.0, "longitude": -75.0 },
    "distance_m": 31.6227766,
    "sample_count": 8
}))]
pub struct RingRequest {
    /// Observer position.
    pub observer: Coordinate,

    /// Ring radius in meters.
    #[schema(example = 31.622_776_6)]
    pub distance_m: f64,

    /// Number of equally spaced candidates. Omit for a full 360-point sweep.
    #[schema(example = 8, minimum = 1, maximum = 360)]
    pub sample_count: Option<usize>,
}

/// A coordinate rendered with seven decimal places.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FormattedCoordinate {
    /// Latitude, seven decimals.
    #[schema(example = "40.0002023")]
    pub latitude: String,

    /// Longitude, seven decimals.
    #[schema(example = "-74.9997378")]
    pub longitude: String,
}

impl From<&Coordinate> for FormattedCoordinate {
    fn from(coordinate: &Coordinate) -> Self {
        let (latitude, longitude) = coordinate.to_fixed_strings();
        Self {
            latitude,
            longitude,
        }
    }
}

/// Candidate ring response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RingResponse {
    /// Observer position.
    pub observer: Coordinate,

    /// Ring radius in meters.
    pub distance_m: f64,

    /// Bearing of each candidate in degrees (0 = east, counter-clockwise).
    pub bearings_deg: Vec<f64>,

    /// Candidates ordered by bearing.
    pub candidates: Vec<Coordinate>,

    /// Seven-decimal rendering, present for sampled rings only.
    pub formatted: Option<Vec<FormattedCoordinate>>,
}

/// Single-bearing position request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "observer": { "latitude": 40.0, "longitude": -75.0 },
    "distance_m": 31.6227766,
    "bearing_deg": 0.0
}))]
pub struct PositionRequest {
    /// Observer position.
    pub observer: Coordinate,

    /// Distance in meters.
    #[schema(example = 31.622_776_6)]
    pub distance_m: f64,

    /// Bearing in degrees (0 = east, counter-clockwise).
    #[schema(example = 0.0)]
    pub bearing_deg: f64,
}

/// Single-bearing position response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PositionResponse {
    /// Observer position.
    pub observer: Coordinate,

    /// Distance in meters.
    pub distance_m: f64,

    /// Bearing in degrees.
    pub bearing_deg: f64,

    /// Estimated position, full precision.
    pub position: Coordinate,
}

// ============================================================================
// Validation
// ============================================================================

/// The projection divides by `cos(latitude)`, so the poles are excluded.
fn validate_observer(observer: &Coordinate) -> ApiResult<()> {
    if !observer.is_valid() || observer.latitude.abs() >= 90.0 {
        return Err(ApiError::bad_request(
            "invalid_observer",
            format!(
                "Observer must have a finite latitude strictly between -90 and 90 and a \
                 longitude between -180 and 180 (got {}, {})",
                observer.latitude, observer.longitude
            ),
        ));
    }
    Ok(())
}

fn validate_distance(distance_m: f64) -> ApiResult<()> {
    if !distance_m.is_finite() || distance_m < 0.0 {
        return Err(ApiError::bad_request(
            "invalid_distance",
            format!("Distance must be a finite, non-negative number of meters (got {distance_m})"),
        ));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Estimate distance from RSSI.
#[utoipa::path(
    post,
    path = "/api/estimate/distance",
    tag = "estimate",
    operation_id = "estimateDistance",
    summary = "Estimate distance from signal strength",
    description = "Applies the log-distance path-loss model: \
        distance = 10 ^ ((reference - rssi) / (10 * exponent)). A reading equal \
        to the reference yields exactly one meter.",
    request_body = DistanceRequest,
    responses(
        (status = 200, description = "Distance estimated", body = DistanceResponse),
        (status = 400, description = "Non-finite input or non-positive exponent", body = ErrorResponse)
    )
)]
pub async fn estimate_distance(
    State(state): State<SharedState>,
    Json(request): Json<DistanceRequest>,
) -> ApiResult<Json<DistanceResponse>> {
    let configured = state.read().await.config.estimator.model();
    let model = PathLossModel {
        reference_rssi_dbm: request
            .reference_rssi_dbm
            .unwrap_or(configured.reference_rssi_dbm),
        path_loss_exponent: request
            .path_loss_exponent
            .unwrap_or(configured.path_loss_exponent),
    };

    if !request.rssi_dbm.is_finite() || !model.reference_rssi_dbm.is_finite() {
        return Err(ApiError::bad_request(
            "invalid_rssi",
            "RSSI values must be finite numbers",
        ));
    }
    if !model.path_loss_exponent.is_finite() || model.path_loss_exponent <= 0.0 {
        return Err(ApiError::bad_request(
            "invalid_path_loss_exponent",
            "Path-loss exponent must be a positive number",
        ));
    }

    Ok(Json(DistanceResponse {
        distance_m: model.distance_meters(request.rssi_dbm),
        model,
    }))
}

/// Estimate a candidate ring.
#[utoipa::path(
    post,
    path = "/api/estimate/ring",
    tag = "estimate",
    operation_id = "estimateRing",
    summary = "Estimate candidate beacon positions on a ring",
    description = "Projects the distance around the observer. Without \
        sample_count, returns 360 full-precision candidates, one per degree. \
        With sample_count, returns that many equally spaced candidates rounded \
        to seven decimal places.",
    request_body = RingRequest,
    responses(
        (status = 200, description = "Candidates computed", body = RingResponse),
        (status = 400, description = "Invalid observer, distance or sample count", body = ErrorResponse)
    )
)]
pub async fn estimate_ring(Json(request): Json<RingRequest>) -> ApiResult<Json<RingResponse>> {
    validate_observer(&request.observer)?;
    validate_distance(request.distance_m)?;

    let policy = match request.sample_count {
        None => BearingPolicy::FullSweep,
        Some(count) if (1..=usize::from(FULL_SWEEP_BEARINGS)).contains(&count) => {
            BearingPolicy::Sampled(count)
        }
        Some(count) => {
            return Err(ApiError::bad_request(
                "invalid_sample_count",
                format!("Sample count must be between 1 and {FULL_SWEEP_BEARINGS} (got {count})"),
            ));
        }
    };

    let candidates = estimate(request.observer, request.distance_m, policy);
    let formatted = matches!(policy, BearingPolicy::Sampled(_))
        .then(|| candidates.iter().map(FormattedCoordinate::from).collect());

    Ok(Json(RingResponse {
        observer: request.observer,
        distance_m: request.distance_m,
        bearings_deg: policy.bearings(),
        candidates,
        formatted,
    }))
}

/// Estimate one position at a bearing.
#[utoipa::path(
    post,
    path = "/api/estimate/position",
    tag = "estimate",
    operation_id = "estimatePosition",
    summary = "Estimate the beacon position at one bearing",
    request_body = PositionRequest,
    responses(
        (status = 200, description = "Position computed", body = PositionResponse),
        (status = 400, description = "Invalid observer, distance or bearing", body = ErrorResponse)
    )
)]
pub async fn estimate_position(
    Json(request): Json<PositionRequest>,
) -> ApiResult<Json<PositionResponse>> {
    validate_observer(&request.observer)?;
    validate_distance(request.distance_m)?;
    if !request.bearing_deg.is_finite() {
        return Err(ApiError::bad_request(
            "invalid_bearing",
            "Bearing must be a finite number of degrees",
        ));
    }

    Ok(Json(PositionResponse {
        observer: request.observer,
        distance_m: request.distance_m,
        bearing_deg: request.bearing_deg,
        position: estimate_single_position(request.observer, request.distance_m, request.bearing_deg),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_observer_rejects_poles() {
        assert!(validate_observer(&Coordinate::new(40.0, -75.0)).is_ok());
        assert!(validate_observer(&Coordinate::new(90.0, 0.0)).is_err());
        assert!(validate_observer(&Coordinate::new(-90.0, 0.0)).is_err());
        assert!(validate_observer(&Coordinate::new(0.0, 181.0)).is_err());
    }

    #[test]
    fn test_validate_distance() {
        assert!(validate_distance(0.0).is_ok());
        assert!(validate_distance(-1.0).is_err());
        assert!(validate_distance(f64::INFINITY).is_err());
    }

    #[test]
    fn test_formatted_coordinate_has_seven_decimals() {
        let formatted = FormattedCoordinate::from(&Coordinate::new(40.0, -74.999_629_2));
        assert_eq!(formatted.latitude, "40.0000000");
        assert_eq!(formatted.longitude, "-74.9996292");
    }
}
