//! Configuration API endpoints.
//!
//! Provides endpoints for reading the active configuration and for tuning
//! the estimator and the tracking loop at runtime.

use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use beacon_core::{Config, RadioBackend, SelectionStrategy};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::state::{AppState, SharedState};

/// Creates the config router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/config", get(get_config))
        .route("/api/config/estimator", put(update_estimator))
        .route("/api/config/tracking", put(update_tracking))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Current configuration response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "estimator": {
        "reference_rssi_dbm": -40.0,
        "path_loss_exponent": 2.0,
        "sample_count": 8
    },
    "tracking": {
        "enabled": true,
        "interval_secs": 5,
        "selection": "random"
    },
    "bluetooth": {
        "backend": "mock",
        "scan_timeout_secs": 10
    },
    "bind_address": "0.0.0.0:3000"
}))]
pub struct ConfigResponse {
    /// Estimator parameters.
    pub estimator: EstimatorSettings,

    /// Tracking loop parameters.
    pub tracking: TrackingSettings,

    /// Radio parameters.
    pub bluetooth: BluetoothSettings,

    /// HTTP listen address.
    #[schema(example = "0.0.0.0:3000")]
    pub bind_address: String,
}

/// Estimator parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct EstimatorSettings {
    /// Expected RSSI at one meter (dBm).
    #[schema(example = -40.0)]
    pub reference_rssi_dbm: f64,

    /// Path-loss exponent.
    #[schema(example = 2.0)]
    pub path_loss_exponent: f64,

    /// Candidates produced per reading.
    #[schema(example = 8)]
    pub sample_count: usize,
}

/// Tracking loop parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct TrackingSettings {
    /// Whether the tracking loop runs.
    pub enabled: bool,

    /// Seconds between ticks.
    #[schema(example = 5)]
    pub interval_secs: u64,

    /// Candidate selection strategy.
    pub selection: SelectionStrategy,
}

/// Radio parameters.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BluetoothSettings {
    /// Configured backend.
    #[schema(example = "mock")]
    pub backend: String,

    /// Scan duration in seconds.
    #[schema(example = 10)]
    pub scan_timeout_secs: u64,
}

impl From<&Config> for ConfigResponse {
    fn from(config: &Config) -> Self {
        let backend = match config.bluetooth.backend {
            RadioBackend::Mock => "mock",
            RadioBackend::Bluez => "bluez",
        };

        Self {
            estimator: EstimatorSettings {
                reference_rssi_dbm: config.estimator.reference_rssi_dbm,
                path_loss_exponent: config.estimator.path_loss_exponent,
                sample_count: config.estimator.sample_count,
            },
            tracking: TrackingSettings {
                enabled: config.tracking.enabled,
                interval_secs: config.tracking.interval_secs,
                selection: config.tracking.selection,
            },
            bluetooth: BluetoothSettings {
                backend: backend.to_string(),
                scan_timeout_secs: config.bluetooth.scan_timeout_secs,
            },
            bind_address: config.server.bind_address.clone(),
        }
    }
}

/// Request to update estimator parameters. Omitted fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[schema(example = json!({
    "reference_rssi_dbm": -59.0,
    "path_loss_exponent": 2.5
}))]
pub struct UpdateEstimatorRequest {
    /// Expected RSSI at one meter (dBm, -127 to 20).
    #[schema(example = -59.0)]
    pub reference_rssi_dbm: Option<f64>,

    /// Path-loss exponent (positive).
    #[schema(example = 2.5)]
    pub path_loss_exponent: Option<f64>,

    /// Candidates per reading (1 to 360).
    #[schema(example = 8, minimum = 1, maximum = 360)]
    pub sample_count: Option<usize>,
}

/// Request to change the selection strategy.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({ "selection": "nearest_to_previous" }))]
pub struct UpdateTrackingRequest {
    /// New strategy.
    pub selection: SelectionStrategy,
}

/// Response after a configuration update.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateConfigResponse {
    /// Whether the update was successful.
    pub success: bool,

    /// Configuration after the update.
    pub config: ConfigResponse,
}

// ============================================================================
// Handlers
// ============================================================================

fn persist(state: &AppState, config: &Config) -> ApiResult<()> {
    state.persist_config(config).map_err(|e| ApiError::InternalError {
        error_code: "config_save_failed".to_string(),
        message: "Failed to save configuration".to_string(),
        details: Some(e.to_string()),
    })
}

/// Get current configuration.
#[utoipa::path(
    get,
    path = "/api/config",
    tag = "config",
    operation_id = "getConfig",
    summary = "Get current configuration",
    responses(
        (status = 200, description = "Configuration retrieved", body = ConfigResponse)
    )
)]
pub async fn get_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    Json(ConfigResponse::from(&state.read().await.config))
}

/// Update estimator parameters.
#[utoipa::path(
    put,
    path = "/api/config/estimator",
    tag = "config",
    operation_id = "updateEstimator",
    summary = "Update estimator parameters",
    description = "Changes the path-loss model or the number of candidates per \
        reading. The new values are validated and saved first, then used by \
        the tracker from its next tick.",
    request_body = UpdateEstimatorRequest,
    responses(
        (status = 200, description = "Estimator updated", body = UpdateConfigResponse),
        (status = 422, description = "Value out of range", body = ErrorResponse),
        (status = 500, description = "Configuration could not be saved", body = ErrorResponse)
    )
)]
pub async fn update_estimator(
    State(state): State<SharedState>,
    Json(request): Json<UpdateEstimatorRequest>,
) -> ApiResult<Json<UpdateConfigResponse>> {
    let mut state_guard = state.write().await;

    let mut candidate = state_guard.config.clone();
    if let Some(reference) = request.reference_rssi_dbm {
        candidate.estimator.reference_rssi_dbm = reference;
    }
    if let Some(exponent) = request.path_loss_exponent {
        candidate.estimator.path_loss_exponent = exponent;
    }
    if let Some(count) = request.sample_count {
        candidate.estimator.sample_count = count;
    }
    candidate.validate()?;
    persist(&state_guard, &candidate)?;

    state_guard.config = candidate;
    if let Some(tracker) = &state_guard.tracker {
        tracker
            .set_estimator(state_guard.config.estimator.estimator())
            .await;
    }

    info!(
        reference_rssi_dbm = state_guard.config.estimator.reference_rssi_dbm,
        path_loss_exponent = state_guard.config.estimator.path_loss_exponent,
        sample_count = state_guard.config.estimator.sample_count,
        "Estimator updated"
    );

    Ok(Json(UpdateConfigResponse {
        success: true,
        config: ConfigResponse::from(&state_guard.config),
    }))
}

/// Update the selection strategy.
#[utoipa::path(
    put,
    path = "/api/config/tracking",
    tag = "config",
    operation_id = "updateTracking",
    summary = "Update candidate selection strategy",
    description = "Replaces the strategy used to pick one candidate per tick. \
        The new selector starts without history.",
    request_body = UpdateTrackingRequest,
    responses(
        (status = 200, description = "Strategy updated", body = UpdateConfigResponse),
        (status = 500, description = "Configuration could not be saved", body = ErrorResponse)
    )
)]
pub async fn update_tracking(
    State(state): State<SharedState>,
    Json(request): Json<UpdateTrackingRequest>,
) -> ApiResult<Json<UpdateConfigResponse>> {
    let mut state_guard = state.write().await;

    let mut candidate = state_guard.config.clone();
    candidate.tracking.selection = request.selection;
    persist(&state_guard, &candidate)?;

    state_guard.config = candidate;
    if let Some(tracker) = &state_guard.tracker {
        tracker.set_strategy(request.selection).await;
    }

    info!(selection = ?request.selection, "Selection strategy updated");

    Ok(Json(UpdateConfigResponse {
        success: true,
        config: ConfigResponse::from(&state_guard.config),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_response_from_defaults() {
        let response = ConfigResponse::from(&Config::default());
        assert_eq!(response.estimator.sample_count, 8);
        assert_eq!(response.bluetooth.backend, "mock");

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"selection\":\"random\""));
    }

    #[test]
    fn test_update_estimator_request_fields_optional() {
        let request: UpdateEstimatorRequest =
            serde_json::from_str(r#"{"sample_count": 12}"#).unwrap();
        assert_eq!(request.sample_count, Some(12));
        assert!(request.reference_rssi_dbm.is_none());
    }

    #[test]
    fn test_update_tracking_request_deserialization() {
        let request: UpdateTrackingRequest =
            serde_json::from_str(r#"{"selection": "nearest_to_previous"}"#).unwrap();
        assert_eq!(request.selection, SelectionStrategy::NearestToPrevious);
    }
}
