//! Bluetooth API endpoints.
//!
//! Provides endpoints for beacon scanning and the connection lifecycle.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use beacon_core::{BeaconManager, ConnectedBeacon, DiscoveredBeacon};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the Bluetooth router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/devices", get(scan_devices))
        .route("/api/devices/{address}/connect", post(connect_device))
        .route("/api/devices/{address}/disconnect", post(disconnect_device))
        .route("/api/connection", get(get_connection))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Device scan response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "devices": [
        {
            "address": "AA:BB:CC:DD:EE:FF",
            "name": "Keys Tag",
            "rssi_dbm": -67
        }
    ],
    "backend": "bluez",
    "scan_duration_secs": 10,
    "scanned_at_utc": "2025-01-15T03:30:00Z"
}))]
pub struct ScanDevicesResponse {
    /// Discovered beacons, one entry per address.
    pub devices: Vec<DiscoveredBeacon>,

    /// Radio backend that performed the scan.
    #[schema(example = "bluez")]
    pub backend: String,

    /// How long the scan ran.
    #[schema(example = 10)]
    pub scan_duration_secs: u64,

    /// When the scan completed.
    #[schema(example = "2025-01-15T03:30:00Z")]
    pub scanned_at_utc: String,
}

/// Response after connecting.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConnectResponse {
    /// Whether the connection is established.
    pub success: bool,

    /// The connected beacon.
    pub beacon: ConnectedBeacon,
}

/// Response after disconnecting.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DisconnectResponse {
    /// Whether the disconnect succeeded.
    pub success: bool,

    /// Address that was disconnected.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub address: String,
}

/// Current connection status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConnectionResponse {
    /// Whether a beacon is connected.
    pub connected: bool,

    /// The connected beacon, if any.
    pub beacon: Option<ConnectedBeacon>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn manager(state: &SharedState) -> ApiResult<Arc<BeaconManager>> {
    state
        .read()
        .await
        .beacons
        .clone()
        .ok_or_else(ApiError::bluetooth_unavailable)
}

/// Scan for nearby beacons.
///
/// Any connected beacon is disconnected first.
#[utoipa::path(
    get,
    path = "/api/devices",
    tag = "devices",
    operation_id = "scanDevices",
    summary = "Scan for beacons",
    description = "Performs a Bluetooth scan and returns every discovered beacon, \
        one entry per address. A currently connected beacon is disconnected \
        before the scan starts.",
    responses(
        (status = 200, description = "Scan completed", body = ScanDevicesResponse),
        (status = 503, description = "Bluetooth radio unavailable", body = ErrorResponse)
    )
)]
pub async fn scan_devices(State(state): State<SharedState>) -> ApiResult<Json<ScanDevicesResponse>> {
    let timeout = state.read().await.config.bluetooth.scan_timeout();
    let beacons = manager(&state).await?;

    let devices = beacons.scan(timeout).await?;

    Ok(Json(ScanDevicesResponse {
        devices,
        backend: beacons.backend_name().to_string(),
        scan_duration_secs: timeout.as_secs(),
        scanned_at_utc: Utc::now().to_rfc3339(),
    }))
}

/// Connect to a beacon.
#[utoipa::path(
    post,
    path = "/api/devices/{address}/connect",
    tag = "devices",
    operation_id = "connectDevice",
    summary = "Connect to a beacon",
    description = "Connects to the beacon with the given address. Only one beacon \
        can be connected; connecting to another disconnects the previous one.",
    params(("address" = String, Path, description = "Bluetooth MAC address", example = "AA:BB:CC:DD:EE:FF")),
    responses(
        (status = 200, description = "Connected", body = ConnectResponse),
        (status = 400, description = "Invalid address", body = ErrorResponse),
        (status = 404, description = "Beacon not found", body = ErrorResponse),
        (status = 502, description = "Beacon refused the connection", body = ErrorResponse),
        (status = 503, description = "Bluetooth radio unavailable", body = ErrorResponse)
    )
)]
pub async fn connect_device(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> ApiResult<Json<ConnectResponse>> {
    let beacons = manager(&state).await?;
    let beacon = beacons.connect(&address).await?;
    info!(address = %beacon.address, "Connected via API");

    Ok(Json(ConnectResponse {
        success: true,
        beacon,
    }))
}

/// Disconnect from a beacon.
#[utoipa::path(
    post,
    path = "/api/devices/{address}/disconnect",
    tag = "devices",
    operation_id = "disconnectDevice",
    summary = "Disconnect from a beacon",
    params(("address" = String, Path, description = "Bluetooth MAC address", example = "AA:BB:CC:DD:EE:FF")),
    responses(
        (status = 200, description = "Disconnected", body = DisconnectResponse),
        (status = 400, description = "Invalid address", body = ErrorResponse),
        (status = 503, description = "Bluetooth radio unavailable", body = ErrorResponse)
    )
)]
pub async fn disconnect_device(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> ApiResult<Json<DisconnectResponse>> {
    let beacons = manager(&state).await?;
    let address = beacon_core::normalize_address(&address)?;
    beacons.disconnect(&address).await?;

    Ok(Json(DisconnectResponse {
        success: true,
        address,
    }))
}

/// Get the connected beacon.
#[utoipa::path(
    get,
    path = "/api/connection",
    tag = "devices",
    operation_id = "getConnection",
    summary = "Get connection status",
    responses(
        (status = 200, description = "Connection status", body = ConnectionResponse),
        (status = 503, description = "Bluetooth radio unavailable", body = ErrorResponse)
    )
)]
pub async fn get_connection(
    State(state): State<SharedState>,
) -> ApiResult<Json<ConnectionResponse>> {
    let beacon = manager(&state).await?.connected().await;

    Ok(Json(ConnectionResponse {
        connected: beacon.is_some(),
        beacon,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_response_serialization() {
        let response = ScanDevicesResponse {
            devices: vec![DiscoveredBeacon {
                address: "AA:BB:CC:DD:EE:FF".to_string(),
                name: Some("Tag".to_string()),
                rssi_dbm: Some(-45),
            }],
            backend: "mock".to_string(),
            scan_duration_secs: 5,
            scanned_at_utc: "2025-01-15T03:30:00Z".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("devices"));
        assert!(json.contains("\"rssi_dbm\":-45"));
    }

    #[test]
    fn test_connection_response_serialization() {
        let response = ConnectionResponse {
            connected: false,
            beacon: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"connected\":false"));
    }
}
