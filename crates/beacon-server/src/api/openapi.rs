//! OpenAPI specification for the beacon locator API.
//!
//! Served at `/api/openapi.json` through Swagger UI and written to disk by
//! the `gen-openapi` binary.

use beacon_core::{
    ConnectedBeacon, Coordinate, DiscoveredBeacon, LocationFix, PathLossModel, PositionEstimate,
    SelectionStrategy,
};
use utoipa::OpenApi;

use super::bluetooth::{
    ConnectResponse, ConnectionResponse, DisconnectResponse, ScanDevicesResponse,
};
use super::config::{
    BluetoothSettings, ConfigResponse, EstimatorSettings, TrackingSettings,
    UpdateConfigResponse, UpdateEstimatorRequest, UpdateTrackingRequest,
};
use super::error::ErrorResponse;
use super::estimate::{
    DistanceRequest, DistanceResponse, FormattedCoordinate, PositionRequest, PositionResponse,
    RingRequest, RingResponse,
};
use super::health::HealthResponse;
use super::location::{LocationResponse, UpdateLocationRequest};
use super::tracking::{EstimateDisplay, TrackingResponse};

/// Returns the OpenAPI specification as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "beacon-locator API",
        version = "0.1.0",
        description = r#"
# beacon-locator API

Estimates where a Bluetooth Low Energy beacon is, relative to an observer
with a known GPS position.

## Overview

1. **Devices**: scan for beacons and keep one connected
2. **Location**: push the observer's GPS fixes
3. **Tracking**: read the periodically refreshed position estimate
4. **Estimate**: run the distance and ring calculations directly

## How estimates work

Signal strength gives a distance, not a direction. Every estimate is a ring
of equally plausible candidates around the observer; the tracker picks one
of them per tick. Treat the result as illustrative, not as a precise fix.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local beacon-locator server")
    ),
    tags(
        (name = "system", description = "Health checks"),
        (name = "devices", description = "Beacon scanning and connection"),
        (name = "location", description = "Observer GPS fixes"),
        (name = "tracking", description = "Periodic position estimates"),
        (name = "estimate", description = "Stateless distance and position calculations"),
        (name = "config", description = "Estimator and tracking configuration")
    ),
    paths(
        // Health
        super::health::health_check,
        // Devices
        super::bluetooth::scan_devices,
        super::bluetooth::connect_device,
        super::bluetooth::disconnect_device,
        super::bluetooth::get_connection,
        // Location
        super::location::get_location,
        super::location::update_location,
        // Tracking
        super::tracking::get_tracking,
        super::tracking::refresh_tracking,
        // Estimate
        super::estimate::estimate_distance,
        super::estimate::estimate_ring,
        super::estimate::estimate_position,
        // Config
        super::config::get_config,
        super::config::update_estimator,
        super::config::update_tracking,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // Domain types
            Coordinate,
            PathLossModel,
            DiscoveredBeacon,
            ConnectedBeacon,
            LocationFix,
            PositionEstimate,
            SelectionStrategy,
            // Health
            HealthResponse,
            // Devices
            ScanDevicesResponse,
            ConnectResponse,
            DisconnectResponse,
            ConnectionResponse,
            // Location
            UpdateLocationRequest,
            LocationResponse,
            // Tracking
            TrackingResponse,
            EstimateDisplay,
            // Estimate
            DistanceRequest,
            DistanceResponse,
            RingRequest,
            RingResponse,
            FormattedCoordinate,
            PositionRequest,
            PositionResponse,
            // Config
            ConfigResponse,
            EstimatorSettings,
            TrackingSettings,
            BluetoothSettings,
            UpdateEstimatorRequest,
            UpdateTrackingRequest,
            UpdateConfigResponse,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "beacon-locator API");
        assert!(spec.paths.paths.contains_key("/api/estimate/ring"));
        assert!(spec.paths.paths.contains_key("/api/devices/{address}/connect"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"beacon-locator API\""));
    }
}
