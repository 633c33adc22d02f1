//! Shared types and OpenAPI schemas.
//!
//! These are the values that cross module boundaries and end up in API
//! responses: beacons, location fixes and position estimates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::estimator::Coordinate;

/// A beacon seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "address": "AA:BB:CC:DD:EE:FF",
    "name": "Keys Tag",
    "rssi_dbm": -67
}))]
pub struct DiscoveredBeacon {
    /// Bluetooth MAC address, uppercase.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub address: String,

    /// Advertised name, if any.
    #[schema(example = "Keys Tag")]
    pub name: Option<String>,

    /// Signal strength at discovery time in dBm.
    #[schema(example = -67)]
    pub rssi_dbm: Option<i16>,
}

/// The beacon currently connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConnectedBeacon {
    /// Bluetooth MAC address, uppercase.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub address: String,

    /// Name from the last scan, if it was advertised.
    #[schema(example = "Keys Tag")]
    pub name: Option<String>,

    /// When the connection was established.
    pub connected_at_utc: DateTime<Utc>,
}

/// One observer location fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationFix {
    /// Observer position.
    pub coordinate: Coordinate,

    /// Horizontal accuracy radius in meters, if the source reports one.
    #[schema(example = 4.5)]
    pub accuracy_m: Option<f64>,

    /// When the fix was taken.
    pub recorded_at_utc: DateTime<Utc>,
}

/// Result of one tracking tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PositionEstimate {
    /// Tracking session this estimate belongs to.
    pub session_id: Uuid,

    /// Beacon being located.
    pub beacon: ConnectedBeacon,

    /// Observer fix used.
    pub observer: LocationFix,

    /// RSSI sample used, in dBm.
    #[schema(example = -70)]
    pub rssi_dbm: i16,

    /// Distance inferred from the sample, in meters.
    #[schema(example = 31.622_776_6)]
    pub distance_m: f64,

    /// Equally plausible candidates, ordered by bearing.
    pub candidates: Vec<Coordinate>,

    /// Index into `candidates` of the selected point.
    pub selected_index: usize,

    /// Selected candidate.
    pub estimated: Coordinate,

    /// When the estimate was produced.
    pub estimated_at_utc: DateTime<Utc>,
}
