//! # beacon-core
//!
//! Core logic for the beacon-locator system: approximate where a Bluetooth
//! beacon is from one RSSI reading and the observer's own location fix.
//!
//! This crate provides:
//! - RSSI-to-distance conversion and candidate-ring estimation
//! - Candidate selection strategies
//! - Beacon discovery and connection lifecycle
//! - Location fix intake and the periodic tracking loop
//! - Configuration management
//!
//! ## Architecture
//!
//! - [`estimator`] - Log-distance path loss and the planar projection kernel
//! - [`selection`] - Picking one candidate per tick
//! - [`bluetooth`] - Radio trait, BlueZ and mock backends, connection manager
//! - [`location`] - Observer location sources
//! - [`tracker`] - Fix + RSSI -> estimate, published on a watch channel
//! - [`config`] - Layered configuration loading, saving, and validation
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared types and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod bluetooth;
pub mod config;
pub mod error;
pub mod estimator;
pub mod location;
pub mod selection;
pub mod tracker;
pub mod types;

// Re-export primary types for convenience
#[cfg(feature = "bluetooth")]
pub use bluetooth::BluezRadio;
pub use bluetooth::{
    is_valid_address, normalize_address, BeaconManager, BeaconRadio, BluetoothError,
    BluetoothResult, MockBeacon, MockRadio,
};
pub use config::{
    default_config_path, BluetoothConfig, Config, ConfigError, ConfigResult, EstimatorConfig,
    RadioBackend, ServerConfig, TrackingConfig,
};
pub use error::{LocatorError, Result};
pub use estimator::{
    estimate, estimate_distance, estimate_ring, estimate_ring_sampled, estimate_single_position,
    BearingPolicy, Coordinate, PathLossModel, PositionEstimator,
};
pub use location::{LocationSource, SharedLocation};
pub use selection::{CandidateSelector, SelectionStrategy};
pub use tracker::{Tracker, TrackingError};
pub use types::{ConnectedBeacon, DiscoveredBeacon, LocationFix, PositionEstimate};
