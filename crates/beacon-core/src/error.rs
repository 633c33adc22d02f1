//! Unified error types for the beacon-locator core library.
//!
//! Each module has its own error type ([`BluetoothError`], [`ConfigError`],
//! [`TrackingError`]). They all convert into [`LocatorError`], which carries
//! the machine-readable code and HTTP status the server reports.
//!
//! The estimator itself never fails and has no error type.
//!
//! # Example
//!
//! ```rust
//! use beacon_core::error::{LocatorError, Result};
//!
//! fn require_fix(has_fix: bool) -> Result<()> {
//!     if !has_fix {
//!         return Err(LocatorError::NoLocationFix);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! [`BluetoothError`]: crate::bluetooth::BluetoothError
//! [`ConfigError`]: crate::config::ConfigError
//! [`TrackingError`]: crate::tracker::TrackingError

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all locator operations.
#[derive(Debug, Error)]
pub enum LocatorError {
    // =========================================================================
    // BLUETOOTH ERRORS
    // =========================================================================
    /// No Bluetooth adapter was found on this system.
    #[error(
        "No Bluetooth adapter found. Ensure Bluetooth hardware is present and drivers are loaded."
    )]
    BluetoothAdapterNotFound,

    /// The Bluetooth adapter exists but is powered off.
    #[error("Bluetooth adapter is powered off. Run 'bluetoothctl power on' to enable.")]
    BluetoothAdapterPoweredOff,

    /// Scanning or another radio operation failed.
    #[error("Bluetooth operation failed: {0}")]
    BluetoothFailed(String),

    /// The requested beacon was not found.
    #[error("Beacon not found: '{0}'. Ensure it is powered on and within range.")]
    DeviceNotFound(String),

    /// The supplied address is malformed.
    #[error("Invalid Bluetooth address: '{0}'. Expected format XX:XX:XX:XX:XX:XX.")]
    InvalidAddress(String),

    /// Connecting to the beacon failed.
    #[error("Connection to {address} failed: {message}")]
    ConnectionFailed {
        /// Beacon address.
        address: String,
        /// Backend message.
        message: String,
    },

    /// No beacon is connected.
    #[error("No beacon is connected. Connect to a beacon first.")]
    NotConnected,

    /// The beacon did not report an RSSI.
    #[error("No signal strength reported by {0}")]
    RssiUnavailable(String),

    // =========================================================================
    // TRACKING ERRORS
    // =========================================================================
    /// No observer location fix has been received.
    #[error("No location fix available yet. Send a location update first.")]
    NoLocationFix,

    /// A location or estimate input is out of range.
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// The estimator produced an empty candidate set.
    #[error("No candidate positions to choose from")]
    NoCandidates,

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // PERSISTENCE & I/O ERRORS
    // =========================================================================
    /// An error occurred while reading or writing files.
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for locator operations.
pub type Result<T> = std::result::Result<T, LocatorError>;

impl LocatorError {
    /// Returns `true` if this error is related to Bluetooth operations.
    #[inline]
    #[must_use]
    pub const fn is_bluetooth_error(&self) -> bool {
        matches!(
            self,
            Self::BluetoothAdapterNotFound
                | Self::BluetoothAdapterPoweredOff
                | Self::BluetoothFailed(_)
                | Self::DeviceNotFound(_)
                | Self::InvalidAddress(_)
                | Self::ConnectionFailed { .. }
                | Self::NotConnected
                | Self::RssiUnavailable(_)
        )
    }

    /// Returns `true` if this error is likely recoverable without user intervention.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound(_) | Self::BluetoothFailed(_) | Self::RssiUnavailable(_)
        )
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::InvalidAddress(_) | Self::InvalidLocation(_) => 400,

            // 404 Not Found
            Self::ConfigNotFound(_) | Self::DeviceNotFound(_) => 404,

            // 409 Conflict - current state does not allow the operation
            Self::NotConnected | Self::NoLocationFix => 409,

            // 422 Unprocessable Entity - semantic errors
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) | Self::NoCandidates => 422,

            // 500 Internal Server Error - server-side issues
            Self::PersistenceError(_) | Self::IoError(_) => 500,

            // 502 Bad Gateway - the beacon misbehaved
            Self::ConnectionFailed { .. } | Self::RssiUnavailable(_) => 502,

            // 503 Service Unavailable - Bluetooth hardware issues
            Self::BluetoothAdapterNotFound
            | Self::BluetoothAdapterPoweredOff
            | Self::BluetoothFailed(_) => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BluetoothAdapterNotFound => "BLUETOOTH_ADAPTER_NOT_FOUND",
            Self::BluetoothAdapterPoweredOff => "BLUETOOTH_ADAPTER_POWERED_OFF",
            Self::BluetoothFailed(_) => "BLUETOOTH_FAILED",
            Self::DeviceNotFound(_) => "DEVICE_NOT_FOUND",
            Self::InvalidAddress(_) => "INVALID_ADDRESS",
            Self::ConnectionFailed { .. } => "CONNECTION_FAILED",
            Self::NotConnected => "NOT_CONNECTED",
            Self::RssiUnavailable(_) => "RSSI_UNAVAILABLE",
            Self::NoLocationFix => "NO_LOCATION_FIX",
            Self::InvalidLocation(_) => "INVALID_LOCATION",
            Self::NoCandidates => "NO_CANDIDATES",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::PersistenceError(_) => "PERSISTENCE_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for LocatorError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path.into()),
            ConfigError::ReadError { path, source } => {
                Self::PersistenceError(format!("Failed to read {path}: {source}"))
            }
            ConfigError::WriteError { path, source } => {
                Self::PersistenceError(format!("Failed to write {path}: {source}"))
            }
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

impl From<crate::bluetooth::BluetoothError> for LocatorError {
    fn from(err: crate::bluetooth::BluetoothError) -> Self {
        use crate::bluetooth::BluetoothError;
        match err {
            BluetoothError::AdapterNotFound => Self::BluetoothAdapterNotFound,
            BluetoothError::AdapterPoweredOff => Self::BluetoothAdapterPoweredOff,
            BluetoothError::DeviceNotFound { address } => Self::DeviceNotFound(address),
            BluetoothError::InvalidAddress { address } => Self::InvalidAddress(address),
            BluetoothError::ConnectionFailed { address, message } => {
                Self::ConnectionFailed { address, message }
            }
            BluetoothError::NotConnected | BluetoothError::DeviceNotConnected { .. } => {
                Self::NotConnected
            }
            BluetoothError::RssiUnavailable { address } => Self::RssiUnavailable(address),
            BluetoothError::SessionInitFailed { message }
            | BluetoothError::DiscoveryFailed { message }
            | BluetoothError::Internal { message } => Self::BluetoothFailed(message),
        }
    }
}

impl From<crate::tracker::TrackingError> for LocatorError {
    fn from(err: crate::tracker::TrackingError) -> Self {
        use crate::tracker::TrackingError;
        match err {
            TrackingError::NotConnected => Self::NotConnected,
            TrackingError::NoLocationFix => Self::NoLocationFix,
            TrackingError::NoCandidates => Self::NoCandidates,
            e @ (TrackingError::InvalidCoordinate { .. } | TrackingError::InvalidAccuracy(_)) => {
                Self::InvalidLocation(e.to_string())
            }
            TrackingError::Bluetooth(e) => Self::from(e),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
