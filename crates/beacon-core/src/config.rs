//! Application configuration management.
//!
//! Configuration is layered, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. A TOML file (optional; missing file means defaults)
//! 3. Environment variables prefixed `BEACON__`, with `__` between nested
//!    keys, e.g. `BEACON__ESTIMATOR__SAMPLE_COUNT=12`
//!
//! ```toml
//! [estimator]
//! reference_rssi_dbm = -40.0
//! path_loss_exponent = 2.0
//! sample_count = 8
//!
//! [tracking]
//! interval_secs = 5
//! selection = "random"
//!
//! [bluetooth]
//! backend = "mock"
//! scan_timeout_secs = 10
//!
//! [server]
//! bind_address = "0.0.0.0:3000"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::bluetooth::{is_valid_address, MockBeacon};
use crate::estimator::{
    PathLossModel, PositionEstimator, DEFAULT_PATH_LOSS_EXPONENT, DEFAULT_REFERENCE_RSSI_DBM,
    DEFAULT_SAMPLE_COUNT,
};
use crate::selection::SelectionStrategy;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "BEACON_CONFIG";

/// Prefix for environment overrides of individual keys.
pub const ENV_PREFIX: &str = "BEACON";

/// Largest sample count accepted; one candidate per degree.
pub const MAX_SAMPLE_COUNT: usize = 360;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    ReadError {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file could not be written.
    #[error("Failed to write {path}: {source}")]
    WriteError {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Sources could not be merged or deserialized.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// The configuration could not be serialized to TOML.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// One field holds an invalid value.
    #[error("Invalid value for '{field}': {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What is wrong.
        message: String,
    },

    /// Several fields hold invalid values.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Distance and ring estimation.
    pub estimator: EstimatorConfig,
    /// Periodic tracking.
    pub tracking: TrackingConfig,
    /// Radio backend and scanning.
    pub bluetooth: BluetoothConfig,
    /// HTTP server.
    pub server: ServerConfig,
}

/// Estimator parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Expected RSSI at one meter (dBm).
    pub reference_rssi_dbm: f64,
    /// Path-loss exponent; 2 is free space.
    pub path_loss_exponent: f64,
    /// Candidates produced per reading.
    pub sample_count: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            reference_rssi_dbm: DEFAULT_REFERENCE_RSSI_DBM,
            path_loss_exponent: DEFAULT_PATH_LOSS_EXPONENT,
            sample_count: DEFAULT_SAMPLE_COUNT,
        }
    }
}

impl EstimatorConfig {
    /// The path-loss model described by this section.
    #[must_use]
    pub const fn model(&self) -> PathLossModel {
        PathLossModel {
            reference_rssi_dbm: self.reference_rssi_dbm,
            path_loss_exponent: self.path_loss_exponent,
        }
    }

    /// An estimator built from this section.
    #[must_use]
    pub const fn estimator(&self) -> PositionEstimator {
        PositionEstimator::new(self.model(), self.sample_count)
    }
}

/// Tracking loop parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Whether the server runs the tracking loop.
    pub enabled: bool,
    /// Seconds between ticks.
    pub interval_secs: u64,
    /// How one candidate is chosen per tick.
    pub selection: SelectionStrategy,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5,
            selection: SelectionStrategy::Random,
        }
    }
}

impl TrackingConfig {
    /// Tick period.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Radio backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadioBackend {
    /// In-memory radio seeded from `mock_beacons`.
    #[default]
    Mock,
    /// BlueZ via D-Bus. Requires the `bluetooth` feature.
    Bluez,
}

/// Bluetooth parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Which radio to use.
    pub backend: RadioBackend,
    /// Scan duration in seconds.
    pub scan_timeout_secs: u64,
    /// Beacons the mock radio reports.
    pub mock_beacons: Vec<MockBeacon>,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            backend: RadioBackend::Mock,
            scan_timeout_secs: 10,
            mock_beacons: Vec::new(),
        }
    }
}

impl BluetoothConfig {
    /// Scan duration.
    #[must_use]
    pub const fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }
}

/// HTTP server parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Config {
    /// Load from `path` (if it exists) and the environment, then validate.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or validation fails.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            info!(path = %path.display(), "Loading configuration");
        } else {
            debug!(path = %path.display(), "No configuration file, using defaults");
        }

        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file only, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file is missing, or a parse
    /// or validation error.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        let settings = config::Config::builder()
            .add_source(config::File::from_str(&content, config::FileFormat::Toml))
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Write as pretty TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteError {
                path: parent.display().to_string(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::WriteError {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Check every field, collecting all problems.
    ///
    /// # Errors
    ///
    /// Returns the single error, or [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        let mut invalid = |field: &str, message: String| {
            errors.push(ConfigError::ValidationError {
                field: field.to_string(),
                message,
            });
        };

        let est = &self.estimator;
        if !est.reference_rssi_dbm.is_finite() || !(-127.0..=20.0).contains(&est.reference_rssi_dbm)
        {
            invalid(
                "estimator.reference_rssi_dbm",
                format!("must be between -127 and 20 dBm (got {})", est.reference_rssi_dbm),
            );
        }
        if !est.path_loss_exponent.is_finite() || est.path_loss_exponent <= 0.0 {
            invalid(
                "estimator.path_loss_exponent",
                format!("must be a positive number (got {})", est.path_loss_exponent),
            );
        }
        if est.sample_count == 0 || est.sample_count > MAX_SAMPLE_COUNT {
            invalid(
                "estimator.sample_count",
                format!("must be between 1 and {MAX_SAMPLE_COUNT} (got {})", est.sample_count),
            );
        }

        if self.tracking.interval_secs == 0 {
            invalid("tracking.interval_secs", "must be at least 1".to_string());
        }

        if !(1..=120).contains(&self.bluetooth.scan_timeout_secs) {
            invalid(
                "bluetooth.scan_timeout_secs",
                format!(
                    "must be between 1 and 120 (got {})",
                    self.bluetooth.scan_timeout_secs
                ),
            );
        }
        for beacon in &self.bluetooth.mock_beacons {
            if !is_valid_address(&beacon.address) {
                invalid(
                    "bluetooth.mock_beacons",
                    format!("invalid address '{}'", beacon.address),
                );
            }
        }

        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            invalid(
                "server.bind_address",
                format!("'{}' is not a socket address", self.server.bind_address),
            );
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

/// Default configuration file path.
///
/// `BEACON_CONFIG` wins if set. Otherwise `/etc/beacon-locator/config.toml`
/// on Linux and the platform config directory elsewhere.
#[must_use]
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/etc/beacon-locator/config.toml")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "beacon-locator").map_or_else(
            || PathBuf::from("config.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }
}
