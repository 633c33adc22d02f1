//! Application state shared across handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use beacon_core::{
    BeaconManager, BeaconRadio, BluetoothConfig, Config, ConfigResult, MockRadio, RadioBackend,
    SharedLocation, Tracker,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Shared handle passed to every handler.
pub type SharedState = Arc<RwLock<AppState>>;

/// Application state.
pub struct AppState {
    /// Active configuration.
    pub config: Config,

    /// Where configuration changes are saved. `None` keeps changes in memory.
    pub config_path: Option<PathBuf>,

    /// Beacon connection manager, absent when no radio is available.
    pub beacons: Option<Arc<BeaconManager>>,

    /// Latest observer fix, fed by `PUT /api/location`.
    pub location: Arc<SharedLocation>,

    /// Tracking loop driver, present whenever `beacons` is.
    pub tracker: Option<Arc<Tracker>>,

    /// Process start, for uptime.
    pub started_at: Instant,
}

impl AppState {
    /// Wire up state around an optional radio.
    pub fn new(
        config: Config,
        config_path: Option<PathBuf>,
        radio: Option<Arc<dyn BeaconRadio>>,
    ) -> Self {
        let location = Arc::new(SharedLocation::new());
        let beacons = radio.map(|radio| Arc::new(BeaconManager::new(radio)));
        let tracker = beacons.as_ref().map(|beacons| {
            Arc::new(Tracker::new(
                beacons.clone(),
                location.clone(),
                config.estimator.estimator(),
                config.tracking.selection.build(),
            ))
        });

        Self {
            config,
            config_path,
            beacons,
            location,
            tracker,
            started_at: Instant::now(),
        }
    }

    /// Wrap in the shared handle.
    #[must_use]
    pub fn into_shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    /// Write `config` to the config path, if one is set.
    ///
    /// Callers persist a validated copy before swapping it into `self.config`,
    /// so a failed write leaves the running configuration untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn persist_config(&self, config: &Config) -> ConfigResult<()> {
        match &self.config_path {
            Some(path) => config.save(path),
            None => Ok(()),
        }
    }
}

/// Build the radio selected by configuration.
///
/// Returns `None` when the backend cannot be opened; the server still runs
/// and answers Bluetooth endpoints with 503.
pub async fn build_radio(config: &BluetoothConfig) -> Option<Arc<dyn BeaconRadio>> {
    match config.backend {
        RadioBackend::Mock => {
            info!(beacons = config.mock_beacons.len(), "Using mock radio");
            Some(Arc::new(MockRadio::from_beacons(config.mock_beacons.clone())))
        }
        RadioBackend::Bluez => bluez_radio().await,
    }
}

#[cfg(feature = "bluetooth")]
async fn bluez_radio() -> Option<Arc<dyn BeaconRadio>> {
    match beacon_core::BluezRadio::new().await {
        Ok(radio) => Some(Arc::new(radio)),
        Err(e) => {
            warn!(error = %e, "BlueZ radio unavailable");
            None
        }
    }
}

#[cfg(not(feature = "bluetooth"))]
#[allow(clippy::unused_async)]
async fn bluez_radio() -> Option<Arc<dyn BeaconRadio>> {
    warn!("BlueZ backend requested but the server was built without the 'bluetooth' feature");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::MockBeacon;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_build_radio_mock() {
        let config = BluetoothConfig {
            mock_beacons: vec![MockBeacon::new("AA:BB:CC:DD:EE:01", None, -60)],
            ..BluetoothConfig::default()
        };
        let radio = build_radio(&config).await.unwrap();
        assert_eq!(radio.backend_name(), "mock");
    }

    #[test]
    fn test_state_without_radio_has_no_tracker() {
        let state = AppState::new(Config::default(), None, None);
        assert!(state.beacons.is_none());
        assert!(state.tracker.is_none());
    }

    #[test]
    fn test_state_with_radio_has_tracker() {
        let radio: Arc<dyn BeaconRadio> = Arc::new(MockRadio::new());
        let state = AppState::new(Config::default(), None, Some(radio));
        assert!(state.beacons.is_some());
        assert!(state.tracker.is_some());
    }

    #[test]
    fn test_persist_config_without_path_is_noop() {
        let state = AppState::new(Config::default(), None, None);
        assert!(state.persist_config(&state.config).is_ok());
    }

    #[test]
    fn test_persist_config_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let state = AppState::new(Config::default(), Some(path.clone()), None);
        let mut updated = state.config.clone();
        updated.estimator.sample_count = 16;
        state.persist_config(&updated).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.estimator.sample_count, 16);
        assert_eq!(state.config.estimator.sample_count, 8);
    }
}
