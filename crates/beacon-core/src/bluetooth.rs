//! Bluetooth Low Energy beacon discovery and connection lifecycle.
//!
//! This module provides:
//! - The [`BeaconRadio`] trait, the seam between the locator and a radio
//!   backend (BlueZ via `bluer`, or the in-memory [`MockRadio`])
//! - [`BeaconManager`], which owns the "at most one connected beacon" rule
//! - Address validation and normalization helpers

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub use crate::types::{ConnectedBeacon, DiscoveredBeacon};

#[cfg(feature = "bluetooth")]
mod bluez;
mod mock;

#[cfg(feature = "bluetooth")]
pub use bluez::BluezRadio;
pub use mock::{MockBeacon, MockRadio};

/// Bluetooth-specific errors.
#[derive(Debug, Error)]
pub enum BluetoothError {
    /// No adapter is present.
    #[error("No Bluetooth adapter found")]
    AdapterNotFound,

    /// The adapter is present but powered off.
    #[error("Bluetooth adapter is powered off")]
    AdapterPoweredOff,

    /// The requested device was not seen by the radio.
    #[error("Device not found: {address}")]
    DeviceNotFound {
        /// Address that was looked up.
        address: String,
    },

    /// The address is not in `XX:XX:XX:XX:XX:XX` form.
    #[error("Invalid Bluetooth address: {address}")]
    InvalidAddress {
        /// Address as supplied.
        address: String,
    },

    /// Connecting to the device failed.
    #[error("Failed to connect to {address}: {message}")]
    ConnectionFailed {
        /// Target address.
        address: String,
        /// Backend message.
        message: String,
    },

    /// No beacon is currently connected.
    #[error("No beacon is connected")]
    NotConnected,

    /// The given device is known but not connected.
    #[error("Device {address} is not connected")]
    DeviceNotConnected {
        /// Device address.
        address: String,
    },

    /// The device did not report a signal strength.
    #[error("No RSSI reported by {address}")]
    RssiUnavailable {
        /// Device address.
        address: String,
    },

    /// The backend session could not be created.
    #[error("Bluetooth session init failed: {message}")]
    SessionInitFailed {
        /// Backend message.
        message: String,
    },

    /// Discovery could not be started or was interrupted.
    #[error("Bluetooth discovery failed: {message}")]
    DiscoveryFailed {
        /// Backend message.
        message: String,
    },

    /// Any other backend failure.
    #[error("Bluetooth error: {message}")]
    Internal {
        /// Backend message.
        message: String,
    },
}

/// Result alias for Bluetooth operations.
pub type BluetoothResult<T> = Result<T, BluetoothError>;

static ADDRESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{2}(:[0-9A-Fa-f]{2}){5}$").expect("address pattern is valid")
});

/// Returns `true` if `address` is a colon-separated 48-bit MAC address.
#[must_use]
pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_PATTERN.is_match(address)
}

/// Validate `address` and return it uppercased.
///
/// # Errors
///
/// Returns [`BluetoothError::InvalidAddress`] if the format is wrong.
pub fn normalize_address(address: &str) -> BluetoothResult<String> {
    let trimmed = address.trim();
    if is_valid_address(trimmed) {
        Ok(trimmed.to_uppercase())
    } else {
        Err(BluetoothError::InvalidAddress {
            address: address.to_string(),
        })
    }
}

/// Drop repeated sightings of the same address, keeping the first one.
#[must_use]
pub fn dedup_by_address(beacons: Vec<DiscoveredBeacon>) -> Vec<DiscoveredBeacon> {
    let mut unique: Vec<DiscoveredBeacon> = Vec::with_capacity(beacons.len());
    for beacon in beacons {
        if !unique.iter().any(|b| b.address == beacon.address) {
            unique.push(beacon);
        }
    }
    unique
}

/// A radio capable of scanning for, connecting to and reading beacons.
#[async_trait]
pub trait BeaconRadio: Send + Sync {
    /// Short backend name for logs and status output.
    fn backend_name(&self) -> &'static str;

    /// Scan for `timeout` and return every sighting. May contain repeats.
    async fn discover(&self, timeout: Duration) -> BluetoothResult<Vec<DiscoveredBeacon>>;

    /// Open a connection to `address`.
    async fn connect(&self, address: &str) -> BluetoothResult<()>;

    /// Close the connection to `address`.
    async fn disconnect(&self, address: &str) -> BluetoothResult<()>;

    /// Whether the link to `address` is currently up.
    async fn is_connected(&self, address: &str) -> bool;

    /// Read one instantaneous RSSI sample from a connected device.
    async fn read_rssi(&self, address: &str) -> BluetoothResult<i16>;
}

/// Connection lifecycle over a [`BeaconRadio`].
///
/// At most one beacon is connected at a time. Starting a scan drops the
/// current connection, and connecting to a new beacon disconnects the
/// previous one first.
pub struct BeaconManager {
    radio: Arc<dyn BeaconRadio>,
    discovered: RwLock<Vec<DiscoveredBeacon>>,
    connected: RwLock<Option<ConnectedBeacon>>,
}

impl BeaconManager {
    /// Create a manager over `radio`.
    pub fn new(radio: Arc<dyn BeaconRadio>) -> Self {
        Self {
            radio,
            discovered: RwLock::new(Vec::new()),
            connected: RwLock::new(None),
        }
    }

    /// Name of the radio backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.radio.backend_name()
    }

    /// Scan for beacons, replacing the previously discovered list.
    ///
    /// # Errors
    ///
    /// Returns an error if disconnecting the current beacon or the scan fails.
    pub async fn scan(&self, timeout: Duration) -> BluetoothResult<Vec<DiscoveredBeacon>> {
        if let Some(current) = self.connected().await {
            info!(address = %current.address, "Disconnecting before scan");
            self.disconnect(&current.address).await?;
        }

        let sightings = self.radio.discover(timeout).await?;
        let beacons = dedup_by_address(sightings);
        info!(
            backend = self.radio.backend_name(),
            count = beacons.len(),
            "Beacon scan complete"
        );

        self.discovered.write().await.clone_from(&beacons);
        Ok(beacons)
    }

    /// Beacons seen by the last scan.
    pub async fn discovered(&self) -> Vec<DiscoveredBeacon> {
        self.discovered.read().await.clone()
    }

    /// Connect to `address`.
    ///
    /// Reconnecting to the already connected beacon is a no-op while the
    /// radio still reports the link as up.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the radio refuses.
    pub async fn connect(&self, address: &str) -> BluetoothResult<ConnectedBeacon> {
        let address = normalize_address(address)?;

        if let Some(current) = self.connected().await {
            if current.address == address && self.radio.is_connected(&address).await {
                debug!(%address, "Already connected");
                return Ok(current);
            }
            self.disconnect(&current.address).await?;
        }

        self.radio.connect(&address).await?;

        let name = self
            .discovered
            .read()
            .await
            .iter()
            .find(|b| b.address == address)
            .and_then(|b| b.name.clone());

        let beacon = ConnectedBeacon {
            address: address.clone(),
            name,
            connected_at_utc: Utc::now(),
        };
        *self.connected.write().await = Some(beacon.clone());

        info!(%address, "Beacon connected");
        Ok(beacon)
    }

    /// Disconnect from `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the radio fails.
    pub async fn disconnect(&self, address: &str) -> BluetoothResult<()> {
        let address = normalize_address(address)?;
        self.radio.disconnect(&address).await?;

        let mut connected = self.connected.write().await;
        if connected.as_ref().is_some_and(|b| b.address == address) {
            *connected = None;
        }

        info!(%address, "Beacon disconnected");
        Ok(())
    }

    /// The currently connected beacon, if any.
    pub async fn connected(&self) -> Option<ConnectedBeacon> {
        self.connected.read().await.clone()
    }

    /// Read one RSSI sample from the connected beacon.
    ///
    /// # Errors
    ///
    /// Returns [`BluetoothError::NotConnected`] if nothing is connected, or
    /// the radio's error if the read fails.
    pub async fn read_connected_rssi(&self) -> BluetoothResult<(ConnectedBeacon, i16)> {
        let beacon = self.connected().await.ok_or(BluetoothError::NotConnected)?;
        match self.radio.read_rssi(&beacon.address).await {
            Ok(rssi) => Ok((beacon, rssi)),
            Err(e) => {
                warn!(address = %beacon.address, error = %e, "RSSI read failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHONE: &str = "AA:BB:CC:DD:EE:01";
    const TAG: &str = "AA:BB:CC:DD:EE:02";

    fn manager() -> (Arc<MockRadio>, BeaconManager) {
        let radio = Arc::new(
            MockRadio::new()
                .with_beacon(MockBeacon::new(PHONE, Some("Phone"), -55))
                .with_beacon(MockBeacon::new(TAG, Some("Tag"), -70))
                .with_beacon(MockBeacon::new(PHONE, Some("Phone (again)"), -56)),
        );
        let manager = BeaconManager::new(radio.clone());
        (radio, manager)
    }

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address("AA:BB:CC:DD:EE:FF"));
        assert!(is_valid_address("aa:bb:cc:dd:ee:ff"));
        assert!(!is_valid_address("AA:BB:CC:DD:EE"));
        assert!(!is_valid_address("AA-BB-CC-DD-EE-FF"));
        assert!(!is_valid_address("GG:BB:CC:DD:EE:FF"));
    }

    #[test]
    fn test_normalize_address_uppercases() {
        assert_eq!(normalize_address(" aa:bb:cc:dd:ee:ff ").unwrap(), "AA:BB:CC:DD:EE:FF");
        assert!(matches!(
            normalize_address("nope"),
            Err(BluetoothError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn test_scan_deduplicates_by_address() {
        let (_, manager) = manager();
        let beacons = manager.scan(Duration::from_millis(10)).await.unwrap();
        assert_eq!(beacons.len(), 2);
        assert_eq!(beacons[0].name.as_deref(), Some("Phone"));
        assert_eq!(manager.discovered().await.len(), 2);
    }

    #[tokio::test]
    async fn test_connect_switches_beacon() {
        let (radio, manager) = manager();
        manager.scan(Duration::from_millis(10)).await.unwrap();

        let first = manager.connect(&PHONE.to_lowercase()).await.unwrap();
        assert_eq!(first.address, PHONE);
        assert_eq!(first.name.as_deref(), Some("Phone"));

        manager.connect(TAG).await.unwrap();
        assert!(!radio.is_connected(PHONE).await);
        assert!(radio.is_connected(TAG).await);
        assert_eq!(manager.connected().await.unwrap().address, TAG);
    }

    #[tokio::test]
    async fn test_scan_disconnects_current_beacon() {
        let (radio, manager) = manager();
        manager.connect(PHONE).await.unwrap();
        manager.scan(Duration::from_millis(10)).await.unwrap();
        assert!(manager.connected().await.is_none());
        assert!(!radio.is_connected(PHONE).await);
    }

    #[tokio::test]
    async fn test_read_rssi_requires_connection() {
        let (radio, manager) = manager();
        assert!(matches!(
            manager.read_connected_rssi().await,
            Err(BluetoothError::NotConnected)
        ));

        manager.connect(TAG).await.unwrap();
        radio.set_rssi(TAG, -64).await;
        let (beacon, rssi) = manager.read_connected_rssi().await.unwrap();
        assert_eq!(beacon.address, TAG);
        assert_eq!(rssi, -64);
    }

    #[tokio::test]
    async fn test_connect_same_beacon_is_noop_while_link_up() {
        let (radio, manager) = manager();
        let first = manager.connect(TAG).await.unwrap();
        let again = manager.connect(TAG).await.unwrap();
        assert_eq!(first.connected_at_utc, again.connected_at_utc);
        assert!(radio.is_connected(TAG).await);
    }

    #[tokio::test]
    async fn test_connect_same_beacon_relinks_after_drop() {
        let (radio, manager) = manager();
        manager.connect(TAG).await.unwrap();

        radio.disconnect(TAG).await.unwrap();
        assert!(!radio.is_connected(TAG).await);

        manager.connect(TAG).await.unwrap();
        assert!(radio.is_connected(TAG).await);
        assert_eq!(manager.connected().await.unwrap().address, TAG);
    }

    #[tokio::test]
    async fn test_disconnect_clears_connection() {
        let (_, manager) = manager();
        manager.connect(PHONE).await.unwrap();
        manager.disconnect(PHONE).await.unwrap();
        assert!(manager.connected().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_unknown_device_fails() {
        let (_, manager) = manager();
        let err = manager.connect("11:22:33:44:55:66").await.unwrap_err();
        assert!(matches!(err, BluetoothError::DeviceNotFound { .. }));
        assert!(manager.connected().await.is_none());
    }
}
