//! In-memory radio for tests and hardware-less deployments.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{BeaconRadio, BluetoothError, BluetoothResult, DiscoveredBeacon};

/// A simulated beacon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockBeacon {
    /// MAC address.
    pub address: String,
    /// Advertised name.
    #[serde(default)]
    pub name: Option<String>,
    /// RSSI reported on discovery and on read.
    pub rssi_dbm: i16,
}

impl MockBeacon {
    /// Create a beacon. The address is uppercased.
    #[must_use]
    pub fn new(address: &str, name: Option<&str>, rssi_dbm: i16) -> Self {
        Self {
            address: address.to_uppercase(),
            name: name.map(str::to_string),
            rssi_dbm,
        }
    }
}

/// Deterministic radio backed by a list of [`MockBeacon`]s.
///
/// Discovery returns every configured entry in order, repeats included, so
/// callers see the same sightings a real scan would produce.
#[derive(Debug, Default)]
pub struct MockRadio {
    beacons: Mutex<Vec<MockBeacon>>,
    connected: Mutex<HashSet<String>>,
}

impl MockRadio {
    /// An empty radio.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A radio preloaded with `beacons`.
    #[must_use]
    pub fn from_beacons(beacons: Vec<MockBeacon>) -> Self {
        Self {
            beacons: Mutex::new(beacons),
            connected: Mutex::new(HashSet::new()),
        }
    }

    /// Add a beacon (builder style).
    #[must_use]
    pub fn with_beacon(self, beacon: MockBeacon) -> Self {
        let mut beacons = self.beacons.into_inner();
        beacons.push(beacon);
        Self {
            beacons: Mutex::new(beacons),
            connected: self.connected,
        }
    }

    /// Change the RSSI every sighting of `address` reports.
    pub async fn set_rssi(&self, address: &str, rssi_dbm: i16) {
        let address = address.to_uppercase();
        for beacon in self.beacons.lock().await.iter_mut() {
            if beacon.address == address {
                beacon.rssi_dbm = rssi_dbm;
            }
        }
    }

    async fn find(&self, address: &str) -> BluetoothResult<MockBeacon> {
        self.beacons
            .lock()
            .await
            .iter()
            .find(|b| b.address == address)
            .cloned()
            .ok_or_else(|| BluetoothError::DeviceNotFound {
                address: address.to_string(),
            })
    }
}

#[async_trait]
impl BeaconRadio for MockRadio {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    async fn discover(&self, _timeout: Duration) -> BluetoothResult<Vec<DiscoveredBeacon>> {
        Ok(self
            .beacons
            .lock()
            .await
            .iter()
            .map(|b| DiscoveredBeacon {
                address: b.address.clone(),
                name: b.name.clone(),
                rssi_dbm: Some(b.rssi_dbm),
            })
            .collect())
    }

    async fn connect(&self, address: &str) -> BluetoothResult<()> {
        self.find(address).await?;
        self.connected.lock().await.insert(address.to_string());
        Ok(())
    }

    async fn disconnect(&self, address: &str) -> BluetoothResult<()> {
        self.connected.lock().await.remove(address);
        Ok(())
    }

    async fn is_connected(&self, address: &str) -> bool {
        self.connected.lock().await.contains(&address.to_uppercase())
    }

    async fn read_rssi(&self, address: &str) -> BluetoothResult<i16> {
        if !self.is_connected(address).await {
            return Err(BluetoothError::DeviceNotConnected {
                address: address.to_string(),
            });
        }
        Ok(self.find(address).await?.rssi_dbm)
    }
}
