//! BlueZ radio backend (Linux) built on `bluer`.

use std::time::Duration;

use async_trait::async_trait;
use bluer::{Adapter, AdapterEvent, Address, Device, Session};
use futures::{pin_mut, StreamExt};
use tracing::{debug, info};

use super::{BeaconRadio, BluetoothError, BluetoothResult, DiscoveredBeacon};

/// Radio using the system's default BlueZ adapter.
pub struct BluezRadio {
    _session: Session,
    adapter: Adapter,
}

impl BluezRadio {
    /// Open a BlueZ session and power on the default adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if no adapter exists or it cannot be powered on.
    pub async fn new() -> BluetoothResult<Self> {
        let session = Session::new()
            .await
            .map_err(|e| BluetoothError::SessionInitFailed {
                message: e.to_string(),
            })?;
        let adapter = session
            .default_adapter()
            .await
            .map_err(|_| BluetoothError::AdapterNotFound)?;

        let powered = adapter.is_powered().await.map_err(internal)?;
        if !powered {
            adapter
                .set_powered(true)
                .await
                .map_err(|_| BluetoothError::AdapterPoweredOff)?;
        }

        info!(adapter = adapter.name(), "BlueZ adapter ready");
        Ok(Self {
            _session: session,
            adapter,
        })
    }

    fn device(&self, address: &str) -> BluetoothResult<Device> {
        let addr: Address = address.parse().map_err(|_| BluetoothError::InvalidAddress {
            address: address.to_string(),
        })?;
        self.adapter
            .device(addr)
            .map_err(|_| BluetoothError::DeviceNotFound {
                address: address.to_string(),
            })
    }
}

fn internal(e: bluer::Error) -> BluetoothError {
    BluetoothError::Internal {
        message: e.to_string(),
    }
}

#[async_trait]
impl BeaconRadio for BluezRadio {
    fn backend_name(&self) -> &'static str {
        "bluez"
    }

    async fn discover(&self, timeout: Duration) -> BluetoothResult<Vec<DiscoveredBeacon>> {
        let events = self
            .adapter
            .discover_devices()
            .await
            .map_err(|e| BluetoothError::DiscoveryFailed {
                message: e.to_string(),
            })?;
        pin_mut!(events);

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let mut sightings = Vec::new();
        loop {
            tokio::select! {
                () = &mut deadline => break,
                event = events.next() => match event {
                    Some(AdapterEvent::DeviceAdded(addr)) => {
                        let device = self.adapter.device(addr).map_err(internal)?;
                        let name = device.name().await.ok().flatten();
                        let rssi_dbm = device.rssi().await.ok().flatten();
                        debug!(address = %addr, ?name, ?rssi_dbm, "Device sighted");
                        sightings.push(DiscoveredBeacon {
                            address: addr.to_string().to_uppercase(),
                            name,
                            rssi_dbm,
                        });
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }

        Ok(sightings)
    }

    async fn connect(&self, address: &str) -> BluetoothResult<()> {
        let device = self.device(address)?;
        if device.is_connected().await.map_err(internal)? {
            return Ok(());
        }
        device
            .connect()
            .await
            .map_err(|e| BluetoothError::ConnectionFailed {
                address: address.to_string(),
                message: e.to_string(),
            })
    }

    async fn disconnect(&self, address: &str) -> BluetoothResult<()> {
        let device = self.device(address)?;
        if !device.is_connected().await.map_err(internal)? {
            return Ok(());
        }
        device.disconnect().await.map_err(internal)
    }

    async fn is_connected(&self, address: &str) -> bool {
        match self.device(address) {
            Ok(device) => device.is_connected().await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn read_rssi(&self, address: &str) -> BluetoothResult<i16> {
        let device = self.device(address)?;
        if !device.is_connected().await.map_err(internal)? {
            return Err(BluetoothError::DeviceNotConnected {
                address: address.to_string(),
            });
        }
        device
            .rssi()
            .await
            .map_err(internal)?
            .ok_or_else(|| BluetoothError::RssiUnavailable {
                address: address.to_string(),
            })
    }
}
