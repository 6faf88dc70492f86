//! Adapter selection and target device discovery.

use std::time::Duration;

use bluer::{Adapter, AdapterEvent, Address, Device, Session};
use futures::StreamExt;
use pkap_core::error::{Result, TransportError};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::stack_error;

/// Parse a device address such as `C0:98:E5:49:00:01`.
pub fn parse_address(s: &str) -> Result<Address> {
    s.parse::<Address>()
        .map_err(|_| TransportError::DeviceNotFound(format!("invalid address '{}'", s)).into())
}

/// Controller index from an adapter name (`hci0` -> 0).
pub fn controller_index(name: &str) -> Option<u16> {
    name.strip_prefix("hci")?.parse().ok()
}

/// One BlueZ adapter used by the initiator.
pub struct PkapAdapter {
    session: Session,
    adapter: Adapter,
}

impl PkapAdapter {
    /// Open the named adapter (e.g. `hci0`). The adapter must be powered.
    pub async fn open(name: &str) -> Result<Self> {
        let session = Session::new()
            .await
            .map_err(|e| stack_error("Failed to create BlueZ session", e))?;

        let adapter = session.adapter(name).map_err(|e| {
            TransportError::Stack(format!("BLE adapter {} not found: {}", name, e))
        })?;

        let powered = adapter
            .is_powered()
            .await
            .map_err(|e| stack_error("Failed to get power state", e))?;
        if !powered {
            return Err(TransportError::Stack(format!("BLE adapter {} is powered off", name)).into());
        }

        info!("Using Bluetooth adapter: {}", adapter.name());
        Ok(Self { session, adapter })
    }

    /// Get the adapter name (e.g., "hci0").
    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    /// Locate the target device with fresh state.
    ///
    /// A device BlueZ already knows is disconnected and removed first, so
    /// pairing always starts from scratch. Then a scan runs until the
    /// device is seen again or `scan_timeout` elapses.
    pub async fn find_device(&self, address: Address, scan_timeout: Duration) -> Result<Device> {
        self.forget_device(address).await?;

        info!("Scanning for device {}", address);
        let events = self
            .adapter
            .discover_devices()
            .await
            .map_err(|e| stack_error("Failed to start discovery", e))?;
        futures::pin_mut!(events);

        let found = timeout(scan_timeout, async {
            while let Some(event) = events.next().await {
                if let AdapterEvent::DeviceAdded(addr) = event {
                    debug!("Discovered device: {}", addr);
                    if addr == address {
                        return true;
                    }
                }
            }
            false
        })
        .await;

        match found {
            Ok(true) => {
                info!("Device found");
                self.adapter
                    .device(address)
                    .map_err(|e| stack_error("Failed to get device", e).into())
            }
            _ => Err(TransportError::DeviceNotFound(address.to_string()).into()),
        }
    }

    async fn forget_device(&self, address: Address) -> Result<()> {
        let known = self
            .adapter
            .device_addresses()
            .await
            .map_err(|e| stack_error("Failed to list devices", e))?;
        if !known.contains(&address) {
            return Ok(());
        }

        let device = self
            .adapter
            .device(address)
            .map_err(|e| stack_error("Failed to get device", e))?;
        if device.is_connected().await.unwrap_or(false) {
            if let Err(e) = device.disconnect().await {
                warn!("Failed to disconnect stale device {}: {}", address, e);
            }
        }

        debug!("Removing stale device {}", address);
        self.adapter
            .remove_device(address)
            .await
            .map_err(|e| stack_error("Failed to remove device", e))?;
        Ok(())
    }

    /// Get a reference to the underlying bluer session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Get a reference to the underlying bluer adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }
}
