//! [`AuthTransport`] over a BlueZ device.

use async_trait::async_trait;
use bluer::gatt::remote::Characteristic;
use bluer::{Device, DeviceEvent, DeviceProperty};
use futures::StreamExt;
use pkap_core::error::{Result, TransportError};
use pkap_core::gatt::{PKAP_AUTH_CHAR_UUID, PKAP_SERVICE_UUID};
use pkap_handshake::AuthTransport;
use tracing::{debug, info};

use crate::stack_error;

/// Link to a BLE-PKAP responder through BlueZ.
pub struct BluerTransport {
    device: Device,
    auth_char: Option<Characteristic>,
}

impl BluerTransport {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            auth_char: None,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Find the auth characteristic, caching it for later operations.
    async fn auth_characteristic(&mut self) -> Result<&Characteristic> {
        if self.auth_char.is_none() {
            let found = find_auth_characteristic(&self.device).await?;
            self.auth_char = Some(found);
        }
        self.auth_char.as_ref().ok_or_else(|| {
            TransportError::CharacteristicNotFound(PKAP_AUTH_CHAR_UUID.to_string()).into()
        })
    }
}

async fn find_auth_characteristic(device: &Device) -> Result<Characteristic> {
    let services = device
        .services()
        .await
        .map_err(|e| stack_error("Failed to list services", e))?;

    for service in services {
        let uuid = service
            .uuid()
            .await
            .map_err(|e| stack_error("Failed to get service UUID", e))?;
        if uuid != PKAP_SERVICE_UUID {
            continue;
        }

        let characteristics = service
            .characteristics()
            .await
            .map_err(|e| stack_error("Failed to list characteristics", e))?;
        for characteristic in characteristics {
            let uuid = characteristic
                .uuid()
                .await
                .map_err(|e| stack_error("Failed to get characteristic UUID", e))?;
            if uuid == PKAP_AUTH_CHAR_UUID {
                debug!("Found BLE-PKAP auth characteristic");
                return Ok(characteristic);
            }
        }
    }

    Err(TransportError::CharacteristicNotFound(PKAP_AUTH_CHAR_UUID.to_string()).into())
}

#[async_trait]
impl AuthTransport for BluerTransport {
    async fn connect(&mut self) -> Result<bool> {
        info!("Initiating BLE connection to {}", self.device.address());
        self.device
            .connect()
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        info!("BLE connection established");

        let resolved = self
            .device
            .is_services_resolved()
            .await
            .map_err(|e| stack_error("Failed to get services state", e))?;
        Ok(resolved)
    }

    async fn wait_services_resolved(&mut self) -> Result<()> {
        // Subscribe before checking so the change cannot slip between the two.
        let events = self
            .device
            .events()
            .await
            .map_err(|e| stack_error("Failed to watch device", e))?;
        futures::pin_mut!(events);

        if self.device.is_services_resolved().await.unwrap_or(false) {
            return Ok(());
        }

        info!("Enumerating device services...");
        while let Some(event) = events.next().await {
            match event {
                DeviceEvent::PropertyChanged(DeviceProperty::ServicesResolved(true)) => {
                    info!("Device services enumerated");
                    return Ok(());
                }
                DeviceEvent::PropertyChanged(DeviceProperty::Connected(false)) => {
                    return Err(TransportError::Disconnected.into());
                }
                _ => {}
            }
        }
        Err(TransportError::Disconnected.into())
    }

    async fn write_auth(&mut self, value: &[u8]) -> Result<()> {
        let characteristic = self.auth_characteristic().await?;
        debug!("Writing auth characteristic: {}", hex::encode(value));
        characteristic
            .write(value)
            .await
            .map_err(|e| TransportError::WriteFailed(e.to_string()).into())
    }

    async fn pair(&mut self) -> Result<()> {
        info!("Initiating BLE pairing");
        self.device
            .pair()
            .await
            .map_err(|e| TransportError::PairingFailed(e.to_string()).into())
    }

    async fn read_auth(&mut self) -> Result<Vec<u8>> {
        let characteristic = self.auth_characteristic().await?;
        characteristic
            .read()
            .await
            .map_err(|e| TransportError::ReadFailed(e.to_string()).into())
    }

    async fn close(&mut self) -> Result<()> {
        self.auth_char = None;
        if !self.device.is_connected().await.unwrap_or(false) {
            debug!("Device {} is not connected", self.device.address());
            return Ok(());
        }

        info!("Closing BLE connection");
        self.device
            .disconnect()
            .await
            .map_err(|e| stack_error("Failed to disconnect", e).into())
    }
}
