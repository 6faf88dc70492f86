//! Boundaries the handshake is driven against.

use std::io::{self, Read, Write};

use async_trait::async_trait;
use pkap_core::error::Result;
use pkap_mgmt::{AddressTypes, ManagementClient, OobPair};

/// BLE link to the responder device.
///
/// Implemented by the system Bluetooth stack adapter; every operation
/// completes asynchronously.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait AuthTransport: Send + Sync {
    /// Connect to the device.
    ///
    /// Returns `true` when the GATT services are already resolved.
    async fn connect(&mut self) -> Result<bool>;

    /// Wait until the device's GATT services are resolved.
    async fn wait_services_resolved(&mut self) -> Result<()>;

    /// Write the auth characteristic.
    async fn write_auth(&mut self, value: &[u8]) -> Result<()>;

    /// Run OS-level OOB pairing.
    async fn pair(&mut self) -> Result<()>;

    /// Read the auth characteristic.
    async fn read_auth(&mut self) -> Result<Vec<u8>>;

    /// Disconnect and release the link.
    async fn close(&mut self) -> Result<()>;
}

/// Source of fresh local OOB values.
///
/// Reads may block; callers keep them off the event loop.
#[cfg_attr(test, mockall::automock)]
pub trait OobSource: Send {
    fn read_oob_pair(&mut self) -> Result<OobPair>;
}

/// Wakes an [`OobSource`] read blocked on another thread.
///
/// The driver calls it when a read is abandoned, e.g. on watchdog expiry,
/// so the underlying socket is released at once. The source may fail
/// later reads after an interrupt.
#[cfg_attr(test, mockall::automock)]
pub trait ReadInterrupt: Send + Sync {
    fn interrupt(&self) -> io::Result<()>;
}

#[cfg(target_os = "linux")]
impl ReadInterrupt for pkap_mgmt::MgmtShutdown {
    fn interrupt(&self) -> io::Result<()> {
        self.shutdown()
    }
}

/// [`OobSource`] backed by the management interface of one controller.
#[derive(Debug)]
pub struct ManagementOobSource<S> {
    client: ManagementClient<S>,
    controller_index: u16,
    address_types: AddressTypes,
}

impl<S> ManagementOobSource<S> {
    pub fn new(
        client: ManagementClient<S>,
        controller_index: u16,
        address_types: AddressTypes,
    ) -> Self {
        Self {
            client,
            controller_index,
            address_types,
        }
    }
}

impl<S: Read + Write + Send> OobSource for ManagementOobSource<S> {
    fn read_oob_pair(&mut self) -> Result<OobPair> {
        self.client
            .read_local_oob_pair(self.controller_index, self.address_types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod mock_transport {
        use super::*;

        #[tokio::test]
        async fn mock_read_auth_returns_configured_value() {
            let mut mock = MockAuthTransport::new();
            let expected = vec![0x01, 0x00, 0x01];
            let expected_clone = expected.clone();

            mock.expect_read_auth().returning(move || {
                Box::pin({
                    let value = expected_clone.clone();
                    async move { Ok(value) }
                })
            });

            assert_eq!(mock.read_auth().await.unwrap(), expected);
        }

        #[tokio::test]
        async fn mock_connect_reports_resolution() {
            let mut mock = MockAuthTransport::new();
            mock.expect_connect()
                .returning(|| Box::pin(async { Ok(true) }));

            assert!(mock.connect().await.unwrap());
        }
    }

    mod management_source {
        use super::*;
        use std::collections::VecDeque;
        use std::io;

        struct Canned(VecDeque<u8>, Vec<u8>);

        impl Read for Canned {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.0.read(buf)
            }
        }

        impl Write for Canned {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.1.write(buf)
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        #[test]
        fn reads_pair_for_configured_controller() {
            let mut eir = vec![17, 0x22];
            eir.extend_from_slice(&[0xC0; 16]);
            eir.extend_from_slice(&[17, 0x23]);
            eir.extend_from_slice(&[0x01; 16]);

            let mut params = vec![0x3b, 0x00, 0x00, 0x06];
            params.extend_from_slice(&(eir.len() as u16).to_le_bytes());
            params.extend(eir);

            let mut frame = vec![0x01, 0x00, 0x01, 0x00];
            frame.extend_from_slice(&(params.len() as u16).to_le_bytes());
            frame.extend(params);

            let client = ManagementClient::new(Canned(frame.into(), Vec::new()));
            let mut source = ManagementOobSource::new(client, 1, AddressTypes::LE);
            let pair = source.read_oob_pair().unwrap();

            assert_eq!(pair.confirm, [0xC0; 16]);
            assert_eq!(pair.rand, [0x01; 16]);
        }
    }
}
