//! Request/response client for the management interface.

use std::io::{self, Read, Write};

use pkap_core::error::{Error, FormatError, ManagementError, Result};
use pkap_core::ManagementStatus;
use tracing::{debug, trace, warn};

use crate::ad::AdvertisingData;
use crate::frame::{encode_command, opcode, CommandResponse, FrameBuffer};
use crate::oob::{AddressTypes, LocalOobData, LocalOobExtendedData, OobPair};

const READ_CHUNK: usize = 512;

/// Management client over a connected control socket.
///
/// Owns the socket and its partial-read buffer; one request is in flight
/// at a time. Reads block until the matching response arrives, so bound
/// them with a socket read timeout if needed.
#[derive(Debug)]
pub struct ManagementClient<S> {
    stream: S,
    frames: FrameBuffer,
}

#[cfg(target_os = "linux")]
impl ManagementClient<crate::socket::MgmtSocket> {
    /// Open the control socket.
    pub fn open() -> Result<Self> {
        Ok(Self::new(crate::socket::MgmtSocket::open()?))
    }

    /// Open the control socket with a read timeout.
    pub fn open_with_timeout(timeout: Option<std::time::Duration>) -> Result<Self> {
        let socket = crate::socket::MgmtSocket::open()?;
        socket.set_read_timeout(timeout)?;
        Ok(Self::new(socket))
    }
}

impl<S: Read + Write> ManagementClient<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            frames: FrameBuffer::new(),
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Release the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Send a command and wait for its Command Complete or Command Status.
    ///
    /// Unrelated events are skipped. The returned status is not
    /// interpreted here.
    pub fn issue_request(
        &mut self,
        opcode: u16,
        index: u16,
        params: &[u8],
    ) -> Result<CommandResponse> {
        let frame = encode_command(opcode, index, params)?;
        debug!("mgmt > {}", hex::encode(&frame));
        self.frames.clear();
        self.stream.write_all(&frame)?;

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            while let Some(event) = self.frames.next_frame() {
                match event.command_response() {
                    Some(resp) if resp.opcode == opcode => {
                        debug!(
                            "mgmt < opcode 0x{:04x} status 0x{:02x}",
                            resp.opcode, resp.status
                        );
                        return Ok(resp);
                    }
                    _ => {
                        warn!(
                            "Skipping management event 0x{:04x} ({} bytes)",
                            event.header.code, event.header.len
                        );
                    }
                }
            }

            let n = match self.stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "management socket closed",
                    )))
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            trace!("mgmt < {}", hex::encode(&chunk[..n]));
            self.frames.extend(&chunk[..n]);
        }
    }

    /// Read Local OOB Extended Data.
    ///
    /// Every call makes the controller generate fresh OOB values.
    pub fn read_local_oob_extended_data(
        &mut self,
        index: u16,
        address_types: AddressTypes,
    ) -> Result<LocalOobExtendedData> {
        let resp = self.issue_request(
            opcode::READ_LOCAL_OOB_EXTENDED_DATA,
            index,
            &[address_types.bits()],
        )?;
        let data = successful_data(resp)?;

        if data.len() < 3 {
            return Err(FormatError::InvalidResponse(format!(
                "extended OOB response too short: {} bytes",
                data.len()
            ))
            .into());
        }
        let eir_len = u16::from_le_bytes([data[1], data[2]]) as usize;
        if data.len() != 3 + eir_len {
            return Err(FormatError::InvalidResponse(format!(
                "extended OOB data length mismatch: declared {}, got {}",
                eir_len,
                data.len() - 3
            ))
            .into());
        }

        Ok(LocalOobExtendedData {
            address_types: AddressTypes::from_bits(data[0]),
            data: AdvertisingData::decode(&data[3..])?,
        })
    }

    /// Read fresh LE Secure Connections (confirm, rand) values.
    pub fn read_local_oob_pair(
        &mut self,
        index: u16,
        address_types: AddressTypes,
    ) -> Result<OobPair> {
        let ext = self.read_local_oob_extended_data(index, address_types)?;
        let pair = OobPair::from_advertising_data(&ext.data)?;
        debug!(
            "Local OOB confirm {} rand {}",
            hex::encode(pair.confirm),
            hex::encode(pair.rand)
        );
        Ok(pair)
    }

    /// Legacy Read Local OOB Data.
    pub fn read_local_oob_data(&mut self, index: u16) -> Result<LocalOobData> {
        let resp = self.issue_request(opcode::READ_LOCAL_OOB_DATA, index, &[])?;
        let data = successful_data(resp)?;
        Ok(LocalOobData::parse(&data)?)
    }
}

fn successful_data(resp: CommandResponse) -> Result<Vec<u8>> {
    if resp.status != ManagementStatus::Success as u8 {
        return Err(ManagementError::new(resp.status).into());
    }
    resp.data.ok_or_else(|| {
        FormatError::InvalidResponse("command status without return parameters".to_string())
            .into()
    })
}
