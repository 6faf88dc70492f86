//! Management interface frame codec.
//!
//! Every frame starts with a 6-byte little-endian header:
//! [Code: u16][Controller index: u16][Parameter length: u16]
//!
//! Command Complete and Command Status events nest
//! [Command opcode: u16][Status: u8] ahead of any return parameters.

use pkap_core::error::FormatError;

/// Frame header length.
pub const HEADER_LEN: usize = 6;

/// Index used for commands that do not target a specific controller.
pub const INDEX_NONE: u16 = 0xffff;

/// Command opcodes.
pub mod opcode {
    pub const READ_LOCAL_OOB_DATA: u16 = 0x0020;
    pub const READ_LOCAL_OOB_EXTENDED_DATA: u16 = 0x003b;
}

/// Event codes.
pub mod event {
    pub const CMD_COMPLETE: u16 = 0x0001;
    pub const CMD_STATUS: u16 = 0x0002;
    pub const CONTROLLER_ERROR: u16 = 0x0003;
}

/// Encode a command frame.
pub fn encode_command(opcode: u16, index: u16, params: &[u8]) -> Result<Vec<u8>, FormatError> {
    let len = u16::try_from(params.len()).map_err(|_| {
        FormatError::InvalidResponse(format!("command parameters too long: {}", params.len()))
    })?;

    let mut out = Vec::with_capacity(HEADER_LEN + params.len());
    out.extend_from_slice(&opcode.to_le_bytes());
    out.extend_from_slice(&index.to_le_bytes());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(params);
    Ok(out)
}

/// Parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub code: u16,
    pub index: u16,
    pub len: u16,
}

impl FrameHeader {
    /// Parse a header; `None` until six bytes are available.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_LEN {
            return None;
        }
        Some(Self {
            code: u16::from_le_bytes([buf[0], buf[1]]),
            index: u16::from_le_bytes([buf[2], buf[3]]),
            len: u16::from_le_bytes([buf[4], buf[5]]),
        })
    }

    /// Header plus parameters.
    pub fn frame_len(&self) -> usize {
        HEADER_LEN + self.len as usize
    }
}

/// One complete event frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFrame {
    pub header: FrameHeader,
    pub params: Vec<u8>,
}

/// Outcome of a command, taken from a Command Complete or Command Status
/// event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub opcode: u16,
    pub status: u8,
    /// Return parameters; only Command Complete events carry them.
    pub data: Option<Vec<u8>>,
}

impl EventFrame {
    /// Interpret as a command response, if this is one.
    pub fn command_response(&self) -> Option<CommandResponse> {
        let complete = match self.header.code {
            event::CMD_COMPLETE => true,
            event::CMD_STATUS => false,
            _ => return None,
        };
        if self.params.len() < 3 {
            return None;
        }

        let opcode = u16::from_le_bytes([self.params[0], self.params[1]]);
        let status = self.params[2];
        let data = complete.then(|| self.params[3..].to_vec());
        Some(CommandResponse {
            opcode,
            status,
            data,
        })
    }
}

/// Accumulates socket reads and yields complete frames.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Remove and return the next complete frame, if one is buffered.
    pub fn next_frame(&mut self) -> Option<EventFrame> {
        let header = FrameHeader::parse(&self.buf)?;
        let frame_len = header.frame_len();
        if self.buf.len() < frame_len {
            return None;
        }

        let params = self.buf[HEADER_LEN..frame_len].to_vec();
        self.buf.drain(..frame_len);
        Some(EventFrame { header, params })
    }

    /// Bytes buffered but not yet returned as a frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
