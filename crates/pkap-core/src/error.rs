//! Error types for BLE-PKAP.

use std::fmt;

use thiserror::Error;

/// Primary error type for all BLE-PKAP operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Management error: {0}")]
    Management(#[from] ManagementError),

    #[error("Signature error: {0}")]
    Signature(#[from] SignatureError),

    #[error("Unknown key id: {0}")]
    UnknownKey(u16),

    #[error("No initiator auth token received")]
    NoPendingToken,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Handshake timed out")]
    Timeout,
}

/// Malformed tokens, TLV data or management payloads.
///
/// Always a local rejection of the input; retrying with the same bytes
/// gives the same result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unsupported auth token format: {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid auth token length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid random value length: {0}")]
    InvalidRandomLength(usize),

    #[error("Invalid confirmation value length: {0}")]
    InvalidConfirmLength(usize),

    #[error(
        "Invalid advertising data element length at offset {offset}: declared {declared}, {available} bytes available"
    )]
    TruncatedElement {
        offset: usize,
        declared: usize,
        available: usize,
    },

    #[error("Invalid management response: {0}")]
    InvalidResponse(String),

    #[error("Missing advertising data element 0x{0:02x}")]
    MissingElement(u8),
}

/// Status codes returned by the BlueZ management interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ManagementStatus {
    Success = 0x00,
    UnknownCommand = 0x01,
    NotConnected = 0x02,
    Failed = 0x03,
    ConnectFailed = 0x04,
    AuthFailed = 0x05,
    NotPaired = 0x06,
    NoResources = 0x07,
    Timeout = 0x08,
    AlreadyConnected = 0x09,
    Busy = 0x0a,
    Rejected = 0x0b,
    NotSupported = 0x0c,
    InvalidParams = 0x0d,
    Disconnected = 0x0e,
    NotPowered = 0x0f,
    Cancelled = 0x10,
    InvalidIndex = 0x11,
    RfKilled = 0x12,
    AlreadyPaired = 0x13,
    PermissionDenied = 0x14,
}

impl ManagementStatus {
    /// Convert from raw status byte.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Success),
            0x01 => Some(Self::UnknownCommand),
            0x02 => Some(Self::NotConnected),
            0x03 => Some(Self::Failed),
            0x04 => Some(Self::ConnectFailed),
            0x05 => Some(Self::AuthFailed),
            0x06 => Some(Self::NotPaired),
            0x07 => Some(Self::NoResources),
            0x08 => Some(Self::Timeout),
            0x09 => Some(Self::AlreadyConnected),
            0x0a => Some(Self::Busy),
            0x0b => Some(Self::Rejected),
            0x0c => Some(Self::NotSupported),
            0x0d => Some(Self::InvalidParams),
            0x0e => Some(Self::Disconnected),
            0x0f => Some(Self::NotPowered),
            0x10 => Some(Self::Cancelled),
            0x11 => Some(Self::InvalidIndex),
            0x12 => Some(Self::RfKilled),
            0x13 => Some(Self::AlreadyPaired),
            0x14 => Some(Self::PermissionDenied),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::UnknownCommand => "Unknown Command",
            Self::NotConnected => "Not Connected",
            Self::Failed => "Failed",
            Self::ConnectFailed => "Connect Failed",
            Self::AuthFailed => "Authentication Failed",
            Self::NotPaired => "Not Paired",
            Self::NoResources => "No Resources",
            Self::Timeout => "Timeout",
            Self::AlreadyConnected => "Already Connected",
            Self::Busy => "Busy",
            Self::Rejected => "Rejected",
            Self::NotSupported => "Not Supported",
            Self::InvalidParams => "Invalid Parameters",
            Self::Disconnected => "Disconnected",
            Self::NotPowered => "Not Powered",
            Self::Cancelled => "Cancelled",
            Self::InvalidIndex => "Invalid Index",
            Self::RfKilled => "RFKilled",
            Self::AlreadyPaired => "Already Paired",
            Self::PermissionDenied => "Permission Denied",
        }
    }
}

/// Non-success status from the local controller's management interface.
///
/// The raw code is preserved even when it falls outside the known set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagementError {
    pub code: u8,
}

impl ManagementError {
    pub fn new(code: u8) -> Self {
        Self { code }
    }

    /// Known status for this code, if any.
    pub fn status(&self) -> Option<ManagementStatus> {
        ManagementStatus::from_code(self.code)
    }

    /// Busy and Timeout may succeed if the caller tries again later.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.status(),
            Some(ManagementStatus::Busy) | Some(ManagementStatus::Timeout)
        )
    }
}

impl fmt::Display for ManagementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.status().map(ManagementStatus::name).unwrap_or("Unknown");
        write!(f, "controller returned status 0x{:02x} ({})", self.code, name)
    }
}

impl std::error::Error for ManagementError {}

/// Signature generation and verification errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Malformed signature")]
    MalformedSignature,

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Failures reported by the BLE transport collaborator.
///
/// These originate outside the core and are carried through opaquely.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Bluetooth stack error: {0}")]
    Stack(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("Pairing failed: {0}")]
    PairingFailed(String),

    #[error("Characteristic not found: {0}")]
    CharacteristicNotFound(String),

    #[error("Characteristic read failed: {0}")]
    ReadFailed(String),

    #[error("Characteristic write failed: {0}")]
    WriteFailed(String),

    #[error("Device disconnected")]
    Disconnected,

    #[error("Unexpected event {event} in state {state}")]
    UnexpectedEvent { event: String, state: String },
}

/// Convenience Result type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats() {
        let err = Error::Format(FormatError::UnsupportedVersion(2));
        assert!(err.to_string().contains("Format error"));
        assert!(err.to_string().contains("format: 2"));

        let err = Error::UnknownKey(7);
        assert!(err.to_string().contains("key id: 7"));

        let err = Error::Timeout;
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn length_and_version_errors_are_distinct() {
        let version = FormatError::UnsupportedVersion(9);
        let length = FormatError::InvalidLength {
            expected: 83,
            actual: 82,
        };
        assert_ne!(version, length);
        assert!(length.to_string().contains("83"));
        assert!(length.to_string().contains("82"));
    }

    mod management {
        use super::*;

        #[test]
        fn known_code_maps_to_status() {
            let err = ManagementError::new(0x0f);
            assert_eq!(err.status(), Some(ManagementStatus::NotPowered));
            assert!(err.to_string().contains("0x0f"));
            assert!(err.to_string().contains("Not Powered"));
        }

        #[test]
        fn unknown_code_is_preserved() {
            let err = ManagementError::new(0x7e);
            assert_eq!(err.code, 0x7e);
            assert_eq!(err.status(), None);
            assert!(err.to_string().contains("Unknown"));
        }

        #[test]
        fn busy_and_timeout_are_retriable() {
            assert!(ManagementError::new(0x0a).is_retriable());
            assert!(ManagementError::new(0x08).is_retriable());
            assert!(!ManagementError::new(0x11).is_retriable());
            assert!(!ManagementError::new(0x14).is_retriable());
        }

        #[test]
        fn from_code_covers_full_range() {
            for code in 0x00..=0x14u8 {
                let status = ManagementStatus::from_code(code).unwrap();
                assert_eq!(status as u8, code);
            }
            assert_eq!(ManagementStatus::from_code(0x15), None);
        }
    }

    #[test]
    fn error_conversions() {
        let err: Error = FormatError::MissingElement(0x22).into();
        assert!(matches!(err, Error::Format(_)));

        let err: Error = ManagementError::new(0x0a).into();
        assert!(matches!(err, Error::Management(_)));

        let err: Error = SignatureError::VerificationFailed.into();
        assert!(matches!(err, Error::Signature(_)));

        let err: Error = TransportError::Disconnected.into();
        assert!(matches!(err, Error::Transport(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn error_source_chain() {
        use std::error::Error as StdError;

        let err = Error::Signature(SignatureError::VerificationFailed);
        assert!(err.source().is_some());
    }
}
