//! # pkap-core
//!
//! Core types and error definitions shared across the BLE-PKAP crates.
//!
//! This crate provides:
//! - Initiator and responder auth tokens with their fixed binary layouts
//! - GATT identifiers of the BLE-PKAP service
//! - Common error types

pub mod error;
pub mod gatt;
pub mod token;

pub use error::{
    Error, FormatError, ManagementError, ManagementStatus, Result, SignatureError, TransportError,
};
pub use gatt::{PKAP_AUTH_CHAR_UUID, PKAP_SERVICE_UUID};
pub use token::{
    AuthToken, InitiatorAuthToken, ResponderAuthToken, SignatureValue, CONFIRM_LEN,
    FORMAT_V1, INITIATOR_TOKEN_LEN, RANDOM_LEN, RESPONDER_TOKEN_LEN,
};
