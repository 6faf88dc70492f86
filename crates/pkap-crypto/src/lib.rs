//! # pkap-crypto
//!
//! Cryptographic primitives for BLE-PKAP authentication.
//!
//! This crate provides:
//! - P-256 signing identities and peer keys with key ids
//! - ECDSA P-256 / SHA-256 signing and verification of OOB confirm values
//! - The LE Secure Connections `f4` confirm function
//!
//! Private key material is zeroized on drop.

pub mod ecdsa;
pub mod keys;
pub mod lesc;

pub use ecdsa::{
    generate_initiator_token, generate_responder_token, sign_confirm, verify_confirm,
    verify_token,
};
pub use keys::{KeyRing, PeerKey, SigningIdentity};
pub use lesc::{f4, oob_confirm_value};
