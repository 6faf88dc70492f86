//! # pkap-mgmt
//!
//! Client for the BlueZ kernel management interface, limited to what
//! BLE-PKAP needs: reading the local controller's OOB pairing data.
//!
//! This crate provides:
//! - Management frame encoding and response reassembly
//! - Advertising data (AD) element decoding
//! - Read Local OOB Extended Data and the legacy Read Local OOB Data
//! - The raw control socket (Linux only)

pub mod ad;
pub mod client;
pub mod frame;
pub mod oob;
#[cfg(target_os = "linux")]
pub mod socket;

pub use ad::{AdType, AdvertisingData};
pub use client::ManagementClient;
pub use frame::{CommandResponse, INDEX_NONE};
pub use oob::{AddressTypes, LocalOobData, LocalOobExtendedData, OobPair};
#[cfg(target_os = "linux")]
pub use socket::{MgmtShutdown, MgmtSocket};
