//! # pkap-bluetooth
//!
//! BlueZ-backed transport for BLE-PKAP initiators.
//!
//! This crate connects the handshake in `pkap-handshake` to a real
//! responder through the `bluer` D-Bus bindings:
//!
//! - Adapter selection and target device discovery
//! - GATT lookup of the BLE-PKAP auth characteristic
//! - Connect, pair, characteristic read/write and disconnect
//! - A disconnect monitor that posts into the handshake event queue
//!
//! ## Requirements
//!
//! - Linux with BlueZ 5.50+
//! - D-Bus system bus access
//! - A Bluetooth LE capable adapter

#![cfg(target_os = "linux")]

pub mod adapter;
pub mod monitor;
pub mod transport;

pub use adapter::{controller_index, parse_address, PkapAdapter};
pub use monitor::spawn_disconnect_monitor;
pub use transport::BluerTransport;

/// Convert a BlueZ failure into a transport error with context.
pub(crate) fn stack_error(context: &str, e: bluer::Error) -> pkap_core::TransportError {
    pkap_core::TransportError::Stack(format!("{}: {}", context, e))
}
