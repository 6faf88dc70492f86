//! # pkap-handshake
//!
//! BLE-PKAP handshake orchestration.
//!
//! The initiator side runs as a sans-IO [`InitiatorHandshake`] state
//! machine driven by [`HandshakeDriver`], which performs the requested
//! transport and management operations and enforces the watchdog. The
//! responder side is [`ResponderAuthenticator`].

pub mod config;
pub mod driver;
pub mod machine;
pub mod responder;
pub mod traits;

pub use config::{HandshakeConfig, HandshakeConfigBuilder, DEFAULT_WATCHDOG};
pub use driver::HandshakeDriver;
pub use machine::{HandshakeAction, HandshakeEvent, HandshakeState, InitiatorHandshake};
pub use responder::{ResponderAuthenticator, ResponderOob};
pub use traits::{AuthTransport, ManagementOobSource, OobSource, ReadInterrupt};
