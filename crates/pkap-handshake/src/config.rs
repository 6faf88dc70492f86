//! Handshake configuration.

use std::time::Duration;

use pkap_mgmt::AddressTypes;

/// Default bound on a whole handshake.
pub const DEFAULT_WATCHDOG: Duration = Duration::from_secs(30);

/// Settings for one initiator handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// Controller index (`hciN`) used for management commands.
    pub controller_index: u16,
    /// Address types requested with the local OOB data.
    pub address_types: AddressTypes,
    /// Key id announced in our token.
    pub local_key_id: u16,
    /// Key id the responder is expected to sign with.
    pub peer_key_id: u16,
    /// Bound on the whole handshake; `None` waits forever.
    pub watchdog: Option<Duration>,
    /// Read timeout on the management socket.
    pub socket_read_timeout: Option<Duration>,
}

impl HandshakeConfig {
    pub fn builder() -> HandshakeConfigBuilder {
        HandshakeConfigBuilder::new()
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            controller_index: 0,
            address_types: AddressTypes::LE,
            local_key_id: 1,
            peer_key_id: 1,
            watchdog: Some(DEFAULT_WATCHDOG),
            socket_read_timeout: None,
        }
    }
}

/// Builder for [`HandshakeConfig`].
#[derive(Debug, Clone, Default)]
pub struct HandshakeConfigBuilder {
    config: HandshakeConfig,
}

impl HandshakeConfigBuilder {
    /// Create new builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the controller index.
    pub fn controller_index(mut self, index: u16) -> Self {
        self.config.controller_index = index;
        self
    }

    /// Set the address types for the OOB read.
    pub fn address_types(mut self, types: AddressTypes) -> Self {
        self.config.address_types = types;
        self
    }

    pub fn local_key_id(mut self, key_id: u16) -> Self {
        self.config.local_key_id = key_id;
        self
    }

    pub fn peer_key_id(mut self, key_id: u16) -> Self {
        self.config.peer_key_id = key_id;
        self
    }

    /// Set the handshake watchdog. `None` disables it.
    pub fn watchdog(mut self, timeout: Option<Duration>) -> Self {
        self.config.watchdog = timeout;
        self
    }

    pub fn socket_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.socket_read_timeout = timeout;
        self
    }

    pub fn build(self) -> HandshakeConfig {
        self.config
    }
}
