//! Responder side of BLE-PKAP.
//!
//! The initiator writes its token to the auth characteristic before
//! pairing. When the local stack asks for OOB data during pairing, the
//! responder recomputes the initiator's confirmation value from the
//! initiator's LESC public key and the token's random value, verifies the
//! signature over it and publishes its own token signed over the same
//! value.

use pkap_core::error::{Error, Result};
use pkap_core::token::{AuthToken, InitiatorAuthToken};
use pkap_crypto::{
    generate_responder_token, oob_confirm_value, verify_token, KeyRing, SigningIdentity,
};
use pkap_mgmt::OobPair;
use tracing::{debug, info, warn};

/// OOB data handed to the local stack plus the token to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponderOob {
    /// The initiator's (confirm, rand) as the stack expects them.
    pub peer_oob: OobPair,
    /// Encoded responder token.
    pub token: Vec<u8>,
}

/// Per-connection responder state.
#[derive(Debug)]
pub struct ResponderAuthenticator {
    identity: SigningIdentity,
    initiators: KeyRing,
    pending: Option<InitiatorAuthToken>,
    published: Option<Vec<u8>>,
}

impl ResponderAuthenticator {
    pub fn new(identity: SigningIdentity, initiators: KeyRing) -> Self {
        Self {
            identity,
            initiators,
            pending: None,
            published: None,
        }
    }

    /// Handle a write to the auth characteristic.
    ///
    /// A later write replaces an earlier one.
    pub fn on_token_written(&mut self, value: &[u8]) -> Result<()> {
        let token = InitiatorAuthToken::decode(value)?;
        if !self.initiators.contains(token.key_id) {
            warn!("Initiator token with unknown key id {}", token.key_id);
            return Err(Error::UnknownKey(token.key_id));
        }

        debug!("Received initiator auth token (key id {})", token.key_id);
        self.pending = Some(token);
        self.published = None;
        Ok(())
    }

    /// Handle the stack's OOB data request for a pairing in progress.
    ///
    /// `peer_pk_x` is the X coordinate of the initiator's LESC public key,
    /// big-endian. The pending token is consumed whether or not it
    /// verifies; without one the pairing must fail.
    pub fn on_oob_request(&mut self, peer_pk_x: &[u8; 32]) -> Result<ResponderOob> {
        let token = self.pending.take().ok_or(Error::NoPendingToken)?;
        let key = self
            .initiators
            .get(token.key_id)
            .ok_or(Error::UnknownKey(token.key_id))?;

        let confirm = oob_confirm_value(peer_pk_x, &token.rand);
        verify_token(&token, &confirm, key.verifying_key())?;
        info!("Initiator authenticated (key id {})", token.key_id);

        let response = generate_responder_token(&confirm, &self.identity)?.encode()?;
        self.published = Some(response.clone());

        Ok(ResponderOob {
            peer_oob: OobPair::new(confirm, token.rand),
            token: response,
        })
    }

    /// Current auth characteristic value for reads.
    pub fn auth_value(&self) -> Option<&[u8]> {
        self.published.as_deref()
    }

    /// Forget all per-connection state.
    pub fn on_disconnect(&mut self) {
        self.pending = None;
        self.published = None;
    }

    pub fn has_pending_token(&self) -> bool {
        self.pending.is_some()
    }
}
