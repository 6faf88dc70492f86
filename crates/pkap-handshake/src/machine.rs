//! Initiator handshake state machine.
//!
//! ```text
//! Idle -> AwaitingOobData -> TokenSent -> AwaitingPairing
//!      -> VerifyingResponder -> Authenticated | Failed
//! ```
//!
//! The machine does no I/O. Each [`HandshakeEvent`] fed to
//! [`InitiatorHandshake::handle`] yields the [`HandshakeAction`]s the caller
//! must carry out; their completions come back as further events.

use pkap_core::error::{Error, FormatError, Result, SignatureError, TransportError};
use pkap_core::token::{AuthToken, InitiatorAuthToken, ResponderAuthToken};
use pkap_crypto::{generate_initiator_token, verify_token, PeerKey, SigningIdentity};
use pkap_mgmt::{AdType, OobPair};
use tracing::{debug, info, warn};

use crate::config::HandshakeConfig;

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    Idle,
    AwaitingOobData,
    TokenSent,
    AwaitingPairing,
    VerifyingResponder,
    Authenticated,
    Failed,
}

impl HandshakeState {
    /// `Authenticated` and `Failed` end the handshake.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Authenticated | Self::Failed)
    }
}

/// Inputs to the state machine.
#[derive(Debug)]
pub enum HandshakeEvent {
    /// Connected and GATT services resolved.
    ServicesResolved,
    OobDataRead(Result<OobPair>),
    TokenWritten(Result<()>),
    PairingCompleted(Result<()>),
    ResponderTokenRead(Result<Vec<u8>>),
    /// The transport failed outside of any pending operation.
    TransportFailed(Error),
    Disconnected,
    WatchdogExpired,
}

impl HandshakeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ServicesResolved => "ServicesResolved",
            Self::OobDataRead(_) => "OobDataRead",
            Self::TokenWritten(_) => "TokenWritten",
            Self::PairingCompleted(_) => "PairingCompleted",
            Self::ResponderTokenRead(_) => "ResponderTokenRead",
            Self::TransportFailed(_) => "TransportFailed",
            Self::Disconnected => "Disconnected",
            Self::WatchdogExpired => "WatchdogExpired",
        }
    }
}

/// Work the driver performs on the machine's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeAction {
    Connect,
    ReadOobData,
    WriteAuthToken(Vec<u8>),
    Pair,
    ReadAuthToken,
    Close,
}

/// Initiator side of one BLE-PKAP handshake.
///
/// Single use: once terminal, start a new machine for the next attempt.
pub struct InitiatorHandshake {
    identity: SigningIdentity,
    responder_key: PeerKey,
    state: HandshakeState,
    oob: Option<OobPair>,
    pending_token: Option<InitiatorAuthToken>,
    failure: Option<Error>,
}

impl InitiatorHandshake {
    /// `responder_key` carries the key id the responder must sign with.
    pub fn new(identity: SigningIdentity, responder_key: PeerKey) -> Self {
        Self {
            identity,
            responder_key,
            state: HandshakeState::Idle,
            oob: None,
            pending_token: None,
            failure: None,
        }
    }

    /// Build a machine whose keys carry the key ids named in `config`.
    ///
    /// Fails with `InvalidKey` when either key id disagrees with the
    /// configuration.
    pub fn from_config(
        identity: SigningIdentity,
        responder_key: PeerKey,
        config: &HandshakeConfig,
    ) -> Result<Self> {
        check_key_id("initiator", identity.key_id(), config.local_key_id)?;
        check_key_id("responder", responder_key.key_id(), config.peer_key_id)?;
        Ok(Self::new(identity, responder_key))
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Error that ended the handshake, if it failed.
    pub fn error(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    /// Token sent for the current attempt.
    pub fn pending_token(&self) -> Option<&InitiatorAuthToken> {
        self.pending_token.as_ref()
    }

    /// First action of a fresh handshake.
    pub fn start(&mut self) -> Vec<HandshakeAction> {
        if self.state != HandshakeState::Idle {
            return Vec::new();
        }
        info!("Starting BLE-PKAP handshake");
        vec![HandshakeAction::Connect]
    }

    /// Advance on an event.
    pub fn handle(&mut self, event: HandshakeEvent) -> Vec<HandshakeAction> {
        if self.is_terminal() {
            debug!("Ignoring {} in {:?}", event.name(), self.state);
            return Vec::new();
        }

        use HandshakeEvent as E;
        use HandshakeState as S;

        match (self.state, event) {
            (_, E::WatchdogExpired) => self.fail(Error::Timeout),
            (_, E::Disconnected) => self.fail(TransportError::Disconnected.into()),
            (_, E::TransportFailed(e)) => self.fail(e),

            (S::Idle, E::ServicesResolved) => {
                self.transition(S::AwaitingOobData);
                vec![HandshakeAction::ReadOobData]
            }

            (S::AwaitingOobData, E::OobDataRead(result)) => {
                match result.and_then(|pair| self.build_token(pair)) {
                    Ok(bytes) => {
                        self.transition(S::TokenSent);
                        vec![HandshakeAction::WriteAuthToken(bytes)]
                    }
                    Err(e) => self.fail(e),
                }
            }

            (S::TokenSent, E::TokenWritten(Ok(()))) => {
                self.transition(S::AwaitingPairing);
                vec![HandshakeAction::Pair]
            }

            (S::AwaitingPairing, E::PairingCompleted(Ok(()))) => {
                self.transition(S::VerifyingResponder);
                vec![HandshakeAction::ReadAuthToken]
            }

            (S::TokenSent, E::TokenWritten(Err(e)))
            | (S::AwaitingPairing, E::PairingCompleted(Err(e))) => self.fail(e),

            (S::VerifyingResponder, E::ResponderTokenRead(result)) => {
                match result.and_then(|bytes| self.verify_responder(&bytes)) {
                    Ok(()) => {
                        self.transition(S::Authenticated);
                        self.discard_attempt();
                        info!("Responder authenticated");
                        vec![HandshakeAction::Close]
                    }
                    Err(e) => self.fail(e),
                }
            }

            (state, event) => self.fail(
                TransportError::UnexpectedEvent {
                    event: event.name().to_string(),
                    state: format!("{:?}", state),
                }
                .into(),
            ),
        }
    }

    /// Outcome once terminal.
    pub fn into_result(self) -> Result<()> {
        match (self.state, self.failure) {
            (HandshakeState::Authenticated, _) => Ok(()),
            (_, Some(e)) => Err(e),
            (state, None) => Err(TransportError::UnexpectedEvent {
                event: "Finished".to_string(),
                state: format!("{:?}", state),
            }
            .into()),
        }
    }

    fn build_token(&mut self, pair: OobPair) -> Result<Vec<u8>> {
        let token = generate_initiator_token(&pair.confirm, &pair.rand, &self.identity)?;
        let bytes = token.encode()?;
        debug!("Initiator auth token: {}", hex::encode(&bytes));

        self.oob = Some(pair);
        self.pending_token = Some(token);
        Ok(bytes)
    }

    fn verify_responder(&self, bytes: &[u8]) -> Result<()> {
        let confirm = self
            .oob
            .map(|pair| pair.confirm)
            .ok_or(FormatError::MissingElement(AdType::LescConfirmationValue as u8))?;

        let token = ResponderAuthToken::decode(bytes)?;
        if token.key_id != self.responder_key.key_id() {
            warn!(
                "Responder signed with key id {}, expected {}",
                token.key_id,
                self.responder_key.key_id()
            );
            return Err(Error::UnknownKey(token.key_id));
        }

        verify_token(&token, &confirm, self.responder_key.verifying_key())
    }

    fn transition(&mut self, next: HandshakeState) {
        info!("Handshake {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, error: Error) -> Vec<HandshakeAction> {
        warn!("Handshake failed in {:?}: {}", self.state, error);
        self.transition(HandshakeState::Failed);
        self.failure = Some(error);
        self.discard_attempt();
        vec![HandshakeAction::Close]
    }

    // OOB values are single use.
    fn discard_attempt(&mut self) {
        self.oob = None;
        self.pending_token = None;
    }
}

fn check_key_id(role: &str, key_id: u16, configured: u16) -> Result<()> {
    if key_id != configured {
        return Err(SignatureError::InvalidKey(format!(
            "{} key id {} does not match configured key id {}",
            role, key_id, configured
        ))
        .into());
    }
    Ok(())
}
