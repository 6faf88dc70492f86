//! Runs an [`InitiatorHandshake`] against a transport.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use pkap_core::error::{Error, Result};
use pkap_crypto::{PeerKey, SigningIdentity};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::HandshakeConfig;
use crate::machine::{HandshakeAction, HandshakeEvent, InitiatorHandshake};
use crate::traits::{AuthTransport, OobSource, ReadInterrupt};

const EVENT_QUEUE_DEPTH: usize = 16;

/// Event loop for one handshake.
///
/// Actions run one at a time. Each races the watchdog and the inbound
/// queue; whichever finishes first is fed to the machine.
pub struct HandshakeDriver<T, O> {
    machine: InitiatorHandshake,
    transport: T,
    oob_source: Option<O>,
    read_interrupt: Option<Box<dyn ReadInterrupt>>,
    watchdog: Option<Duration>,
    events_tx: mpsc::Sender<HandshakeEvent>,
    events_rx: mpsc::Receiver<HandshakeEvent>,
}

impl<T, O> HandshakeDriver<T, O>
where
    T: AuthTransport,
    O: OobSource + 'static,
{
    pub fn new(machine: InitiatorHandshake, transport: T, oob_source: O) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        Self {
            machine,
            transport,
            oob_source: Some(oob_source),
            read_interrupt: None,
            watchdog: None,
            events_tx,
            events_rx,
        }
    }

    /// Driver for a handshake described by `config`.
    ///
    /// The key ids of `identity` and `responder_key` must match the
    /// configured ones. The configured watchdog applies.
    pub fn from_config(
        identity: SigningIdentity,
        responder_key: PeerKey,
        transport: T,
        oob_source: O,
        config: &HandshakeConfig,
    ) -> Result<Self> {
        let machine = InitiatorHandshake::from_config(identity, responder_key, config)?;
        Ok(Self::new(machine, transport, oob_source).with_watchdog(config.watchdog))
    }

    /// Bound the whole handshake.
    pub fn with_watchdog(mut self, timeout: Option<Duration>) -> Self {
        self.watchdog = timeout;
        self
    }

    /// Wake a blocked OOB read when the handshake abandons it.
    pub fn with_read_interrupt<I: ReadInterrupt + 'static>(mut self, interrupt: I) -> Self {
        self.read_interrupt = Some(Box::new(interrupt));
        self
    }

    /// Sender for events from outside the driver, such as disconnects.
    pub fn event_sender(&self) -> mpsc::Sender<HandshakeEvent> {
        self.events_tx.clone()
    }

    /// Run to a terminal state. The transport is closed on every outcome.
    pub async fn run(self) -> Result<()> {
        let Self {
            mut machine,
            mut transport,
            mut oob_source,
            read_interrupt,
            watchdog,
            // Held so the queue never reports closed.
            events_tx: _events_tx,
            mut events_rx,
        } = self;

        let watchdog_enabled = watchdog.is_some();
        let deadline = tokio::time::sleep(watchdog.unwrap_or(Duration::MAX));
        tokio::pin!(deadline);

        let mut pending: VecDeque<HandshakeAction> = machine.start().into();
        let mut closed = false;

        while let Some(action) = pending.pop_front() {
            if action == HandshakeAction::Close {
                close(&mut transport).await;
                closed = true;
                continue;
            }

            let reading_oob = action == HandshakeAction::ReadOobData;
            let (event, completed) = tokio::select! {
                _ = &mut deadline, if watchdog_enabled => (HandshakeEvent::WatchdogExpired, false),
                Some(event) = events_rx.recv() => (event, false),
                event = perform(action, &mut transport, &mut oob_source) => (event, true),
            };
            if reading_oob && !completed {
                interrupt_read(read_interrupt.as_deref());
            }

            debug!("Handshake event {}", event.name());
            pending.extend(machine.handle(event));
        }

        if !closed {
            close(&mut transport).await;
        }
        info!("Handshake finished: {:?}", machine.state());
        machine.into_result()
    }
}

async fn perform<T, O>(
    action: HandshakeAction,
    transport: &mut T,
    oob_source: &mut Option<O>,
) -> HandshakeEvent
where
    T: AuthTransport,
    O: OobSource + 'static,
{
    match action {
        HandshakeAction::Connect => {
            let resolved = match transport.connect().await {
                Ok(resolved) => resolved,
                Err(e) => return HandshakeEvent::TransportFailed(e),
            };
            if !resolved {
                debug!("Waiting for services to resolve");
                if let Err(e) = transport.wait_services_resolved().await {
                    return HandshakeEvent::TransportFailed(e);
                }
            }
            HandshakeEvent::ServicesResolved
        }
        HandshakeAction::ReadOobData => {
            HandshakeEvent::OobDataRead(read_oob_pair(oob_source).await)
        }
        HandshakeAction::WriteAuthToken(bytes) => {
            HandshakeEvent::TokenWritten(transport.write_auth(&bytes).await)
        }
        HandshakeAction::Pair => HandshakeEvent::PairingCompleted(transport.pair().await),
        HandshakeAction::ReadAuthToken => {
            HandshakeEvent::ResponderTokenRead(transport.read_auth().await)
        }
        HandshakeAction::Close => unreachable!("Close is handled by the event loop"),
    }
}

// Management reads block, so run them off the event loop.
async fn read_oob_pair<O: OobSource + 'static>(
    oob_source: &mut Option<O>,
) -> Result<pkap_mgmt::OobPair> {
    let mut source = oob_source.take().ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::Other,
            "OOB source already in use",
        ))
    })?;

    let (source, result) = tokio::task::spawn_blocking(move || {
        let result = source.read_oob_pair();
        (source, result)
    })
    .await
    .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e)))?;

    *oob_source = Some(source);
    result
}

fn interrupt_read(interrupt: Option<&dyn ReadInterrupt>) {
    let Some(interrupt) = interrupt else {
        return;
    };
    debug!("Interrupting abandoned OOB read");
    if let Err(e) = interrupt.interrupt() {
        warn!("Failed to interrupt OOB read: {}", e);
    }
}

async fn close<T: AuthTransport>(transport: &mut T) {
    if let Err(e) = transport.close().await {
        warn!("Failed to close transport: {}", e);
    }
}
