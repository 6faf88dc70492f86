//! End-to-end initiator handshakes against a scripted management socket
//! and in-memory responders.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pkap_core::error::{Error, Result, TransportError};
use pkap_core::token::{AuthToken, InitiatorAuthToken};
use pkap_crypto::keys::test_keys::*;
use pkap_crypto::{
    generate_responder_token, oob_confirm_value, verify_token, KeyRing, PeerKey,
    SigningIdentity,
};
use pkap_handshake::{
    AuthTransport, HandshakeDriver, InitiatorHandshake, ManagementOobSource,
    ResponderAuthenticator,
};
use pkap_mgmt::{AddressTypes, ManagementClient, OobPair};

const ZERO_CONFIRM: [u8; 16] = [0u8; 16];
const RAND: [u8; 16] = [0x01; 16];

/// Management socket that replays canned reads.
struct ScriptedSocket {
    reads: VecDeque<Vec<u8>>,
}

impl Read for ScriptedSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(mut next) = self.reads.pop_front() else {
            return Ok(0);
        };
        let n = next.len().min(buf.len());
        buf[..n].copy_from_slice(&next[..n]);
        if n < next.len() {
            self.reads.push_front(next.split_off(n));
        }
        Ok(n)
    }
}

impl Write for ScriptedSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn event(code: u16, params: &[u8]) -> Vec<u8> {
    let mut frame = code.to_le_bytes().to_vec();
    frame.extend_from_slice(&0u16.to_le_bytes());
    frame.extend_from_slice(&(params.len() as u16).to_le_bytes());
    frame.extend_from_slice(params);
    frame
}

fn oob_complete(status: u8, confirm: [u8; 16], rand: [u8; 16]) -> Vec<u8> {
    let mut params = vec![0x3b, 0x00, status];
    if status == 0 {
        let mut eir = vec![0x02, 0x01, 0x06, 17, 0x22];
        eir.extend_from_slice(&confirm);
        eir.extend_from_slice(&[17, 0x23]);
        eir.extend_from_slice(&rand);

        params.push(0x06);
        params.extend_from_slice(&(eir.len() as u16).to_le_bytes());
        params.extend(eir);
    }
    event(0x0001, &params)
}

/// OOB source whose controller answers after an unrelated event, in
/// fragments.
fn oob_source(status: u8, confirm: [u8; 16], rand: [u8; 16]) -> ManagementOobSource<ScriptedSocket> {
    let mut bytes = event(0x0006, &[0x01, 0x00, 0x00, 0x00]);
    bytes.extend(oob_complete(status, confirm, rand));
    let reads = bytes.chunks(7).map(|c| c.to_vec()).collect();

    let client = ManagementClient::new(ScriptedSocket { reads });
    ManagementOobSource::new(client, 0, AddressTypes::LE)
}

fn test_identity(key_id: u16) -> SigningIdentity {
    SigningIdentity::from_hex(key_id, TEST_PRIVATE_KEY_HEX).unwrap()
}

fn initiator() -> InitiatorHandshake {
    let responder = PeerKey::from_hex(TEST_KEY_ID, TEST_PUBLIC_KEY_HEX).unwrap();
    InitiatorHandshake::new(test_identity(TEST_KEY_ID), responder)
}

/// Responder that already holds the initiator's confirm value.
struct SharedConfirmTransport {
    identity: SigningIdentity,
    confirm: [u8; 16],
    initiator_key: PeerKey,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl AuthTransport for SharedConfirmTransport {
    async fn connect(&mut self) -> Result<bool> {
        Ok(true)
    }

    async fn wait_services_resolved(&mut self) -> Result<()> {
        Ok(())
    }

    async fn write_auth(&mut self, value: &[u8]) -> Result<()> {
        let token = InitiatorAuthToken::decode(value)?;
        verify_token(&token, &self.confirm, self.initiator_key.verifying_key())
    }

    async fn pair(&mut self) -> Result<()> {
        Ok(())
    }

    async fn read_auth(&mut self) -> Result<Vec<u8>> {
        Ok(generate_responder_token(&self.confirm, &self.identity)?.encode()?)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Responder running [`ResponderAuthenticator`] behind simulated OOB pairing.
struct LoopbackTransport {
    authenticator: ResponderAuthenticator,
    initiator_pk_x: [u8; 32],
    initiator_oob: OobPair,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl AuthTransport for LoopbackTransport {
    async fn connect(&mut self) -> Result<bool> {
        Ok(false)
    }

    async fn wait_services_resolved(&mut self) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(())
    }

    async fn write_auth(&mut self, value: &[u8]) -> Result<()> {
        self.authenticator.on_token_written(value)
    }

    async fn pair(&mut self) -> Result<()> {
        let oob = self.authenticator.on_oob_request(&self.initiator_pk_x)?;
        if oob.peer_oob != self.initiator_oob {
            return Err(TransportError::PairingFailed("confirm mismatch".to_string()).into());
        }
        Ok(())
    }

    async fn read_auth(&mut self) -> Result<Vec<u8>> {
        self.authenticator
            .auth_value()
            .map(|v| v.to_vec())
            .ok_or_else(|| TransportError::ReadFailed("no value".to_string()).into())
    }

    async fn close(&mut self) -> Result<()> {
        self.authenticator.on_disconnect();
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn shared_confirm_transport(responder_key_id: u16) -> (SharedConfirmTransport, Arc<AtomicBool>) {
    let closed = Arc::new(AtomicBool::new(false));
    let transport = SharedConfirmTransport {
        identity: test_identity(responder_key_id),
        confirm: ZERO_CONFIRM,
        initiator_key: PeerKey::from_hex(TEST_KEY_ID, TEST_PUBLIC_KEY_HEX).unwrap(),
        closed: closed.clone(),
    };
    (transport, closed)
}

fn loopback_transport(known_initiators: KeyRing) -> (LoopbackTransport, OobPair, Arc<AtomicBool>) {
    let pk_x = [0x42; 32];
    let oob = OobPair::new(oob_confirm_value(&pk_x, &RAND), RAND);
    let closed = Arc::new(AtomicBool::new(false));
    let transport = LoopbackTransport {
        authenticator: ResponderAuthenticator::new(test_identity(TEST_KEY_ID), known_initiators),
        initiator_pk_x: pk_x,
        initiator_oob: oob,
        closed: closed.clone(),
    };
    (transport, oob, closed)
}

#[tokio::test]
async fn authenticates_with_test_keys() {
    let (transport, closed) = shared_confirm_transport(TEST_KEY_ID);
    let driver = HandshakeDriver::new(initiator(), transport, oob_source(0, ZERO_CONFIRM, RAND))
        .with_watchdog(Some(Duration::from_secs(5)));

    driver.run().await.unwrap();
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn authenticates_against_responder_authenticator() {
    let ring: KeyRing = std::iter::once(test_identity(TEST_KEY_ID).peer_key()).collect();
    let (transport, oob, closed) = loopback_transport(ring);
    let driver = HandshakeDriver::new(initiator(), transport, oob_source(0, oob.confirm, oob.rand))
        .with_watchdog(Some(Duration::from_secs(5)));

    driver.run().await.unwrap();
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn mismatched_responder_key_id_fails() {
    let (transport, closed) = shared_confirm_transport(2);
    let driver = HandshakeDriver::new(initiator(), transport, oob_source(0, ZERO_CONFIRM, RAND));

    let err = driver.run().await.unwrap_err();
    assert!(matches!(err, Error::UnknownKey(2)), "unexpected error: {:?}", err);
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn responder_rejects_unknown_initiator() {
    let (transport, oob, closed) = loopback_transport(KeyRing::new());
    let driver = HandshakeDriver::new(initiator(), transport, oob_source(0, oob.confirm, oob.rand));

    let err = driver.run().await.unwrap_err();
    assert!(matches!(err, Error::UnknownKey(k) if k == TEST_KEY_ID));
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn responder_rejects_confirm_from_other_key() {
    let ring: KeyRing = std::iter::once(test_identity(TEST_KEY_ID).peer_key()).collect();
    let (transport, _, closed) = loopback_transport(ring);
    // The controller's confirm does not belong to the key used in pairing.
    let driver = HandshakeDriver::new(initiator(), transport, oob_source(0, ZERO_CONFIRM, RAND));

    let err = driver.run().await.unwrap_err();
    assert!(matches!(err, Error::Signature(_)), "unexpected error: {:?}", err);
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn controller_not_powered_fails() {
    let (transport, closed) = shared_confirm_transport(TEST_KEY_ID);
    let driver = HandshakeDriver::new(initiator(), transport, oob_source(0x0f, ZERO_CONFIRM, RAND));

    match driver.run().await {
        Err(Error::Management(e)) => assert_eq!(e.code, 0x0f),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(closed.load(Ordering::SeqCst));
}
