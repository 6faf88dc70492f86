//! ECDSA P-256 / SHA-256 signatures over OOB confirmation values.
//!
//! Each side signs the 16-byte LE Secure Connections confirmation value
//! it will use for OOB pairing. A peer that can verify the signature
//! knows the pairing is bound to the holder of the signing key.

use p256::ecdsa::signature::{RandomizedSigner, Verifier};
use p256::ecdsa::{Signature, VerifyingKey};
use pkap_core::error::{FormatError, Result, SignatureError};
use pkap_core::token::{
    AuthToken, InitiatorAuthToken, ResponderAuthToken, SignatureValue, CONFIRM_LEN, FORMAT_V1,
    RANDOM_LEN,
};
use rand::rngs::OsRng;

use crate::keys::SigningIdentity;

fn check_confirm(confirm: &[u8]) -> Result<()> {
    if confirm.len() != CONFIRM_LEN {
        return Err(FormatError::InvalidConfirmLength(confirm.len()).into());
    }
    Ok(())
}

/// Sign a confirmation value.
///
/// Signatures are randomized, so two calls over the same input will
/// normally differ; both verify.
pub fn sign_confirm(confirm: &[u8], identity: &SigningIdentity) -> Result<SignatureValue> {
    check_confirm(confirm)?;

    let signature: Signature = identity.signing_key().sign_with_rng(&mut OsRng, confirm);
    let bytes = signature.to_bytes();
    let mut raw = [0u8; 64];
    raw.copy_from_slice(&bytes);
    Ok(SignatureValue::from_bytes(&raw))
}

/// Verify a signature over a confirmation value.
pub fn verify_confirm(sig: &SignatureValue, confirm: &[u8], key: &VerifyingKey) -> Result<()> {
    check_confirm(confirm)?;

    let signature =
        Signature::from_slice(&sig.to_bytes()).map_err(|_| SignatureError::MalformedSignature)?;
    key.verify(confirm, &signature)
        .map_err(|_| SignatureError::VerificationFailed)?;
    Ok(())
}

/// Produce the initiator's token for its OOB (confirm, rand) pair.
pub fn generate_initiator_token(
    confirm: &[u8],
    rand: &[u8],
    identity: &SigningIdentity,
) -> Result<InitiatorAuthToken> {
    check_confirm(confirm)?;
    if rand.len() != RANDOM_LEN {
        return Err(FormatError::InvalidRandomLength(rand.len()).into());
    }

    let sig = sign_confirm(confirm, identity)?;
    Ok(InitiatorAuthToken::new(identity.key_id(), sig, rand)?)
}

/// Produce the responder's token for its OOB confirmation value.
pub fn generate_responder_token(
    confirm: &[u8],
    identity: &SigningIdentity,
) -> Result<ResponderAuthToken> {
    let sig = sign_confirm(confirm, identity)?;
    Ok(ResponderAuthToken::new(identity.key_id(), sig))
}

/// Check a token's signature against a confirmation value.
///
/// Key id selection is the caller's job; this only checks the format
/// and the signature itself.
pub fn verify_token<T: AuthToken>(token: &T, confirm: &[u8], key: &VerifyingKey) -> Result<()> {
    if token.format() != FORMAT_V1 {
        return Err(FormatError::UnsupportedVersion(token.format()).into());
    }
    verify_confirm(token.signature(), confirm, key)
}
