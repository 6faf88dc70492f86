//! BLE-PKAP authentication tokens.
//!
//! Fixed big-endian layouts:
//!
//! | Field  | Initiator | Responder |
//! |--------|-----------|-----------|
//! | format | 1         | 1         |
//! | keyId  | 2         | 2         |
//! | sig.r  | 32        | 32        |
//! | sig.s  | 32        | 32        |
//! | rand   | 16        | -         |
//! | total  | 83        | 67        |

use crate::error::FormatError;

/// The only token format currently defined.
pub const FORMAT_V1: u8 = 1;

/// Length of an LE Secure Connections OOB confirmation value.
pub const CONFIRM_LEN: usize = 16;

/// Length of an LE Secure Connections OOB random value.
pub const RANDOM_LEN: usize = 16;

/// Length of each ECDSA signature component.
pub const SIG_COMPONENT_LEN: usize = 32;

const HEADER_LEN: usize = 3;
const SIG_LEN: usize = 2 * SIG_COMPONENT_LEN;

/// Encoded length of an initiator token.
pub const INITIATOR_TOKEN_LEN: usize = HEADER_LEN + SIG_LEN + RANDOM_LEN;

/// Encoded length of a responder token.
pub const RESPONDER_TOKEN_LEN: usize = HEADER_LEN + SIG_LEN;

/// ECDSA signature as the pair (r, s) of unsigned 256-bit integers.
///
/// Both components are held as 32-byte big-endian values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureValue {
    pub r: [u8; SIG_COMPONENT_LEN],
    pub s: [u8; SIG_COMPONENT_LEN],
}

impl SignatureValue {
    pub fn new(r: [u8; SIG_COMPONENT_LEN], s: [u8; SIG_COMPONENT_LEN]) -> Self {
        Self { r, s }
    }

    /// Split a raw `r || s` signature.
    pub fn from_bytes(bytes: &[u8; SIG_LEN]) -> Self {
        let mut r = [0u8; SIG_COMPONENT_LEN];
        let mut s = [0u8; SIG_COMPONENT_LEN];
        r.copy_from_slice(&bytes[..SIG_COMPONENT_LEN]);
        s.copy_from_slice(&bytes[SIG_COMPONENT_LEN..]);
        Self { r, s }
    }

    /// Raw `r || s` form.
    pub fn to_bytes(&self) -> [u8; SIG_LEN] {
        let mut out = [0u8; SIG_LEN];
        out[..SIG_COMPONENT_LEN].copy_from_slice(&self.r);
        out[SIG_COMPONENT_LEN..].copy_from_slice(&self.s);
        out
    }
}

/// Behaviour shared by both token kinds.
pub trait AuthToken: Sized {
    /// Exact encoded size.
    const ENCODED_LEN: usize;

    fn format(&self) -> u8;

    fn key_id(&self) -> u16;

    fn signature(&self) -> &SignatureValue;

    /// Serialize to the fixed wire layout.
    fn encode(&self) -> Result<Vec<u8>, FormatError>;

    /// Parse from the fixed wire layout.
    fn decode(buf: &[u8]) -> Result<Self, FormatError>;
}

/// Token written by the initiator before OOB pairing starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatorAuthToken {
    pub format: u8,
    pub key_id: u16,
    pub sig: SignatureValue,
    pub rand: [u8; RANDOM_LEN],
}

impl InitiatorAuthToken {
    /// Build a v1 token, validating the random value length.
    pub fn new(key_id: u16, sig: SignatureValue, rand: &[u8]) -> Result<Self, FormatError> {
        let rand: [u8; RANDOM_LEN] = rand
            .try_into()
            .map_err(|_| FormatError::InvalidRandomLength(rand.len()))?;
        Ok(Self {
            format: FORMAT_V1,
            key_id,
            sig,
            rand,
        })
    }
}

impl AuthToken for InitiatorAuthToken {
    const ENCODED_LEN: usize = INITIATOR_TOKEN_LEN;

    fn format(&self) -> u8 {
        self.format
    }

    fn key_id(&self) -> u16 {
        self.key_id
    }

    fn signature(&self) -> &SignatureValue {
        &self.sig
    }

    fn encode(&self) -> Result<Vec<u8>, FormatError> {
        let mut out = encode_header(self.format, self.key_id, &self.sig, Self::ENCODED_LEN)?;
        out.extend_from_slice(&self.rand);
        Ok(out)
    }

    fn decode(buf: &[u8]) -> Result<Self, FormatError> {
        let (format, key_id, sig) = decode_header(buf, Self::ENCODED_LEN)?;
        let mut rand = [0u8; RANDOM_LEN];
        rand.copy_from_slice(&buf[HEADER_LEN + SIG_LEN..]);
        Ok(Self {
            format,
            key_id,
            sig,
            rand,
        })
    }
}

/// Token published by the responder once pairing has succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponderAuthToken {
    pub format: u8,
    pub key_id: u16,
    pub sig: SignatureValue,
}

impl ResponderAuthToken {
    /// Build a v1 token.
    pub fn new(key_id: u16, sig: SignatureValue) -> Self {
        Self {
            format: FORMAT_V1,
            key_id,
            sig,
        }
    }
}

impl AuthToken for ResponderAuthToken {
    const ENCODED_LEN: usize = RESPONDER_TOKEN_LEN;

    fn format(&self) -> u8 {
        self.format
    }

    fn key_id(&self) -> u16 {
        self.key_id
    }

    fn signature(&self) -> &SignatureValue {
        &self.sig
    }

    fn encode(&self) -> Result<Vec<u8>, FormatError> {
        encode_header(self.format, self.key_id, &self.sig, Self::ENCODED_LEN)
    }

    fn decode(buf: &[u8]) -> Result<Self, FormatError> {
        let (format, key_id, sig) = decode_header(buf, Self::ENCODED_LEN)?;
        Ok(Self {
            format,
            key_id,
            sig,
        })
    }
}

fn encode_header(
    format: u8,
    key_id: u16,
    sig: &SignatureValue,
    capacity: usize,
) -> Result<Vec<u8>, FormatError> {
    if format != FORMAT_V1 {
        return Err(FormatError::UnsupportedVersion(format));
    }
    let mut out = Vec::with_capacity(capacity);
    out.push(format);
    out.extend_from_slice(&key_id.to_be_bytes());
    out.extend_from_slice(&sig.r);
    out.extend_from_slice(&sig.s);
    Ok(out)
}

// An empty buffer reports a length error; otherwise the version byte is
// checked before the length so a future format with a different size is
// reported as unsupported rather than truncated.
fn decode_header(
    buf: &[u8],
    expected_len: usize,
) -> Result<(u8, u16, SignatureValue), FormatError> {
    let format = *buf.first().ok_or(FormatError::InvalidLength {
        expected: expected_len,
        actual: 0,
    })?;
    if format != FORMAT_V1 {
        return Err(FormatError::UnsupportedVersion(format));
    }
    if buf.len() != expected_len {
        return Err(FormatError::InvalidLength {
            expected: expected_len,
            actual: buf.len(),
        });
    }

    let key_id = u16::from_be_bytes([buf[1], buf[2]]);
    let mut sig = [0u8; SIG_LEN];
    sig.copy_from_slice(&buf[HEADER_LEN..HEADER_LEN + SIG_LEN]);
    Ok((format, key_id, SignatureValue::from_bytes(&sig)))
}
