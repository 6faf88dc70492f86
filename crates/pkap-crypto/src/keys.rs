//! P-256 key material and key identifiers.

use std::collections::HashMap;
use std::fmt;

use p256::ecdsa::{SigningKey, VerifyingKey};
use pkap_core::error::SignatureError;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// Our long-term signing key together with the id peers know it by.
///
/// The private scalar is zeroized on drop.
#[derive(Clone)]
pub struct SigningIdentity {
    key_id: u16,
    signing_key: SigningKey,
}

impl SigningIdentity {
    /// Generate a new random identity.
    pub fn generate(key_id: u16) -> Self {
        Self {
            key_id,
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Create from a raw 32-byte big-endian private scalar.
    pub fn from_bytes(key_id: u16, secret: &[u8]) -> Result<Self, SignatureError> {
        let signing_key = SigningKey::from_slice(secret)
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid private key: {}", e)))?;
        Ok(Self {
            key_id,
            signing_key,
        })
    }

    /// Create from a hex-encoded private scalar.
    pub fn from_hex(key_id: u16, secret_hex: &str) -> Result<Self, SignatureError> {
        let secret = Zeroizing::new(
            hex::decode(secret_hex.trim())
                .map_err(|e| SignatureError::InvalidKey(format!("Invalid hex: {}", e)))?,
        );
        Self::from_bytes(key_id, &secret)
    }

    pub fn key_id(&self) -> u16 {
        self.key_id
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Public half, under the same key id.
    pub fn peer_key(&self) -> PeerKey {
        PeerKey {
            key_id: self.key_id,
            verifying_key: VerifyingKey::from(&self.signing_key),
        }
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// A peer's public key together with its key id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerKey {
    key_id: u16,
    verifying_key: VerifyingKey,
}

impl PeerKey {
    pub fn new(key_id: u16, verifying_key: VerifyingKey) -> Self {
        Self {
            key_id,
            verifying_key,
        }
    }

    /// Create from a SEC1-encoded point (compressed or uncompressed).
    pub fn from_sec1_bytes(key_id: u16, bytes: &[u8]) -> Result<Self, SignatureError> {
        let verifying_key = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid public key: {}", e)))?;
        Ok(Self::new(key_id, verifying_key))
    }

    /// Create from a hex-encoded SEC1 point.
    pub fn from_hex(key_id: u16, public_hex: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(public_hex.trim())
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid hex: {}", e)))?;
        Self::from_sec1_bytes(key_id, &bytes)
    }

    pub fn key_id(&self) -> u16 {
        self.key_id
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Uncompressed SEC1 encoding (65 bytes).
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.verifying_key
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }
}

/// Public keys of the peers we are prepared to authenticate, by key id.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    keys: HashMap<u16, PeerKey>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key, replacing any previous key with the same id.
    pub fn insert(&mut self, key: PeerKey) {
        self.keys.insert(key.key_id, key);
    }

    pub fn get(&self, key_id: u16) -> Option<&PeerKey> {
        self.keys.get(&key_id)
    }

    pub fn contains(&self, key_id: u16) -> bool {
        self.keys.contains_key(&key_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<PeerKey> for KeyRing {
    fn from_iter<I: IntoIterator<Item = PeerKey>>(iter: I) -> Self {
        let mut ring = Self::new();
        for key in iter {
            ring.insert(key);
        }
        ring
    }
}

/// Built-in test key pair used when no key material is configured.
///
/// Both roles share the same key; never use it outside of testing.
pub mod test_keys {
    pub const TEST_PRIVATE_KEY_HEX: &str =
        "ee96afba081636903c6e982ed04c5b0c0912ded844799cbe582f2b1a0f16e773";

    pub const TEST_PUBLIC_KEY_HEX: &str = "048122ebe1f12ee4de8dcad96727e99b3826fe854fef5b0524429056ca68d1a1c6f231306891b6a64293bccc310702f2de45e5a3dbbc3a580a148523595794359c";

    pub const TEST_KEY_ID: u16 = 1;
}

#[cfg(test)]
mod tests {
    use super::test_keys::*;
    use super::*;

    mod signing_identity {
        use super::*;

        #[test]
        fn test_key_matches_public_half() {
            let identity = SigningIdentity::from_hex(TEST_KEY_ID, TEST_PRIVATE_KEY_HEX).unwrap();
            let peer = PeerKey::from_hex(TEST_KEY_ID, TEST_PUBLIC_KEY_HEX).unwrap();
            assert_eq!(identity.peer_key(), peer);
            assert_eq!(hex::encode(peer.to_sec1_bytes()), TEST_PUBLIC_KEY_HEX);
        }

        #[test]
        fn rejects_short_secret() {
            let err = SigningIdentity::from_bytes(1, &[0x42; 31]).unwrap_err();
            assert!(matches!(err, SignatureError::InvalidKey(_)));
        }

        #[test]
        fn rejects_zero_secret() {
            assert!(SigningIdentity::from_bytes(1, &[0u8; 32]).is_err());
        }

        #[test]
        fn rejects_bad_hex() {
            assert!(SigningIdentity::from_hex(1, "zz").is_err());
        }

        #[test]
        fn debug_hides_secret() {
            let identity = SigningIdentity::from_hex(1, TEST_PRIVATE_KEY_HEX).unwrap();
            let debug = format!("{:?}", identity);
            assert!(debug.contains("key_id"));
            assert!(!debug.contains("ee96af"));
        }

        #[test]
        fn generated_identities_differ() {
            let a = SigningIdentity::generate(1);
            let b = SigningIdentity::generate(1);
            assert_ne!(a.peer_key(), b.peer_key());
        }
    }

    mod peer_key {
        use super::*;

        #[test]
        fn accepts_compressed_point() {
            let identity = SigningIdentity::generate(3);
            let compressed = identity
                .signing_key()
                .verifying_key()
                .to_encoded_point(true);
            let peer = PeerKey::from_sec1_bytes(3, compressed.as_bytes()).unwrap();
            assert_eq!(peer, identity.peer_key());
        }

        #[test]
        fn rejects_invalid_point() {
            let err = PeerKey::from_sec1_bytes(1, &[0x04; 65]).unwrap_err();
            assert!(matches!(err, SignatureError::InvalidKey(_)));
        }
    }

    mod key_ring {
        use super::*;

        #[test]
        fn lookup_by_key_id() {
            let a = SigningIdentity::generate(1).peer_key();
            let b = SigningIdentity::generate(2).peer_key();
            let ring: KeyRing = vec![a.clone(), b.clone()].into_iter().collect();

            assert_eq!(ring.len(), 2);
            assert_eq!(ring.get(1), Some(&a));
            assert_eq!(ring.get(2), Some(&b));
            assert!(ring.get(3).is_none());
        }

        #[test]
        fn insert_replaces_same_id() {
            let mut ring = KeyRing::new();
            ring.insert(SigningIdentity::generate(5).peer_key());
            let replacement = SigningIdentity::generate(5).peer_key();
            ring.insert(replacement.clone());
            assert_eq!(ring.len(), 1);
            assert_eq!(ring.get(5), Some(&replacement));
        }
    }
}
