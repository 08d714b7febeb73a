//! Compressed secp256k1 public key for ECDSA verification.

use crate::{IdentityError, Result, Signature};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A compressed secp256k1 public key (33 bytes, 66 hex characters).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    key: VerifyingKey,
}

impl PublicKey {
    /// The length of a compressed public key in bytes.
    pub const LEN: usize = 33;

    /// Wraps a `k256` verifying key.
    pub(crate) fn from_verifying_key(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Creates a public key from compressed SEC1 bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not represent a valid
    /// compressed secp256k1 point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::LEN {
            return Err(IdentityError::InvalidPublicKey(format!(
                "expected {} bytes, got {}",
                Self::LEN,
                bytes.len()
            )));
        }

        let key = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| IdentityError::InvalidPublicKey(e.to_string()))?;

        Ok(Self { key })
    }

    /// Returns the compressed SEC1 encoding of this public key.
    #[must_use]
    pub fn as_bytes(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out.copy_from_slice(self.key.to_encoded_point(true).as_bytes());
        out
    }

    /// Returns a short identifier (first 8 bytes as hex).
    #[must_use]
    pub fn short_id(&self) -> String {
        hex::encode(&self.as_bytes()[..8])
    }

    /// Verifies a signature against a 32-byte digest.
    ///
    /// Verification never re-hashes `digest` — callers must pass
    /// `H(canonical(value))`, never the raw value or its hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature does not verify.
    pub fn verify_prehash(&self, digest: &[u8; 32], signature: &Signature) -> Result<()> {
        let sig = k256::ecdsa::Signature::from_slice(signature.as_bytes())
            .map_err(|_| IdentityError::InvalidSignature)?;
        self.key
            .verify_prehash(digest, &sig)
            .map_err(|_| IdentityError::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.short_id())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.as_bytes()))
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(self.as_bytes()))
        } else {
            serializer.serialize_bytes(&self.as_bytes())
        }
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
            PublicKey::from_bytes(&bytes).map_err(serde::de::Error::custom)
        } else {
            let bytes = Vec::<u8>::deserialize(deserializer)?;
            PublicKey::from_bytes(&bytes).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Keypair;

    #[test]
    fn public_key_short_id() {
        let kp = Keypair::generate();
        let pk = kp.public_key();
        let short = pk.short_id();
        assert_eq!(short.len(), 16); // 8 bytes = 16 hex chars
    }

    #[test]
    fn public_key_roundtrip() {
        let kp = Keypair::generate();
        let pk1 = kp.public_key();

        let bytes = pk1.as_bytes();
        let pk2 = PublicKey::from_bytes(&bytes).unwrap();

        assert_eq!(pk1, pk2);
    }

    #[test]
    fn public_key_serde_json_is_66_hex_chars() {
        let kp = Keypair::generate();
        let pk = kp.public_key();

        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json.len(), 68); // 66 hex chars + 2 quotes
        let pk2: PublicKey = serde_json::from_str(&json).unwrap();

        assert_eq!(pk, pk2);
    }
}
