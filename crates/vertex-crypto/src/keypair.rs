//! secp256k1 keypair for signing and verification.

use crate::{IdentityError, PublicKey, Result, Signature};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// A secp256k1 keypair for ECDSA signing and verification.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a new random keypair.
    #[must_use]
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self { signing_key }
    }

    /// Creates a keypair from a secret key (32 bytes).
    ///
    /// # Errors
    ///
    /// Returns an error if the secret key is invalid or out of range
    /// for the secp256k1 scalar field.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(IdentityError::InvalidSecretKey);
        }

        let secret = Zeroizing::new(bytes.to_vec());
        let signing_key =
            SigningKey::from_slice(&secret).map_err(|_| IdentityError::InvalidSecretKey)?;
        Ok(Self { signing_key })
    }

    /// Returns the public key for this keypair.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(*self.signing_key.verifying_key())
    }

    /// Signs a 32-byte digest, producing a deterministic (RFC-6979)
    /// signature.
    ///
    /// The caller is responsible for passing `H(canonical(value))`,
    /// never a raw value or its hex encoding — signing the same
    /// digest twice with the same key must yield byte-identical
    /// signatures.
    ///
    /// # Panics
    ///
    /// Panics only on an internal scalar-encoding failure, which does
    /// not occur for a validly constructed `Keypair`.
    #[must_use]
    pub fn sign_prehash(&self, digest: &[u8; 32]) -> Signature {
        let sig: k256::ecdsa::Signature = self
            .signing_key
            .sign_prehash(digest)
            .expect("secp256k1 prehash signing does not fail for a valid key");
        Signature::from_slice(&sig.to_bytes())
    }

    /// Verifies a signature against a 32-byte digest using this
    /// keypair's public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature does not verify.
    pub fn verify_prehash(&self, digest: &[u8; 32], signature: &Signature) -> Result<()> {
        self.public_key().verify_prehash(digest, signature)
    }

    /// Returns the secret key bytes.
    ///
    /// # Security
    ///
    /// Handle with care. The returned bytes should be zeroized after use.
    #[must_use]
    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.signing_key.to_bytes().to_vec())
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self {
            signing_key: self.signing_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sha2::{Digest, Sha256};

    fn digest(msg: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(msg);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }

    #[test]
    fn keypair_generate() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::generate();
        assert_ne!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn keypair_sign_verify() {
        let kp = Keypair::generate();
        let d = digest(b"Hello, vertex!");

        let signature = kp.sign_prehash(&d);
        assert!(kp.verify_prehash(&d, &signature).is_ok());
    }

    #[test]
    fn keypair_wrong_message() {
        let kp = Keypair::generate();
        let signature = kp.sign_prehash(&digest(b"message 1"));
        assert!(kp.verify_prehash(&digest(b"message 2"), &signature).is_err());
    }

    #[test]
    fn keypair_from_secret_bytes() {
        let kp1 = Keypair::generate();
        let secret = kp1.secret_bytes();

        let kp2 = Keypair::from_secret_bytes(&secret).unwrap();
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn signing_is_deterministic() {
        let kp = Keypair::generate();
        let d = digest(b"same message twice");

        let sig1 = kp.sign_prehash(&d);
        let sig2 = kp.sign_prehash(&d);
        assert_eq!(sig1, sig2);
    }
}
