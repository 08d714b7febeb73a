//! Stateless secp256k1 ECDSA signing and verification over 32-byte digests.

use crate::{Keypair, PublicKey, Result, Signature};

/// A stateless facade over secp256k1 ECDSA signing and verification.
///
/// Unlike [`crate::KeyStore`], `SignatureEngine` holds no secret
/// material of its own — it is the thin layer other crates call
/// through so that swapping the curve or signature scheme never
/// requires touching call sites outside this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignatureEngine;

impl SignatureEngine {
    /// Signs a 32-byte digest with `keypair`, deterministically (RFC-6979).
    #[must_use]
    pub fn sign(keypair: &Keypair, digest: &[u8; 32]) -> Signature {
        keypair.sign_prehash(digest)
    }

    /// Verifies `signature` over `digest` against `public_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature does not verify.
    pub fn verify(public_key: &PublicKey, digest: &[u8; 32], signature: &Signature) -> Result<()> {
        public_key.verify_prehash(digest, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify() {
        let kp = Keypair::generate();
        let digest = [3u8; 32];
        let sig = SignatureEngine::sign(&kp, &digest);
        assert!(SignatureEngine::verify(&kp.public_key(), &digest, &sig).is_ok());
    }
}
