//! Feeds arbitrary bytes through `PublicKey::from_bytes` and
//! `verify_prehash`. A hostile 33-byte blob must either be rejected as
//! an invalid point or, if accepted, never panic on a bogus signature.
#![no_main]

use libfuzzer_sys::fuzz_target;
use vertex_crypto::{PublicKey, Signature};

fuzz_target!(|data: &[u8]| {
    if data.len() < PublicKey::LEN + Signature::LEN + 32 {
        return;
    }
    let (key_bytes, rest) = data.split_at(PublicKey::LEN);
    let (sig_bytes, digest_bytes) = rest.split_at(Signature::LEN);

    let Ok(public_key) = PublicKey::from_bytes(key_bytes) else {
        return;
    };
    let signature = Signature::from_slice(sig_bytes);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&digest_bytes[..32]);

    let _ = public_key.verify_prehash(&digest, &signature);
});
