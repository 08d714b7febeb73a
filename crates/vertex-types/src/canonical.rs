//! Deterministic canonical serialization.
//!
//! Canonicalization is the single agreement primitive between nodes:
//! every state root, every transaction hash, and every signed digest
//! is computed over the canonical byte sequence produced here, never
//! over a language's default `Debug`/JSON output (whose map and field
//! ordering is not guaranteed to match across nodes or even across
//! runs).
//!
//! Rules, matched exactly by every impl in this crate:
//!
//! - struct fields are written in declaration order
//! - map-like collections are materialized as pairs sorted by the
//!   canonical bytes of their key before being written
//! - fixed-width integers are written big-endian
//! - variable-length byte sequences are length-prefixed (4-byte
//!   big-endian count) so concatenation never misparses a boundary

use crate::hash::Hash;
use crate::machine_id::MachineId;

/// A value that can be turned into a canonical byte sequence for
/// hashing or signing.
pub trait Canonicalize {
    /// Returns the canonical byte encoding of `self`.
    fn canonicalize(&self) -> Vec<u8>;

    /// Hashes the canonical encoding with SHA-256.
    ///
    /// This is the only place a `Hash` is ever derived from a value:
    /// implementations must never hash the hex string of a digest,
    /// only its raw canonical bytes.
    fn canonical_hash(&self) -> Hash {
        Hash::digest(&self.canonicalize())
    }
}

/// Appends a length-prefixed byte string to `out`.
pub fn push_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

/// Canonicalizes a map-like collection by sorting `(key, value)` pairs
/// on the key's canonical bytes and writing them as a length-prefixed
/// sequence of length-prefixed pairs.
pub fn canonicalize_map<K, V>(entries: impl Iterator<Item = (K, V)>) -> Vec<u8>
where
    K: Canonicalize,
    V: Canonicalize,
{
    let mut pairs: Vec<(Vec<u8>, Vec<u8>)> = entries
        .map(|(k, v)| (k.canonicalize(), v.canonicalize()))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = Vec::new();
    out.extend_from_slice(&(pairs.len() as u32).to_be_bytes());
    for (k, v) in pairs {
        push_bytes(&mut out, &k);
        push_bytes(&mut out, &v);
    }
    out
}

/// Canonicalizes an ordered sequence, preserving its order (unlike
/// [`canonicalize_map`], which sorts).
pub fn canonicalize_seq<T: Canonicalize>(items: &[T]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(items.len() as u32).to_be_bytes());
    for item in items {
        push_bytes(&mut out, &item.canonicalize());
    }
    out
}

impl Canonicalize for str {
    fn canonicalize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push_bytes(&mut out, self.as_bytes());
        out
    }
}

impl Canonicalize for String {
    fn canonicalize(&self) -> Vec<u8> {
        self.as_str().canonicalize()
    }
}

impl Canonicalize for bool {
    fn canonicalize(&self) -> Vec<u8> {
        vec![u8::from(*self)]
    }
}

impl Canonicalize for u8 {
    fn canonicalize(&self) -> Vec<u8> {
        vec![*self]
    }
}

impl Canonicalize for u32 {
    fn canonicalize(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }
}

impl Canonicalize for u64 {
    fn canonicalize(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }
}

impl Canonicalize for i64 {
    fn canonicalize(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }
}

impl Canonicalize for Hash {
    fn canonicalize(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl Canonicalize for MachineId {
    fn canonicalize(&self) -> Vec<u8> {
        self.as_str().canonicalize()
    }
}

impl<T: Canonicalize> Canonicalize for Vec<T> {
    fn canonicalize(&self) -> Vec<u8> {
        canonicalize_seq(self)
    }
}

impl<T: Canonicalize> Canonicalize for Option<T> {
    fn canonicalize(&self) -> Vec<u8> {
        match self {
            None => vec![0u8],
            Some(v) => {
                let mut out = vec![1u8];
                out.extend(v.canonicalize());
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn map_canonicalization_is_order_independent() {
        let mut a: BTreeMap<String, u64> = BTreeMap::new();
        a.insert("b".into(), 2);
        a.insert("a".into(), 1);

        let mut b: BTreeMap<String, u64> = BTreeMap::new();
        b.insert("a".into(), 1);
        b.insert("b".into(), 2);

        let canon_a = canonicalize_map(a.into_iter());
        let canon_b = canonicalize_map(b.into_iter());
        assert_eq!(canon_a, canon_b);
    }

    #[test]
    fn sequence_canonicalization_is_order_dependent() {
        let a = vec![1u64, 2u64];
        let b = vec![2u64, 1u64];
        assert_ne!(a.canonicalize(), b.canonicalize());
    }

    #[test]
    fn string_length_prefix_prevents_ambiguous_concatenation() {
        // "ab" + "c" must canonicalize differently from "a" + "bc".
        let seq1 = canonicalize_seq(&["ab".to_string(), "c".to_string()]);
        let seq2 = canonicalize_seq(&["a".to_string(), "bc".to_string()]);
        assert_ne!(seq1, seq2);
    }
}
