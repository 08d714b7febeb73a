//! A transaction in the process of collecting signer approvals.

use crate::canonical::{canonicalize_map, Canonicalize};
use crate::hash::Hash;
use crate::message::Message;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A transaction paired with the partial signatures collected for it
/// so far, keyed by the signer's hex-encoded public key.
///
/// `SignerMachine::SIGN_TRANSACTION` inserts into `partial_signatures`;
/// `EntityMachine` validation sums the weight of signers whose entry
/// verifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransaction<C> {
    /// The underlying transaction.
    pub transaction: Message<C>,
    /// Hex-encoded `r||s` signatures, keyed by hex-encoded public key.
    pub partial_signatures: BTreeMap<String, String>,
}

impl<C> SignedTransaction<C> {
    /// Wraps a fresh, unsigned transaction.
    #[must_use]
    pub fn new(transaction: Message<C>) -> Self {
        Self {
            transaction,
            partial_signatures: BTreeMap::new(),
        }
    }
}

impl<C: Canonicalize> SignedTransaction<C> {
    /// The digest every partial signature is taken over:
    /// `H(canonical(transaction))`.
    #[must_use]
    pub fn digest(&self) -> Hash
    where
        Message<C>: Canonicalize,
    {
        self.transaction.canonical_hash()
    }
}

impl<C: Canonicalize> Canonicalize for SignedTransaction<C>
where
    Message<C>: Canonicalize,
{
    fn canonicalize(&self) -> Vec<u8> {
        let mut out = self.transaction.canonicalize();
        out.extend(canonicalize_map(
            self.partial_signatures
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        ));
        out
    }
}
