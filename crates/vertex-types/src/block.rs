//! Blocks: the unit of consensus at every level of the hierarchy.

use crate::canonical::{canonicalize_map, Canonicalize};
use crate::hash::Hash;
use crate::machine_id::MachineId;
use crate::message::Message;
use serde::{Deserialize, Serialize};

/// Header metadata committing to a block's effect.
///
/// `block_number` is strictly monotonic per chain; `parent_hash`
/// equals the digest of the previous block, or [`Hash::GENESIS`] for
/// the first block on a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Height of this block (0 = genesis).
    pub block_number: u64,
    /// Digest of the previous block's header.
    pub parent_hash: Hash,
    /// Machine id of the block's proposer.
    pub proposer: MachineId,
    /// Unix milliseconds at construction.
    pub timestamp: u64,
    /// Root committing to the ordered transaction list.
    pub transactions_root: Hash,
    /// Root committing to the state after applying all transactions.
    pub state_root: Hash,
}

impl Canonicalize for BlockHeader {
    fn canonicalize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(self.block_number.canonicalize());
        out.extend(self.parent_hash.canonicalize());
        out.extend(self.proposer.canonicalize());
        out.extend(self.timestamp.canonicalize());
        out.extend(self.transactions_root.canonicalize());
        out.extend(self.state_root.canonicalize());
        out
    }
}

impl BlockHeader {
    /// Returns the digest identifying this header (and therefore its block).
    #[must_use]
    pub fn id(&self) -> Hash {
        self.canonical_hash()
    }
}

/// A full block: header plus the ordered transactions it commits to,
/// plus any proposer/validator signatures collected over its digest.
///
/// `C` is the command payload carried by each transaction, which
/// differs per machine kind (`ServerCommand`, `EntityCommand`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block<C> {
    /// The block header.
    pub header: BlockHeader,
    /// Ordered transactions included in this block.
    pub transactions: Vec<Message<C>>,
    /// Signatures over the header digest, keyed by signer.
    pub signatures: Vec<(MachineId, String)>,
}

impl<C: Canonicalize> Block<C> {
    /// Computes the canonical root over an ordered transaction list.
    #[must_use]
    pub fn compute_transactions_root(transactions: &[Message<C>]) -> Hash {
        let mut out = Vec::new();
        out.extend_from_slice(&(transactions.len() as u32).to_be_bytes());
        for tx in transactions {
            let bytes = tx.payload.canonicalize();
            out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            out.extend_from_slice(&bytes);
        }
        Hash::digest(&out)
    }

    /// Returns the block id (the header's digest).
    #[must_use]
    pub fn id(&self) -> Hash {
        self.header.id()
    }

    /// Returns the block height.
    #[must_use]
    pub fn height(&self) -> u64 {
        self.header.block_number
    }

    /// Re-derives the transactions root and compares it against the header.
    #[must_use]
    pub fn verify_transactions_root(&self) -> bool {
        Self::compute_transactions_root(&self.transactions) == self.header.transactions_root
    }
}

impl<C> Canonicalize for Block<C>
where
    Message<C>: Canonicalize,
    C: Canonicalize,
{
    fn canonicalize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(self.header.canonicalize());
        for tx in &self.transactions {
            out.extend(tx.canonicalize());
        }
        out.extend(canonicalize_map(
            self.signatures.iter().map(|(k, v)| (k.clone(), v.clone())),
        ));
        out
    }
}

impl<C> Canonicalize for Message<C>
where
    C: Canonicalize,
{
    fn canonicalize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(self.id.canonicalize());
        out.extend(self.sender.canonicalize());
        out.extend(self.recipient.canonicalize());
        out.extend(self.timestamp.canonicalize());
        out.extend(self.payload.canonicalize());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    fn header(n: u64, parent: Hash) -> BlockHeader {
        BlockHeader {
            block_number: n,
            parent_hash: parent,
            proposer: MachineId::new("server-1"),
            timestamp: 1000,
            transactions_root: Hash::GENESIS,
            state_root: Hash::GENESIS,
        }
    }

    #[test]
    fn header_digest_changes_with_height() {
        let h1 = header(1, Hash::GENESIS);
        let h2 = header(2, Hash::GENESIS);
        assert_ne!(h1.id(), h2.id());
    }

    #[test]
    fn empty_block_has_zero_length_transactions_root() {
        let txs: Vec<Message<u64>> = vec![];
        let root = Block::compute_transactions_root(&txs);
        assert_eq!(root, Hash::digest(&0u32.to_be_bytes()));
    }

    #[test]
    fn transactions_root_is_order_sensitive() {
        let a = Message::new(
            MessageKind::Command,
            MachineId::new("s"),
            MachineId::new("s"),
            1u64,
            0,
        );
        let b = Message::new(
            MessageKind::Command,
            MachineId::new("s"),
            MachineId::new("s"),
            2u64,
            0,
        );
        let root1 = Block::compute_transactions_root(&[a.clone(), b.clone()]);
        let root2 = Block::compute_transactions_root(&[b, a]);
        assert_ne!(root1, root2);
    }
}
