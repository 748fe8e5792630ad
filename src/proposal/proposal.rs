//! Block proposals travelling in event payloads

use crate::crypto::Hash;
use crate::{BlockNumber, Timestamp};
use alloy_primitives::{keccak256, Bytes, B256};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A transaction carried opaque inside a proposal.
///
/// The bytes are the EVM client's canonical transaction encoding; the node
/// core never decodes them, it only hashes and forwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction(pub Bytes);

impl RawTransaction {
    /// Create from raw encoded bytes
    pub fn new(encoded: impl Into<Bytes>) -> Self {
        RawTransaction(encoded.into())
    }

    /// Canonical transaction hash (keccak-256 of the encoding)
    pub fn hash(&self) -> B256 {
        keccak256(&self.0)
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the encoding is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A proposal for the contents of one block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Number of the proposed block
    pub number: BlockNumber,
    /// Hash of the parent block
    pub parent_hash: Hash,
    /// Proposed block timestamp in nanoseconds
    pub timestamp: Timestamp,
    /// Randomness seed for the block's prev-randao field
    pub prev_randao: Hash,
    /// Transactions to include, in order
    pub transactions: Vec<RawTransaction>,
}

impl Proposal {
    /// Deterministic proposal hash.
    ///
    /// SHA-256 over the big-endian concatenation
    /// `number ∥ parent_hash ∥ timestamp ∥ prev_randao ∥ tx[0].hash() ∥ …`.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.number.to_be_bytes());
        hasher.update(self.parent_hash.as_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        hasher.update(self.prev_randao.as_bytes());
        for tx in &self.transactions {
            hasher.update(tx.hash().as_slice());
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Hash(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> Proposal {
        Proposal {
            number: 7,
            parent_hash: Hash::hash(b"parent"),
            timestamp: 1_700_000_000_000_000_000,
            prev_randao: Hash::hash(b"randao"),
            transactions: vec![
                RawTransaction::new(vec![0xf8, 0x01, 0x02]),
                RawTransaction::new(vec![0xf8, 0x03, 0x04]),
            ],
        }
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(proposal().hash(), proposal().hash());
    }

    #[test]
    fn test_hash_covers_every_field() {
        let base = proposal();

        let mut p = base.clone();
        p.number += 1;
        assert_ne!(base.hash(), p.hash());

        let mut p = base.clone();
        p.timestamp += 1;
        assert_ne!(base.hash(), p.hash());

        let mut p = base.clone();
        p.prev_randao = Hash::hash(b"other randao");
        assert_ne!(base.hash(), p.hash());

        let mut p = base.clone();
        p.transactions.pop();
        assert_ne!(base.hash(), p.hash());

        let mut p = base.clone();
        p.transactions.reverse();
        assert_ne!(base.hash(), p.hash());
    }

    #[test]
    fn test_tx_hash_is_keccak_of_encoding() {
        let tx = RawTransaction::new(vec![1u8, 2, 3]);
        assert_eq!(tx.hash(), keccak256([1u8, 2, 3]));
    }
}
