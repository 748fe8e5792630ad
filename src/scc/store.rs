//! Certificate store
//!
//! The node writes freshly created (signature-less) certificates here;
//! external signing services attach signatures afterwards through the
//! idempotent update calls. Certificates are immutable once read out.

use crate::cert::{BlockCertificate, CommitteeCertificate};
use crate::BlockNumber;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Store errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("block certificate {0} already exists")]
    BlockCertificateExists(BlockNumber),

    #[error("committee certificate for period {0} already exists")]
    CommitteeCertificateExists(u64),

    #[error("no certificate to update for {0}")]
    NotFound(String),
}

/// Certificate persistence interface of the SCC node
pub trait Store: Send + Sync {
    /// Insert a new block certificate; fails if one exists for the number
    fn add_block_certificate(&self, cert: BlockCertificate) -> Result<(), StoreError>;

    /// Overwrite an existing block certificate (signature updates);
    /// idempotent for identical input
    fn update_block_certificate(&self, cert: BlockCertificate) -> Result<(), StoreError>;

    /// Fetch a block certificate by number
    fn get_block_certificate(&self, number: BlockNumber) -> Option<BlockCertificate>;

    /// Block certificates from `first`, ascending, at most `max`
    fn get_block_certificates_from(&self, first: BlockNumber, max: usize)
        -> Vec<BlockCertificate>;

    /// The highest-numbered block certificate
    fn latest_block_certificate(&self) -> Option<BlockCertificate>;

    /// Insert a new committee certificate; fails if one exists for the
    /// period
    fn add_committee_certificate(&self, cert: CommitteeCertificate) -> Result<(), StoreError>;

    /// Overwrite an existing committee certificate; idempotent
    fn update_committee_certificate(&self, cert: CommitteeCertificate) -> Result<(), StoreError>;

    /// Fetch a committee certificate by period
    fn get_committee_certificate(&self, period: u64) -> Option<CommitteeCertificate>;

    /// Committee certificates from `first`, ascending, at most `max`
    fn get_committee_certificates_from(&self, first: u64, max: usize)
        -> Vec<CommitteeCertificate>;

    /// The highest-period committee certificate
    fn latest_committee_certificate(&self) -> Option<CommitteeCertificate>;
}

/// In-memory store backed by ordered maps
#[derive(Default)]
pub struct MemoryStore {
    blocks: RwLock<BTreeMap<BlockNumber, BlockCertificate>>,
    committees: RwLock<BTreeMap<u64, CommitteeCertificate>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn add_block_certificate(&self, cert: BlockCertificate) -> Result<(), StoreError> {
        let mut blocks = self.blocks.write();
        let number = cert.subject.number;
        if blocks.contains_key(&number) {
            return Err(StoreError::BlockCertificateExists(number));
        }
        blocks.insert(number, cert);
        Ok(())
    }

    fn update_block_certificate(&self, cert: BlockCertificate) -> Result<(), StoreError> {
        let mut blocks = self.blocks.write();
        let number = cert.subject.number;
        if !blocks.contains_key(&number) {
            return Err(StoreError::NotFound(format!("block {number}")));
        }
        blocks.insert(number, cert);
        Ok(())
    }

    fn get_block_certificate(&self, number: BlockNumber) -> Option<BlockCertificate> {
        self.blocks.read().get(&number).cloned()
    }

    fn get_block_certificates_from(
        &self,
        first: BlockNumber,
        max: usize,
    ) -> Vec<BlockCertificate> {
        self.blocks
            .read()
            .range(first..)
            .take(max)
            .map(|(_, c)| c.clone())
            .collect()
    }

    fn latest_block_certificate(&self) -> Option<BlockCertificate> {
        self.blocks.read().values().next_back().cloned()
    }

    fn add_committee_certificate(&self, cert: CommitteeCertificate) -> Result<(), StoreError> {
        let mut committees = self.committees.write();
        let period = cert.subject.period;
        if committees.contains_key(&period) {
            return Err(StoreError::CommitteeCertificateExists(period));
        }
        committees.insert(period, cert);
        Ok(())
    }

    fn update_committee_certificate(&self, cert: CommitteeCertificate) -> Result<(), StoreError> {
        let mut committees = self.committees.write();
        let period = cert.subject.period;
        if !committees.contains_key(&period) {
            return Err(StoreError::NotFound(format!("period {period}")));
        }
        committees.insert(period, cert);
        Ok(())
    }

    fn get_committee_certificate(&self, period: u64) -> Option<CommitteeCertificate> {
        self.committees.read().get(&period).cloned()
    }

    fn get_committee_certificates_from(
        &self,
        first: u64,
        max: usize,
    ) -> Vec<CommitteeCertificate> {
        self.committees
            .read()
            .range(first..)
            .take(max)
            .map(|(_, c)| c.clone())
            .collect()
    }

    fn latest_committee_certificate(&self) -> Option<CommitteeCertificate> {
        self.committees.read().values().next_back().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::{BlockStatement, Certificate};
    use crate::crypto::Hash;

    fn block_cert(number: BlockNumber) -> BlockCertificate {
        Certificate::new(BlockStatement {
            chain_id: 250,
            number,
            hash: Hash::hash(&number.to_be_bytes()),
            state_root: Hash::zero(),
        })
    }

    #[test]
    fn test_add_then_get() {
        let store = MemoryStore::new();
        store.add_block_certificate(block_cert(5)).unwrap();
        assert!(store.get_block_certificate(5).is_some());
        assert!(store.get_block_certificate(6).is_none());
    }

    #[test]
    fn test_add_duplicate_fails_update_succeeds() {
        let store = MemoryStore::new();
        store.add_block_certificate(block_cert(5)).unwrap();
        assert!(store.add_block_certificate(block_cert(5)).is_err());
        // Idempotent overwrite path.
        store.update_block_certificate(block_cert(5)).unwrap();
        store.update_block_certificate(block_cert(5)).unwrap();
    }

    #[test]
    fn test_update_missing_fails() {
        let store = MemoryStore::new();
        assert!(store.update_block_certificate(block_cert(5)).is_err());
    }

    #[test]
    fn test_range_and_latest() {
        let store = MemoryStore::new();
        for n in [1u64, 2, 3, 10] {
            store.add_block_certificate(block_cert(n)).unwrap();
        }
        let range = store.get_block_certificates_from(2, 2);
        assert_eq!(range.len(), 2);
        assert_eq!(range[0].subject.number, 2);
        assert_eq!(range[1].subject.number, 3);

        assert_eq!(store.latest_block_certificate().unwrap().subject.number, 10);
    }
}
