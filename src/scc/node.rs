//! SCC node: certificate production on new blocks

use super::store::{Store, StoreError};
use super::{get_period, is_last_block_of_period};
use crate::cert::{BlockStatement, Certificate, CommitteeStatement};
use crate::committee::Committee;
use crate::crypto::Hash;
use crate::BlockNumber;
use std::sync::Arc;
use tracing::debug;

/// Per-node side of the certification chain.
///
/// Writes a pending (signature-less) block certificate for every block; on
/// the last block of a period it additionally stages the committee
/// certificate for the next period. Signing services attach signatures
/// through the store's update calls.
pub struct SccNode<S: Store> {
    chain_id: u64,
    store: Arc<S>,
}

impl<S: Store> SccNode<S> {
    /// Create a node for `chain_id` writing into `store`
    pub fn new(chain_id: u64, store: Arc<S>) -> Self {
        SccNode { chain_id, store }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Handle a freshly produced block.
    ///
    /// `current_committee` is the committee in charge when the block was
    /// produced; it becomes the subject of the next period's committee
    /// certificate on period boundaries.
    pub fn on_new_block(
        &self,
        number: BlockNumber,
        hash: Hash,
        state_root: Hash,
        current_committee: &Committee,
    ) -> Result<(), StoreError> {
        let statement = BlockStatement {
            chain_id: self.chain_id,
            number,
            hash,
            state_root,
        };
        self.store.add_block_certificate(Certificate::new(statement))?;
        debug!(number, "staged block certificate");

        if is_last_block_of_period(number) {
            let period = get_period(number) + 1;
            let statement = CommitteeStatement {
                chain_id: self.chain_id,
                period,
                committee: current_committee.clone(),
            };
            self.store
                .add_committee_certificate(Certificate::new(statement))?;
            debug!(period, "staged committee certificate");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::committee::Member;
    use crate::crypto::bls::BlsKeypair;
    use crate::scc::store::MemoryStore;

    fn committee() -> Committee {
        let kp = BlsKeypair::generate().unwrap();
        Committee::new(vec![Member::new(
            *kp.public_key(),
            *kp.proof_of_possession(),
            1,
        )])
    }

    #[test]
    fn test_every_block_gets_certificate() {
        let store = Arc::new(MemoryStore::new());
        let node = SccNode::new(250, store.clone());
        let c = committee();

        node.on_new_block(1, Hash::hash(b"1"), Hash::zero(), &c)
            .unwrap();
        node.on_new_block(2, Hash::hash(b"2"), Hash::zero(), &c)
            .unwrap();

        assert!(store.get_block_certificate(1).is_some());
        assert!(store.get_block_certificate(2).is_some());
        // Unsigned until a signer attaches signatures.
        assert!(store
            .get_block_certificate(1)
            .unwrap()
            .signature
            .signature()
            .is_none());
        // No period boundary crossed.
        assert!(store.latest_committee_certificate().is_none());
    }

    #[test]
    fn test_period_boundary_stages_next_committee() {
        let store = Arc::new(MemoryStore::new());
        let node = SccNode::new(250, store.clone());
        let c = committee();

        node.on_new_block(1023, Hash::hash(b"last"), Hash::zero(), &c)
            .unwrap();

        let cert = store.get_committee_certificate(1).unwrap();
        assert_eq!(cert.subject.period, 1);
        assert_eq!(cert.subject.committee, c);
    }
}
