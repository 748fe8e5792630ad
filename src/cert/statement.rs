//! Certified statements
//!
//! A statement is the subject of a certificate. Every statement kind
//! exposes a deterministic signing encoding so two equal statements always
//! produce bit-identical signatures, plus a domain separation tag so a
//! block signature can never be replayed as a committee signature.

use crate::committee::Committee;
use crate::crypto::bls::dst;
use crate::crypto::Hash;
use serde::{Deserialize, Serialize};

/// A certifiable statement
pub trait Statement: Clone {
    /// Deterministic byte sequence that signers sign
    fn data_to_sign(&self) -> Vec<u8>;

    /// BLS domain separation tag for this statement kind
    fn dst() -> &'static [u8];
}

/// Statement that a block with the given number, hash and state root is
/// part of the certified chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStatement {
    /// Chain this statement belongs to
    pub chain_id: u64,
    /// Block number
    pub number: u64,
    /// Block hash
    pub hash: Hash,
    /// State root after executing the block
    pub state_root: Hash,
}

impl Statement for BlockStatement {
    fn data_to_sign(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + 8 + 8 + 32 + 32);
        out.extend_from_slice(b"scc_bs__");
        out.extend_from_slice(&self.chain_id.to_be_bytes());
        out.extend_from_slice(&self.number.to_be_bytes());
        out.extend_from_slice(self.hash.as_bytes());
        out.extend_from_slice(self.state_root.as_bytes());
        out
    }

    fn dst() -> &'static [u8] {
        dst::BLOCK_STATEMENT
    }
}

/// Statement that `committee` is the committee of `period`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeStatement {
    /// Chain this statement belongs to
    pub chain_id: u64,
    /// Period the committee is authorised for
    pub period: u64,
    /// The committee itself
    pub committee: Committee,
}

impl Statement for CommitteeStatement {
    fn data_to_sign(&self) -> Vec<u8> {
        let members = self.committee.serialize();
        let mut out = Vec::with_capacity(8 + 8 + 8 + members.len());
        out.extend_from_slice(b"scc_cs__");
        out.extend_from_slice(&self.chain_id.to_be_bytes());
        out.extend_from_slice(&self.period.to_be_bytes());
        out.extend_from_slice(&members);
        out
    }

    fn dst() -> &'static [u8] {
        dst::COMMITTEE_STATEMENT
    }
}
