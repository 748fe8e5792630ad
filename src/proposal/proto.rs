//! Protobuf wire format for the v3 event payload
//!
//! ```text
//! Payload  { version = 1, last_seen_proposal_turn,
//!            last_seen_proposed_block, last_seen_proposal_frame,
//!            proposal? }
//! Proposal { number, parent_hash(32), timestamp, prev_randao(32),
//!            transactions { encoded }[] }
//! ```
//!
//! Transactions stay opaque raw bytes; they are the EVM client's canonical
//! encoding.

use super::proposal::{Proposal, RawTransaction};
use super::sync_state::ProposalSyncState;
use crate::crypto::Hash;
use prost::Message;

/// Payload wire version emitted by this node
pub const PAYLOAD_VERSION: u32 = 1;

/// Payload codec errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum PayloadCodecError {
    #[error("unsupported payload version {0}")]
    UnsupportedVersion(u32),

    #[error("invalid payload encoding: {0}")]
    InvalidEncoding(String),
}

/// Wire form of one opaque transaction
#[derive(Clone, PartialEq, Message)]
pub struct PbTransaction {
    /// Canonical EVM transaction encoding
    #[prost(bytes = "vec", tag = "1")]
    pub encoded: Vec<u8>,
}

/// Wire form of a proposal
#[derive(Clone, PartialEq, Message)]
pub struct PbProposal {
    /// Proposed block number
    #[prost(uint64, tag = "1")]
    pub number: u64,
    /// 32-byte parent block hash
    #[prost(bytes = "vec", tag = "2")]
    pub parent_hash: Vec<u8>,
    /// Proposed block timestamp in nanoseconds
    #[prost(uint64, tag = "3")]
    pub timestamp: u64,
    /// 32-byte prev-randao seed
    #[prost(bytes = "vec", tag = "4")]
    pub prev_randao: Vec<u8>,
    /// Transactions in order
    #[prost(message, repeated, tag = "5")]
    pub transactions: Vec<PbTransaction>,
}

/// Wire form of the v3 payload
#[derive(Clone, PartialEq, Message)]
pub struct PbPayload {
    /// Payload version; must be 1
    #[prost(uint32, tag = "1")]
    pub version: u32,
    /// Sync state: highest seen proposal turn
    #[prost(uint32, tag = "2")]
    pub last_seen_proposal_turn: u32,
    /// Sync state: highest seen proposed block
    #[prost(uint64, tag = "3")]
    pub last_seen_proposed_block: u64,
    /// Sync state: frame of the highest seen proposal
    #[prost(uint32, tag = "4")]
    pub last_seen_proposal_frame: u32,
    /// The proposal, if this event makes one
    #[prost(message, optional, tag = "5")]
    pub proposal: Option<PbProposal>,
}

fn hash_from_wire(bytes: &[u8], field: &str) -> Result<Hash, PayloadCodecError> {
    if bytes.len() != 32 {
        return Err(PayloadCodecError::InvalidEncoding(format!(
            "{field} must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(bytes);
    Ok(Hash(arr))
}

/// Encode a sync state and optional proposal as v3 payload bytes
pub fn encode_payload(sync_state: &ProposalSyncState, proposal: Option<&Proposal>) -> Vec<u8> {
    let pb = PbPayload {
        version: PAYLOAD_VERSION,
        last_seen_proposal_turn: sync_state.last_seen_proposal_turn,
        last_seen_proposed_block: sync_state.last_seen_proposed_block,
        last_seen_proposal_frame: sync_state.last_seen_proposal_frame,
        proposal: proposal.map(|p| PbProposal {
            number: p.number,
            parent_hash: p.parent_hash.as_bytes().to_vec(),
            timestamp: p.timestamp,
            prev_randao: p.prev_randao.as_bytes().to_vec(),
            transactions: p
                .transactions
                .iter()
                .map(|tx| PbTransaction {
                    encoded: tx.0.to_vec(),
                })
                .collect(),
        }),
    };
    pb.encode_to_vec()
}

/// Decode v3 payload bytes
pub fn decode_payload(
    bytes: &[u8],
) -> Result<(ProposalSyncState, Option<Proposal>), PayloadCodecError> {
    let pb = PbPayload::decode(bytes)
        .map_err(|e| PayloadCodecError::InvalidEncoding(e.to_string()))?;

    if pb.version != PAYLOAD_VERSION {
        return Err(PayloadCodecError::UnsupportedVersion(pb.version));
    }

    let sync_state = ProposalSyncState {
        last_seen_proposal_turn: pb.last_seen_proposal_turn,
        last_seen_proposal_frame: pb.last_seen_proposal_frame,
        last_seen_proposed_block: pb.last_seen_proposed_block,
    };

    let proposal = pb
        .proposal
        .map(|p| -> Result<Proposal, PayloadCodecError> {
            Ok(Proposal {
                number: p.number,
                parent_hash: hash_from_wire(&p.parent_hash, "parent hash")?,
                timestamp: p.timestamp,
                prev_randao: hash_from_wire(&p.prev_randao, "prev randao")?,
                transactions: p
                    .transactions
                    .into_iter()
                    .map(|tx| RawTransaction::new(tx.encoded))
                    .collect(),
            })
        })
        .transpose()?;

    Ok((sync_state, proposal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync_state() -> ProposalSyncState {
        ProposalSyncState {
            last_seen_proposal_turn: 3,
            last_seen_proposal_frame: 17,
            last_seen_proposed_block: 1024,
        }
    }

    fn proposal() -> Proposal {
        Proposal {
            number: 1025,
            parent_hash: Hash::hash(b"parent"),
            timestamp: 42,
            prev_randao: Hash::hash(b"randao"),
            transactions: vec![RawTransaction::new(vec![0xde, 0xad])],
        }
    }

    #[test]
    fn test_round_trip_with_proposal() {
        let p = proposal();
        let bytes = encode_payload(&sync_state(), Some(&p));
        let (state, restored) = decode_payload(&bytes).unwrap();
        assert_eq!(state, sync_state());
        assert_eq!(restored, Some(p));
    }

    #[test]
    fn test_round_trip_without_proposal() {
        let bytes = encode_payload(&sync_state(), None);
        let (state, restored) = decode_payload(&bytes).unwrap();
        assert_eq!(state, sync_state());
        assert_eq!(restored, None);
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut pb = PbPayload::decode(&encode_payload(&sync_state(), None)[..]).unwrap();
        pb.version = 2;
        let err = decode_payload(&pb.encode_to_vec()).unwrap_err();
        assert!(matches!(err, PayloadCodecError::UnsupportedVersion(2)));
    }

    #[test]
    fn test_bad_hash_length_rejected() {
        let pb = PbPayload {
            version: 1,
            last_seen_proposal_turn: 0,
            last_seen_proposed_block: 0,
            last_seen_proposal_frame: 0,
            proposal: Some(PbProposal {
                number: 1,
                parent_hash: vec![0u8; 16],
                timestamp: 0,
                prev_randao: vec![0u8; 32],
                transactions: vec![],
            }),
        };
        assert!(decode_payload(&pb.encode_to_vec()).is_err());
    }
}
