//! DAG event model
//!
//! Events are the vertices of the consensus DAG. Each validator emits a
//! chain of events linked by a self-parent plus references to other
//! validators' events; ordering metadata (epoch, sequence, frame, Lamport
//! time) travels on the event itself. Events are immutable once built:
//! construction goes through [`EventBuilder`], and the identity is the
//! first 24 bytes of the hash-to-sign.

use crate::crypto::bls::BlsSignature;
use crate::crypto::{EventId, Hash};
use crate::proposal::{Proposal, ProposalSyncState, RawTransaction};
use crate::validators::ValidatorId;
use crate::{BlockNumber, Epoch, Frame, Lamport, Seq, Timestamp};
use serde::{Deserialize, Serialize};

/// Maximum size of the free-form extra field
pub const MAX_EXTRA_BYTES: usize = 128;

/// Event validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("event fields are not initialized")]
    NotInited,

    #[error("event has no parents")]
    NoParents,

    #[error("event field exceeds its size bound")]
    HugeValue,

    #[error("wrong event lamport time")]
    WrongLamport,

    #[error("wrong self-parent")]
    WrongSelfParent,

    #[error("wrong event sequence number")]
    WrongSeq,

    #[error("duplicated parent")]
    DuplicateParents,

    #[error("payload hash does not match payload")]
    PayloadHashMismatch,

    #[error("resolved parents do not match parent ids")]
    ParentsMismatch,

    #[error("event is not relevant for the current epoch")]
    NotRelevant,

    #[error("event creator is not a known validator")]
    Auth,
}

/// Remaining gas power of the creator, tracked on two horizons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GasPowerLeft {
    /// Short-window allocation remainder
    pub short_term: u64,
    /// Long-window allocation remainder
    pub long_term: u64,
}

impl GasPowerLeft {
    /// The binding (smaller) of the two remainders
    pub fn min(&self) -> u64 {
        self.short_term.min(self.long_term)
    }
}

/// Votes for a run of blocks starting at `start`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockVotes {
    /// Epoch the votes belong to
    pub epoch: Epoch,
    /// First voted block number
    pub start: BlockNumber,
    /// One hash vote per consecutive block
    pub votes: Vec<Hash>,
}

/// Vote for the outcome of an epoch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochVote {
    /// Voted epoch
    pub epoch: Epoch,
    /// Hash of the voted epoch record
    pub vote: Hash,
}

/// Proof that a validator misbehaved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MisbehaviourProof {
    /// Two distinct events with the same creator and sequence number
    EventsDoublesign {
        /// The offending creator
        creator: ValidatorId,
        /// The pair of conflicting event ids
        events: [EventId; 2],
    },
    /// Two conflicting votes for the same block
    BlockVoteDoublesign {
        /// The offending creator
        creator: ValidatorId,
        /// The block voted on twice
        block: BlockNumber,
        /// The pair of conflicting vote hashes
        votes: [Hash; 2],
    },
}

/// Payload v3: sync state on every event, plus an optional proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadV3 {
    /// Proposal sync state merged from the creator's view
    pub sync_state: ProposalSyncState,
    /// Proposal carried by this event, if the creator holds the turn
    pub proposal: Option<Proposal>,
}

/// What an event carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Plain transactions
    Transactions(Vec<RawTransaction>),
    /// Misbehaviour proofs against other validators
    MisbehaviourProofs(Vec<MisbehaviourProof>),
    /// Votes over a range of blocks
    BlockVotes(BlockVotes),
    /// Vote over an epoch record
    EpochVote(EpochVote),
    /// Versioned payload carrying the proposal sync state
    V3(PayloadV3),
}

impl Payload {
    /// Empty v3 payload with a default sync state
    pub fn empty() -> Self {
        Payload::V3(PayloadV3 {
            sync_state: ProposalSyncState::default(),
            proposal: None,
        })
    }

    /// Deterministic payload hash
    pub fn hash(&self) -> Hash {
        let encoded = bincode::serialize(self).unwrap_or_default();
        Hash::hash(&encoded)
    }

    /// The proposal sync state, for v3 payloads
    pub fn sync_state(&self) -> Option<&ProposalSyncState> {
        match self {
            Payload::V3(v3) => Some(&v3.sync_state),
            _ => None,
        }
    }

    /// The carried proposal, if any
    pub fn proposal(&self) -> Option<&Proposal> {
        match self {
            Payload::V3(v3) => v3.proposal.as_ref(),
            _ => None,
        }
    }

    /// Transactions carried directly or inside a proposal
    pub fn transactions(&self) -> &[RawTransaction] {
        match self {
            Payload::Transactions(txs) => txs,
            Payload::V3(v3) => v3
                .proposal
                .as_ref()
                .map(|p| p.transactions.as_slice())
                .unwrap_or(&[]),
            _ => &[],
        }
    }
}

/// Mutable event under construction.
///
/// `build` freezes the fields, fills in the payload hash and derives the
/// event id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBuilder {
    /// Event format version
    pub version: u8,
    /// Network fork identifier
    pub net_fork_id: u16,
    /// Epoch the event belongs to
    pub epoch: Epoch,
    /// Sequence number within the creator's event chain, starting at 1
    pub seq: Seq,
    /// Consensus frame the creator observed
    pub frame: Frame,
    /// Creator validator id
    pub creator: ValidatorId,
    /// Lamport time: `max(parent lamports) + 1`
    pub lamport: Lamport,
    /// Wall-clock creation time in nanoseconds
    pub creation_time: Timestamp,
    /// Median of observed validator times
    pub median_time: Timestamp,
    /// Parent event ids; the self-parent, if any, comes first
    pub parents: Vec<EventId>,
    /// Hash of the previous epoch, only on the first event of an epoch
    pub prev_epoch_hash: Option<Hash>,
    /// Creator's remaining gas power
    pub gas_power_left: GasPowerLeft,
    /// Gas power consumed by this event
    pub gas_power_used: u64,
    /// Free-form extra bytes
    pub extra: Vec<u8>,
    /// Hash of the payload; recomputed by `build`
    pub payload_hash: Hash,
    /// The payload itself
    pub payload: Payload,
}

impl Default for EventBuilder {
    fn default() -> Self {
        EventBuilder {
            version: 3,
            net_fork_id: 0,
            epoch: 1,
            seq: 1,
            frame: 1,
            creator: ValidatorId(0),
            lamport: 1,
            creation_time: 0,
            median_time: 0,
            parents: Vec::new(),
            prev_epoch_hash: None,
            gas_power_left: GasPowerLeft::default(),
            gas_power_used: 0,
            extra: Vec::new(),
            payload_hash: Hash::zero(),
            payload: Payload::empty(),
        }
    }
}

impl EventBuilder {
    /// Freeze into an unsigned event, computing the payload hash and id
    pub fn build(mut self) -> Event {
        self.payload_hash = self.payload.hash();
        Event::from_builder(self, None)
    }

    /// Freeze into a signed event
    pub fn build_signed(mut self, signature: BlsSignature) -> Event {
        self.payload_hash = self.payload.hash();
        Event::from_builder(self, Some(signature))
    }
}

/// An immutable DAG event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    inner: EventBuilder,
    signature: Option<BlsSignature>,
    id: EventId,
}

impl Event {
    fn from_builder(inner: EventBuilder, signature: Option<BlsSignature>) -> Self {
        let id = EventId::from_hash(&Self::hash_builder(&inner));
        Event {
            inner,
            signature,
            id,
        }
    }

    fn hash_builder(inner: &EventBuilder) -> Hash {
        let encoded = bincode::serialize(inner).unwrap_or_default();
        Hash::hash(&encoded)
    }

    /// Event identity: first 24 bytes of the hash-to-sign
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Full 32-byte hash the creator signs
    pub fn hash_to_sign(&self) -> Hash {
        Self::hash_builder(&self.inner)
    }

    /// Creator's signature, if attached
    pub fn signature(&self) -> Option<&BlsSignature> {
        self.signature.as_ref()
    }

    /// Event format version
    pub fn version(&self) -> u8 {
        self.inner.version
    }

    /// Network fork identifier
    pub fn net_fork_id(&self) -> u16 {
        self.inner.net_fork_id
    }

    /// Epoch the event belongs to
    pub fn epoch(&self) -> Epoch {
        self.inner.epoch
    }

    /// Sequence number within the creator's chain
    pub fn seq(&self) -> Seq {
        self.inner.seq
    }

    /// Consensus frame
    pub fn frame(&self) -> Frame {
        self.inner.frame
    }

    /// Creator validator id
    pub fn creator(&self) -> ValidatorId {
        self.inner.creator
    }

    /// Lamport time
    pub fn lamport(&self) -> Lamport {
        self.inner.lamport
    }

    /// Creation time in nanoseconds
    pub fn creation_time(&self) -> Timestamp {
        self.inner.creation_time
    }

    /// Median observed time in nanoseconds
    pub fn median_time(&self) -> Timestamp {
        self.inner.median_time
    }

    /// Parent ids; the self-parent, if any, is first
    pub fn parents(&self) -> &[EventId] {
        &self.inner.parents
    }

    /// Self-parent id, present iff `seq > 1`
    pub fn self_parent(&self) -> Option<EventId> {
        if self.inner.seq > 1 {
            self.inner.parents.first().copied()
        } else {
            None
        }
    }

    /// Previous epoch hash, on epoch-first events
    pub fn prev_epoch_hash(&self) -> Option<&Hash> {
        self.inner.prev_epoch_hash.as_ref()
    }

    /// Remaining gas power of the creator
    pub fn gas_power_left(&self) -> GasPowerLeft {
        self.inner.gas_power_left
    }

    /// Gas power consumed by this event
    pub fn gas_power_used(&self) -> u64 {
        self.inner.gas_power_used
    }

    /// Free-form extra bytes
    pub fn extra(&self) -> &[u8] {
        &self.inner.extra
    }

    /// Payload hash
    pub fn payload_hash(&self) -> Hash {
        self.inner.payload_hash
    }

    /// The payload
    pub fn payload(&self) -> &Payload {
        &self.inner.payload
    }

    /// Approximate wire size in bytes, used as buffer weight
    pub fn size(&self) -> u64 {
        bincode::serialized_size(&self.inner).unwrap_or(0)
            + self.signature.map(|_| 96).unwrap_or(0)
    }

    /// Structural checks that need no parent lookup:
    /// counters initialized, parents unique, bounded extra field,
    /// payload hash matching the payload.
    pub fn validate_basic(&self) -> Result<(), EventError> {
        if self.inner.version == 0
            || self.inner.epoch == 0
            || self.inner.seq == 0
            || self.inner.frame == 0
            || self.inner.lamport == 0
        {
            return Err(EventError::NotInited);
        }
        if self.inner.seq > 1 && self.inner.parents.is_empty() {
            return Err(EventError::NoParents);
        }
        if self.inner.extra.len() > MAX_EXTRA_BYTES {
            return Err(EventError::HugeValue);
        }
        for (i, p) in self.inner.parents.iter().enumerate() {
            if self.inner.parents[..i].contains(p) {
                return Err(EventError::DuplicateParents);
            }
        }
        if self.inner.payload_hash != self.inner.payload.hash() {
            return Err(EventError::PayloadHashMismatch);
        }
        Ok(())
    }

    /// Checks against resolved parents, given in the order of
    /// `self.parents()`:
    /// - `seq == 1` iff there is no self-parent, else `seq` continues the
    ///   self-parent's chain,
    /// - any parent by the same creator is the self-parent and comes first,
    /// - `lamport == max(parent lamports) + 1`.
    pub fn validate_with_parents(&self, parents: &[&Event]) -> Result<(), EventError> {
        if parents.len() != self.inner.parents.len() {
            return Err(EventError::ParentsMismatch);
        }
        for (id, parent) in self.inner.parents.iter().zip(parents) {
            if parent.id() != *id {
                return Err(EventError::ParentsMismatch);
            }
        }

        let self_parent = parents.first().filter(|p| p.creator() == self.creator());
        match (self.inner.seq, self_parent) {
            (1, Some(_)) => return Err(EventError::WrongSeq),
            (1, None) => {}
            (_, None) => return Err(EventError::WrongSelfParent),
            (seq, Some(sp)) => {
                if sp.seq() + 1 != seq {
                    return Err(EventError::WrongSeq);
                }
            }
        }

        // A same-creator parent anywhere but the first slot is a fork
        // attempt or a malformed parent list.
        for p in parents.iter().skip(1) {
            if p.creator() == self.creator() {
                return Err(EventError::WrongSelfParent);
            }
        }

        let max_parent_lamport = parents.iter().map(|p| p.lamport()).max().unwrap_or(0);
        if self.inner.lamport != max_parent_lamport + 1 {
            return Err(EventError::WrongLamport);
        }

        Ok(())
    }
}

// Wire form: the cached id is recomputed on decode.
#[derive(Serialize, Deserialize)]
struct EventWire {
    inner: EventBuilder,
    signature: Option<BlsSignature>,
}

impl Serialize for Event {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = EventWire {
            inner: self.inner.clone(),
            signature: self.signature,
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = EventWire::deserialize(deserializer)?;
        Ok(Event::from_builder(wire.inner, wire.signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> EventBuilder {
        EventBuilder::default()
    }

    #[test]
    fn test_build_computes_payload_hash_and_id() {
        let e = builder().build();
        assert_eq!(e.payload_hash(), e.payload().hash());
        assert_eq!(e.id(), EventId::from_hash(&e.hash_to_sign()));
    }

    #[test]
    fn test_id_changes_with_content() {
        let a = builder().build();
        let mut b = builder();
        b.lamport = 2;
        let b = b.build();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_validate_basic_rejects_uninitialized() {
        let mut b = builder();
        b.seq = 0;
        assert_eq!(b.build().validate_basic(), Err(EventError::NotInited));
    }

    #[test]
    fn test_validate_basic_rejects_huge_extra() {
        let mut b = builder();
        b.extra = vec![0u8; MAX_EXTRA_BYTES + 1];
        assert_eq!(b.build().validate_basic(), Err(EventError::HugeValue));
    }

    #[test]
    fn test_validate_basic_rejects_duplicate_parents() {
        let parent = builder().build();
        let mut b = builder();
        b.seq = 2;
        b.parents = vec![parent.id(), parent.id()];
        assert_eq!(
            b.build().validate_basic(),
            Err(EventError::DuplicateParents)
        );
    }

    #[test]
    fn test_validate_basic_rejects_payload_mismatch() {
        let e = builder().build();
        let mut wire: EventWire = EventWire {
            inner: e.inner.clone(),
            signature: None,
        };
        wire.inner.payload_hash = Hash::hash(b"tampered");
        let tampered = Event::from_builder(wire.inner, wire.signature);
        assert_eq!(
            tampered.validate_basic(),
            Err(EventError::PayloadHashMismatch)
        );
    }

    fn leaf(creator: u64, lamport: Lamport) -> Event {
        let mut b = builder();
        b.creator = ValidatorId(creator);
        b.lamport = lamport;
        b.build()
    }

    #[test]
    fn test_first_event_has_no_self_parent() {
        let e = leaf(1, 1);
        assert_eq!(e.seq(), 1);
        assert_eq!(e.self_parent(), None);
        e.validate_with_parents(&[]).unwrap();
    }

    #[test]
    fn test_chained_event_validates() {
        let parent = leaf(1, 1);
        let other = leaf(2, 3);

        let mut b = builder();
        b.creator = ValidatorId(1);
        b.seq = 2;
        b.lamport = 4;
        b.parents = vec![parent.id(), other.id()];
        let e = b.build();

        assert_eq!(e.self_parent(), Some(parent.id()));
        e.validate_with_parents(&[&parent, &other]).unwrap();
    }

    #[test]
    fn test_wrong_lamport_rejected() {
        let parent = leaf(1, 5);
        let mut b = builder();
        b.creator = ValidatorId(1);
        b.seq = 2;
        b.lamport = 5;
        b.parents = vec![parent.id()];
        let e = b.build();
        assert_eq!(
            e.validate_with_parents(&[&parent]),
            Err(EventError::WrongLamport)
        );
    }

    #[test]
    fn test_seq_must_continue_self_parent() {
        let parent = leaf(1, 1);
        let mut b = builder();
        b.creator = ValidatorId(1);
        b.seq = 3;
        b.lamport = 2;
        b.parents = vec![parent.id()];
        let e = b.build();
        assert_eq!(
            e.validate_with_parents(&[&parent]),
            Err(EventError::WrongSeq)
        );
    }

    #[test]
    fn test_seq_one_with_self_parent_rejected() {
        let parent = leaf(1, 1);
        let mut b = builder();
        b.creator = ValidatorId(1);
        b.seq = 1;
        b.lamport = 2;
        b.parents = vec![parent.id()];
        let e = b.build();
        assert_eq!(
            e.validate_with_parents(&[&parent]),
            Err(EventError::WrongSeq)
        );
    }

    #[test]
    fn test_same_creator_parent_must_be_first() {
        let other = leaf(2, 1);
        let same = leaf(1, 1);

        let mut b = builder();
        b.creator = ValidatorId(1);
        b.seq = 2;
        b.lamport = 2;
        b.parents = vec![other.id(), same.id()];
        let e = b.build();
        // First parent has a different creator, so there is no valid
        // self-parent for seq 2.
        assert_eq!(
            e.validate_with_parents(&[&other, &same]),
            Err(EventError::WrongSelfParent)
        );
    }

    #[test]
    fn test_serde_round_trip_recomputes_id() {
        let mut b = builder();
        b.creator = ValidatorId(9);
        b.payload = Payload::Transactions(vec![RawTransaction::new(vec![1, 2, 3])]);
        let e = b.build();

        let bytes = bincode::serialize(&e).unwrap();
        let restored: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(e, restored);
        assert_eq!(e.id(), restored.id());
    }

    #[test]
    fn test_payload_accessors() {
        let sync = ProposalSyncState {
            last_seen_proposal_turn: 1,
            last_seen_proposal_frame: 2,
            last_seen_proposed_block: 3,
        };
        let payload = Payload::V3(PayloadV3 {
            sync_state: sync,
            proposal: None,
        });
        assert_eq!(payload.sync_state(), Some(&sync));
        assert!(payload.proposal().is_none());
        assert!(payload.transactions().is_empty());
    }
}
