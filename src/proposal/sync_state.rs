//! Proposal sync state carried on every event
//!
//! The triple tracks the most advanced proposal activity an event has seen.
//! It forms a join-semilattice under component-wise max, so merging parent
//! states is order-independent and replay-safe.

use crate::{BlockNumber, Frame, Turn};
use serde::{Deserialize, Serialize};

/// Highest proposal turn, frame and proposed block seen so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProposalSyncState {
    /// Highest proposal turn observed
    pub last_seen_proposal_turn: Turn,
    /// Frame in which that turn's proposal was made
    pub last_seen_proposal_frame: Frame,
    /// Highest block number a proposal was made for
    pub last_seen_proposed_block: BlockNumber,
}

impl ProposalSyncState {
    /// State inherited by a genesis event of an epoch: no proposal activity
    /// yet, block tracking starts at the epoch's start block
    pub fn genesis(epoch_start_block: BlockNumber) -> Self {
        ProposalSyncState {
            last_seen_proposal_turn: 0,
            last_seen_proposal_frame: 0,
            last_seen_proposed_block: epoch_start_block,
        }
    }

    /// Component-wise max of two states.
    ///
    /// Associative, commutative and idempotent.
    pub fn join(&self, other: &ProposalSyncState) -> ProposalSyncState {
        ProposalSyncState {
            last_seen_proposal_turn: self.last_seen_proposal_turn.max(other.last_seen_proposal_turn),
            last_seen_proposal_frame: self
                .last_seen_proposal_frame
                .max(other.last_seen_proposal_frame),
            last_seen_proposed_block: self
                .last_seen_proposed_block
                .max(other.last_seen_proposed_block),
        }
    }

    /// Join an arbitrary number of states, typically the parents of a new
    /// event. Returns the default state for an empty input.
    pub fn join_all<'a>(states: impl IntoIterator<Item = &'a ProposalSyncState>) -> Self {
        states
            .into_iter()
            .fold(ProposalSyncState::default(), |acc, s| acc.join(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st(turn: Turn, frame: Frame, block: BlockNumber) -> ProposalSyncState {
        ProposalSyncState {
            last_seen_proposal_turn: turn,
            last_seen_proposal_frame: frame,
            last_seen_proposed_block: block,
        }
    }

    #[test]
    fn test_join_component_wise() {
        let a = st(1, 9, 100);
        let b = st(3, 2, 50);
        let joined = a.join(&b);
        assert_eq!(joined, st(3, 9, 100));
    }

    #[test]
    fn test_join_commutative_associative_idempotent() {
        let a = st(1, 2, 3);
        let b = st(2, 1, 7);
        let c = st(0, 9, 1);

        assert_eq!(a.join(&b), b.join(&a));
        assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)));
        assert_eq!(a.join(&a), a);
    }

    #[test]
    fn test_join_all() {
        let states = [st(1, 2, 3), st(4, 0, 1), st(2, 8, 2)];
        assert_eq!(ProposalSyncState::join_all(states.iter()), st(4, 8, 3));
        assert_eq!(
            ProposalSyncState::join_all(std::iter::empty()),
            ProposalSyncState::default()
        );
    }

    #[test]
    fn test_genesis_carries_epoch_start_block() {
        let g = ProposalSyncState::genesis(2048);
        assert_eq!(g.last_seen_proposal_turn, 0);
        assert_eq!(g.last_seen_proposal_frame, 0);
        assert_eq!(g.last_seen_proposed_block, 2048);
    }
}
