//! Proposer turns
//!
//! A turn is the right-to-propose token, owned collectively by the
//! validator set and advanced either by a proposal or by timeout. The
//! proposer of a turn is picked by deterministic weighted sampling, so
//! every node derives the same rotation without exchanging messages.

use super::sync_state::ProposalSyncState;
use crate::validators::{ValidatorId, ValidatorSet};
use crate::{BlockNumber, Frame, Turn};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

/// Number of frames a proposer has before its turn can be skipped
pub const TURN_TIMEOUT_IN_FRAMES: Frame = 8;

/// A (turn, frame) position in the proposal schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnFrame {
    /// Proposal turn
    pub turn: Turn,
    /// Frame the turn was taken in
    pub frame: Frame,
}

/// Deterministic weighted choice of the proposer for `turn`.
///
/// `SHA-256(turn)` is read as a 256-bit fraction in `[0, 1)` and scaled by
/// the total voting weight; the pick is the validator whose cumulative
/// weight interval (in ascending id order) contains the scaled value.
/// Returns `None` for an empty validator set.
pub fn proposer_for_turn(validators: &ValidatorSet, turn: Turn) -> Option<ValidatorId> {
    let total = validators.total_weight();
    if total == 0 {
        return None;
    }

    let mut hasher = Sha256::new();
    hasher.update((turn as u64).to_be_bytes());
    let seed = hasher.finalize();

    // target = floor(seed / 2^256 * total), strictly below total
    let target_big = (BigUint::from_bytes_be(&seed) * BigUint::from(total)) >> 256u32;
    let target: u64 = target_big.try_into().unwrap_or(0);

    let mut cumulative: u64 = 0;
    for (id, weight) in validators.iter() {
        cumulative += weight;
        if target < cumulative {
            return Some(id);
        }
    }
    None
}

/// Check whether moving from `prev` to `next` respects the turn schedule.
///
/// Turns and frames must strictly increase, and turn `prev.turn + k` is
/// only allowed in the frame interval
/// `(prev.frame + (k-1)·C, prev.frame + k·C]` with
/// `C = TURN_TIMEOUT_IN_FRAMES`. A validator cannot save up skipped turns
/// and burst proposals later.
pub fn is_valid_turn_progression(prev: TurnFrame, next: TurnFrame) -> bool {
    if next.turn <= prev.turn || next.frame <= prev.frame {
        return false;
    }
    let delta = next.frame - prev.frame - 1;
    let turn_gap = next.turn - prev.turn - 1;
    (delta / TURN_TIMEOUT_IN_FRAMES) as u64 == turn_gap as u64
}

/// Check whether `me` may propose `block_to_propose` at `current_frame`
/// given the sync state merged from the new event's parents:
/// - blocks are proposed in strict succession,
/// - the next turn's sampled proposer is `me`,
/// - the turn progression from the last seen proposal is on schedule.
pub fn is_allowed_to_propose(
    state: &ProposalSyncState,
    current_frame: Frame,
    validators: &ValidatorSet,
    me: ValidatorId,
    block_to_propose: BlockNumber,
) -> bool {
    if state.last_seen_proposed_block + 1 != block_to_propose {
        return false;
    }
    if proposer_for_turn(validators, state.last_seen_proposal_turn + 1) != Some(me) {
        return false;
    }
    is_valid_turn_progression(
        TurnFrame {
            turn: state.last_seen_proposal_turn,
            frame: state.last_seen_proposal_frame,
        },
        TurnFrame {
            turn: state.last_seen_proposal_turn + 1,
            frame: current_frame,
        },
    )
}
