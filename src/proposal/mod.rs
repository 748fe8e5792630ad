//! Proposal-turn state machine
//!
//! Deterministic proposer rotation over time-bounded turns, with a
//! parent-merged sync state travelling on every event.

pub mod proposal;
pub mod proto;
pub mod sync_state;
pub mod tracker;
pub mod turns;

pub use proposal::{Proposal, RawTransaction};
pub use sync_state::ProposalSyncState;
pub use tracker::ProposalTracker;
pub use turns::{
    is_allowed_to_propose, is_valid_turn_progression, proposer_for_turn, TurnFrame,
    TURN_TIMEOUT_IN_FRAMES,
};
