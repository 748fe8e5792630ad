//! Tracking of proposals seen but not yet confirmed in a block

use super::turns::TURN_TIMEOUT_IN_FRAMES;
use crate::{BlockNumber, Frame};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Thread-safe FIFO of `(frame, block)` pairs for proposals observed in
/// the DAG.
///
/// Callers must query with monotonically non-decreasing frames; behaviour
/// under non-monotonic frames is unspecified.
#[derive(Debug, Default)]
pub struct ProposalTracker {
    entries: Mutex<VecDeque<SeenProposal>>,
}

#[derive(Debug, Clone, Copy)]
struct SeenProposal {
    frame: Frame,
    block: BlockNumber,
}

impl ProposalTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a proposal for `block` seen at `frame`
    pub fn register_seen_proposal(&self, frame: Frame, block: BlockNumber) {
        self.entries.lock().push_back(SeenProposal { frame, block });
    }

    /// Report whether a proposal for `block` is still pending at
    /// `current_frame`.
    ///
    /// Entries older than one turn timeout are purged first, so a proposal
    /// whose turn window has expired no longer counts as pending.
    pub fn is_pending(&self, current_frame: Frame, block: BlockNumber) -> bool {
        let mut entries = self.entries.lock();
        while let Some(front) = entries.front() {
            if front.frame + TURN_TIMEOUT_IN_FRAMES < current_frame {
                entries.pop_front();
            } else {
                break;
            }
        }
        entries.iter().any(|e| e.block == block)
    }

    /// Number of tracked entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
