//! Epoch sealing
//!
//! An epoch runs one validator set under one rules snapshot. Sealing
//! happens exactly once per boundary, before any block of the new epoch:
//! it rotates the validator set from the staged profiles, installs
//! deferred rules and resets the per-epoch accounting.

use super::rules::Rules;
use crate::crypto::EventId;
use crate::dag::event::{Event, GasPowerLeft};
use crate::validators::{ValidatorId, ValidatorSet, ValidatorSetBuilder};
use crate::{BlockNumber, Epoch, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// How many blocks a validator may miss before its uptime stops accruing
pub const BLOCK_MISSED_SLACK: u64 = 50;

/// Per-validator state within the current epoch
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidatorEpochState {
    /// Last block the validator was seen participating in
    pub last_block: BlockNumber,
    /// Last time the validator was seen online, nanoseconds
    pub last_online_time: Timestamp,
    /// Highest confirmed event of the validator
    pub last_event: Option<EventId>,
    /// Accumulated online time within this epoch, nanoseconds
    pub uptime: u64,
    /// Gas refund granted at the last epoch boundary
    pub gas_refund: u64,
    /// Gas refund accumulating within this epoch
    pub dirty_gas_refund: u64,
    /// Remaining gas power as of the last confirmed event
    pub gas_power_left: GasPowerLeft,
}

/// Mutable state of the running epoch.
///
/// Serializable as a whole so export/import across restarts preserves the
/// staged validator profiles and any pending rules change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochState {
    /// Current epoch number
    pub epoch: Epoch,
    /// Start time of the current epoch, nanoseconds
    pub epoch_start: Timestamp,
    /// Start time of the previous epoch, nanoseconds
    pub prev_epoch_start: Timestamp,
    /// Gas consumed within the current epoch
    pub epoch_gas: u64,
    /// Validators caught misbehaving this epoch
    pub epoch_cheaters: Vec<ValidatorId>,
    /// How many cheaters have been written out already
    pub cheaters_written: usize,
    /// Externally requested number of forced epoch advances
    pub advance_epochs: u32,
    /// Rules of the current epoch
    pub rules: Rules,
    /// Rules staged for the next epoch boundary, if any
    pub dirty_rules: Option<Rules>,
    /// Validator set of the current epoch
    pub validators: ValidatorSet,
    /// Per-validator epoch state
    pub validator_states: BTreeMap<ValidatorId, ValidatorEpochState>,
    /// Weights the next epoch's validator set is built from
    pub next_validator_profiles: BTreeMap<ValidatorId, u64>,
}

impl EpochState {
    /// Initial state at genesis time
    pub fn new(rules: Rules, genesis_time: Timestamp) -> Self {
        EpochState {
            epoch: 1,
            epoch_start: genesis_time,
            prev_epoch_start: genesis_time,
            epoch_gas: 0,
            epoch_cheaters: Vec::new(),
            cheaters_written: 0,
            advance_epochs: 0,
            rules,
            dirty_rules: None,
            validators: ValidatorSetBuilder::new().build(),
            validator_states: BTreeMap::new(),
            next_validator_profiles: BTreeMap::new(),
        }
    }

    /// Whether the epoch must be sealed at a block with `block_time`:
    /// gas or duration threshold reached, a forced advance is pending, or
    /// a cheater was recorded
    pub fn should_seal_epoch(&self, block_time: Timestamp) -> bool {
        self.epoch_gas >= self.rules.epochs.max_epoch_gas
            || block_time.saturating_sub(self.epoch_start) >= self.rules.epochs.max_epoch_duration
            || self.advance_epochs > 0
            || !self.epoch_cheaters.is_empty()
    }

    /// Record a cheater for this epoch
    pub fn add_cheater(&mut self, id: ValidatorId) {
        if !self.epoch_cheaters.contains(&id) {
            self.epoch_cheaters.push(id);
        }
    }

    /// True if `id` cheated this epoch
    pub fn is_cheater(&self, id: ValidatorId) -> bool {
        self.epoch_cheaters.contains(&id)
    }

    /// Submit a rules change.
    ///
    /// Post-Allegro the change is staged and installed at the next epoch
    /// boundary; on legacy networks it applies immediately.
    pub fn update_rules(&mut self, new_rules: Rules) {
        if self.rules.upgrades.allegro {
            self.dirty_rules = Some(new_rules);
        } else {
            self.rules = new_rules;
        }
    }

    /// Seal the epoch at `block` / `block_time`:
    /// rotate the validator set from the staged profiles, carry or reset
    /// per-validator state, install deferred rules and reset the epoch
    /// accounting.
    pub fn seal_epoch(&mut self, block: BlockNumber, block_time: Timestamp) {
        let mut builder = ValidatorSetBuilder::new();
        for (&id, &weight) in &self.next_validator_profiles {
            builder.set(id, weight);
        }
        let new_validators = builder.build();

        let mut new_states = BTreeMap::new();
        for id in new_validators.ids() {
            let state = match self.validator_states.get(&id) {
                // Existing validators carry their participation markers.
                Some(old) => ValidatorEpochState {
                    last_block: old.last_block,
                    last_online_time: old.last_online_time,
                    last_event: old.last_event,
                    uptime: 0,
                    gas_refund: old.dirty_gas_refund,
                    dirty_gas_refund: 0,
                    gas_power_left: old.gas_power_left,
                },
                // Fresh validators start at the sealing block and time.
                None => ValidatorEpochState {
                    last_block: block,
                    last_online_time: block_time,
                    last_event: None,
                    uptime: 0,
                    gas_refund: 0,
                    dirty_gas_refund: 0,
                    gas_power_left: GasPowerLeft::default(),
                },
            };
            new_states.insert(id, state);
        }

        self.prev_epoch_start = self.epoch_start;
        self.epoch_start = block_time;

        if let Some(rules) = self.dirty_rules.take() {
            info!(epoch = self.epoch + 1, "installing deferred rules change");
            self.rules = rules;
        }

        self.validators = new_validators;
        self.validator_states = new_states;
        self.epoch_gas = 0;
        self.epoch_cheaters.clear();
        self.cheaters_written = 0;
        self.epoch += 1;
        self.advance_epochs = self.advance_epochs.saturating_sub(1);
    }
}

#[derive(Debug, Clone)]
struct HighestEvent {
    id: EventId,
    median_time: Timestamp,
    gas_power_left: GasPowerLeft,
}

/// Tracks the highest-sequence confirmed event per creator within one
/// block, then folds the observations into the epoch state on finalize.
#[derive(Debug, Default)]
pub struct ConfirmedEventsProcessor {
    highest: HashMap<ValidatorId, HighestEvent>,
    highest_seq: HashMap<ValidatorId, u32>,
}

impl ConfirmedEventsProcessor {
    /// Create an empty processor for one block
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a confirmed event, accumulating epoch gas
    pub fn process_confirmed(&mut self, state: &mut EpochState, event: &Event) {
        state.epoch_gas = state.epoch_gas.saturating_add(event.gas_power_used());

        let creator = event.creator();
        let is_higher = self
            .highest_seq
            .get(&creator)
            .map(|&seq| event.seq() > seq)
            .unwrap_or(true);
        if is_higher {
            self.highest_seq.insert(creator, event.seq());
            self.highest.insert(
                creator,
                HighestEvent {
                    id: event.id(),
                    median_time: event.median_time(),
                    gas_power_left: event.gas_power_left(),
                },
            );
        }
    }

    /// Fold the block's observations into the epoch state.
    ///
    /// Cheaters' slots are cleared first. For validators within
    /// `BLOCK_MISSED_SLACK` of `block`, uptime is extended by the span
    /// from the last accounted moment (the epoch start at the earliest,
    /// post-Berlin) to the event's median time.
    pub fn finalize(mut self, state: &mut EpochState, block: BlockNumber) {
        let cheaters: Vec<ValidatorId> = state
            .epoch_cheaters
            .iter()
            .copied()
            .filter(|id| self.highest.contains_key(id))
            .collect();
        for id in cheaters {
            self.highest.remove(&id);
            self.highest_seq.remove(&id);
        }

        let berlin = state.rules.upgrades.berlin;
        let epoch_start = state.epoch_start;
        for (creator, observed) in self.highest {
            let Some(vstate) = state.validator_states.get_mut(&creator) else {
                continue;
            };
            if vstate.last_block + BLOCK_MISSED_SLACK < block {
                continue;
            }
            let mut since = vstate.last_online_time;
            if berlin {
                since = since.max(epoch_start);
            }
            vstate.uptime += observed.median_time.saturating_sub(since);
            vstate.last_online_time = observed.median_time.max(vstate.last_online_time);
            vstate.last_event = Some(observed.id);
            vstate.last_block = block;
            vstate.gas_power_left = observed.gas_power_left;
        }
    }
}
