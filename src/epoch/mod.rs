//! Epoch sealing and rules rotation

pub mod rules;
pub mod sealer;

pub use rules::{EconomyRules, EpochRules, GasPowerRules, Rules, Upgrades};
pub use sealer::{
    ConfirmedEventsProcessor, EpochState, ValidatorEpochState, BLOCK_MISSED_SLACK,
};
