//! Validator set model
//!
//! Maintains the authoritative list of validators for one epoch and their
//! voting weights. Provides efficient lookup and deterministic iteration in
//! ascending id order, which proposer sampling and epoch accounting rely on.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a validator within the network
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ValidatorId(pub u64);

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ValidatorId {
    fn from(id: u64) -> Self {
        ValidatorId(id)
    }
}

/// Immutable weighted validator set for one epoch.
///
/// Construction goes through [`ValidatorSetBuilder`]; the built set keeps
/// validators sorted by id and pre-computes the total weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSet {
    /// (id, weight) pairs sorted by ascending id
    entries: Vec<(ValidatorId, u64)>,
    /// Sum of all weights
    total_weight: u64,
}

impl ValidatorSet {
    /// Number of validators
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total voting weight
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Weight of `id`, zero if not a member
    pub fn weight(&self, id: ValidatorId) -> u64 {
        self.entries
            .binary_search_by_key(&id, |(vid, _)| *vid)
            .map(|i| self.entries[i].1)
            .unwrap_or(0)
    }

    /// True if `id` is a member
    pub fn contains(&self, id: ValidatorId) -> bool {
        self.entries
            .binary_search_by_key(&id, |(vid, _)| *vid)
            .is_ok()
    }

    /// Iterate (id, weight) pairs in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (ValidatorId, u64)> + '_ {
        self.entries.iter().copied()
    }

    /// Ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = ValidatorId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }
}

/// Builder accumulating validator weights before freezing them into a set
#[derive(Debug, Clone, Default)]
pub struct ValidatorSetBuilder {
    weights: HashMap<ValidatorId, u64>,
}

impl ValidatorSetBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the weight for `id`, replacing any previous weight.
    /// A zero weight removes the validator.
    pub fn set(&mut self, id: ValidatorId, weight: u64) {
        if weight == 0 {
            self.weights.remove(&id);
        } else {
            self.weights.insert(id, weight);
        }
    }

    /// Freeze into an immutable set sorted by id
    pub fn build(self) -> ValidatorSet {
        let mut entries: Vec<(ValidatorId, u64)> = self.weights.into_iter().collect();
        entries.sort_by_key(|(id, _)| *id);
        let total_weight = entries.iter().map(|(_, w)| *w).sum();
        ValidatorSet {
            entries,
            total_weight,
        }
    }
}
