//! Network rules snapshot
//!
//! One epoch runs under one immutable rules snapshot. Rule changes arrive
//! through the driver-auth contract and, post-Allegro, are buffered as
//! dirty rules until the next epoch boundary.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Named protocol upgrades toggled per network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Upgrades {
    /// Berlin: uptime accounting measured from the epoch start
    pub berlin: bool,
    /// Sonic: prev-randao and withdrawals hash in block headers
    pub sonic: bool,
    /// Allegro: rule changes deferred to the next epoch boundary
    pub allegro: bool,
}

/// Block-level rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRules {
    /// Gas limit of a single block
    pub max_block_gas: u64,
}

/// Epoch-level rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRules {
    /// Gas threshold that seals an epoch
    pub max_epoch_gas: u64,
    /// Wall-clock epoch duration threshold in nanoseconds
    pub max_epoch_duration: u64,
}

/// Gas power allocation over one horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPowerRules {
    /// Gas power allocated per second of validator uptime
    pub alloc_per_sec: u64,
    /// Maximum accumulation period in nanoseconds
    pub max_alloc_period: u64,
}

/// Economy rules: gas power allocation on the two horizons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyRules {
    /// Short-window allocation; the base-fee target rate derives from it
    pub short_gas_power: GasPowerRules,
    /// Long-window allocation
    pub long_gas_power: GasPowerRules,
}

/// One epoch's rules snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    /// Human-readable network name
    pub name: String,
    /// Floor for the protocol base fee
    pub min_base_fee: U256,
    /// Floor for accepted transaction gas prices
    pub min_gas_price: U256,
    /// Block-level rules
    pub blocks: BlockRules,
    /// Epoch-level rules
    pub epochs: EpochRules,
    /// Gas power economy
    pub economy: EconomyRules,
    /// Active upgrades
    pub upgrades: Upgrades,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            name: "sonic".to_string(),
            min_base_fee: U256::from(1_000_000_000u64), // 1 gwei
            min_gas_price: U256::ZERO,
            blocks: BlockRules {
                max_block_gas: 20_500_000,
            },
            epochs: EpochRules {
                max_epoch_gas: 1_500_000_000,
                max_epoch_duration: 4 * 60 * 60 * 1_000_000_000, // 4 h
            },
            economy: EconomyRules {
                short_gas_power: GasPowerRules {
                    alloc_per_sec: 10_000_000,
                    max_alloc_period: 60 * 1_000_000_000,
                },
                long_gas_power: GasPowerRules {
                    alloc_per_sec: 5_000_000,
                    max_alloc_period: 60 * 60 * 1_000_000_000,
                },
            },
            upgrades: Upgrades {
                berlin: true,
                sonic: true,
                allegro: true,
            },
        }
    }
}

impl Rules {
    /// Base-fee target throughput: half the short-window allocation rate
    pub fn target_gas_rate(&self) -> u64 {
        self.economy.short_gas_power.alloc_per_sec / 2
    }
}
