//! Sonic Certification Chain (SCC)
//!
//! Blocks are grouped into fixed-length periods; each period is certified
//! by a BLS aggregate signature of its committee. Light clients follow the
//! certified chain period by period without synchronising the DAG.

pub mod client;
pub mod node;
pub mod provider;
pub mod store;

pub use client::{ClientError, LightClientState};
pub use node::SccNode;
pub use provider::{
    BlockQuery, HttpProvider, Multiplexer, PeriodQuery, Provider, ProviderError, RetryConfig,
    RetryProvider,
};
pub use store::{MemoryStore, Store, StoreError};

use crate::BlockNumber;

/// Number of blocks certified by one committee
pub const PERIOD_LENGTH: u64 = 1024;

/// Period a block number falls into
pub fn get_period(number: BlockNumber) -> u64 {
    number / PERIOD_LENGTH
}

/// True for the first block of its period
pub fn is_first_block_of_period(number: BlockNumber) -> bool {
    number % PERIOD_LENGTH == 0
}

/// True for the last block of its period
pub fn is_last_block_of_period(number: BlockNumber) -> bool {
    number % PERIOD_LENGTH == PERIOD_LENGTH - 1
}
