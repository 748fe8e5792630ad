//! EVM block production pipeline and gas-rate control

pub mod blockproc;
pub mod gasrate;

pub use blockproc::{
    next_base_fee, BlockContext, BlockOverrides, BlockRunner, EvmBlock, Log, Receipt, StateDb,
    StateProcessor, BLOB_BASE_FEE, EMPTY_WITHDRAWALS_HASH, HEADER_EXTRA_BYTES,
};
pub use gasrate::{base_fee_for_next_block, effective_gas_limit, initial_base_fee};
