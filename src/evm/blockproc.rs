//! Block production pipeline
//!
//! Builds the EVM-facing block context, runs transactions through the
//! injected state processor, collects receipts with a consistent log
//! index space, and finalizes the block against the state database. The
//! EVM interpreter itself is an external collaborator consumed through
//! the [`StateProcessor`] and [`StateDb`] traits.

use super::gasrate;
use crate::epoch::rules::Rules;
use crate::proposal::RawTransaction;
use crate::{BlockNumber, Timestamp};
use alloy_primitives::{b256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Withdrawals hash of an empty withdrawal list
pub const EMPTY_WITHDRAWALS_HASH: B256 =
    b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

/// Protocol-constant blob base fee
pub const BLOB_BASE_FEE: u64 = 1;

/// Size of the header extra field: nanos(u32) ∥ duration(u64), big-endian
pub const HEADER_EXTRA_BYTES: usize = 12;

/// A log emitted during execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// Indexed topics
    pub topics: Vec<B256>,
    /// Opaque data
    pub data: Bytes,
    /// Index of the emitting transaction within the block
    pub tx_index: u32,
}

/// Execution receipt of one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Transaction hash
    pub tx_hash: B256,
    /// True if execution succeeded
    pub status: bool,
    /// Gas consumed by this transaction
    pub gas_used: u64,
    /// Cumulative gas consumed up to and including this transaction
    pub cumulative_gas_used: u64,
    /// Logs emitted by this transaction
    pub logs: Vec<Log>,
}

/// EVM-facing context of the block under construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    /// Block number
    pub number: BlockNumber,
    /// Parent block hash
    pub parent_hash: B256,
    /// Block timestamp in nanoseconds
    pub time: Timestamp,
    /// Nanoseconds since the parent block
    pub duration: u64,
    /// Fee recipient
    pub coinbase: Address,
    /// Block gas limit
    pub gas_limit: u64,
    /// Protocol base fee per gas
    pub base_fee: U256,
    /// Blob base fee per gas
    pub blob_base_fee: U256,
    /// Randomness of the block; only set post-Sonic
    pub prev_randao: Option<B256>,
    /// Hash of the (empty) withdrawal list; only set post-Sonic
    pub withdrawals_hash: Option<B256>,
    /// Waive the base-fee floor, letting zero-gas-price internal
    /// transactions and replayed calls execute
    pub no_base_fee: bool,
}

impl BlockContext {
    /// Construct the context for a regular block.
    ///
    /// The base fee must already be derived for this block (see
    /// [`next_base_fee`] / [`initial_base_fee`](gasrate::initial_base_fee)).
    pub fn new(
        number: BlockNumber,
        parent_hash: B256,
        time: Timestamp,
        duration: u64,
        coinbase: Address,
        base_fee: U256,
        rules: &Rules,
    ) -> Self {
        BlockContext {
            number,
            parent_hash,
            time,
            duration,
            coinbase,
            gas_limit: rules.blocks.max_block_gas,
            base_fee,
            blob_base_fee: U256::from(BLOB_BASE_FEE),
            prev_randao: rules.upgrades.sonic.then(B256::default),
            withdrawals_hash: rules.upgrades.sonic.then_some(EMPTY_WITHDRAWALS_HASH),
            no_base_fee: false,
        }
    }

    /// Context for replaying transactions against an empty block, with the
    /// base-fee floor waived (`debug_traceCall` on historic state)
    pub fn for_replay(base: &BlockContext) -> Self {
        BlockContext {
            no_base_fee: true,
            ..base.clone()
        }
    }

    /// Header extra field: sub-second nanos of `time` and the duration
    /// since the parent, both big-endian
    pub fn extra(&self) -> [u8; HEADER_EXTRA_BYTES] {
        let nanos = (self.time % 1_000_000_000) as u32;
        let mut extra = [0u8; HEADER_EXTRA_BYTES];
        extra[..4].copy_from_slice(&nanos.to_be_bytes());
        extra[4..].copy_from_slice(&self.duration.to_be_bytes());
        extra
    }

    /// Decode a header extra field back into (nanos, duration)
    pub fn decode_extra(extra: &[u8]) -> Option<(u32, u64)> {
        if extra.len() != HEADER_EXTRA_BYTES {
            return None;
        }
        let mut nanos = [0u8; 4];
        nanos.copy_from_slice(&extra[..4]);
        let mut duration = [0u8; 8];
        duration.copy_from_slice(&extra[4..]);
        Some((u32::from_be_bytes(nanos), u64::from_be_bytes(duration)))
    }
}

/// Optional overrides applied to a block context before EVM invocation
/// (`eth_call` / `debug_traceCall`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockOverrides {
    /// Override the block number
    pub number: Option<BlockNumber>,
    /// Override the difficulty; folded into prev-randao post-merge
    pub difficulty: Option<U256>,
    /// Override the timestamp in nanoseconds
    pub time: Option<Timestamp>,
    /// Override the gas limit
    pub gas_limit: Option<u64>,
    /// Override the coinbase
    pub coinbase: Option<Address>,
    /// Override prev-randao
    pub random: Option<B256>,
    /// Override the base fee
    pub base_fee: Option<U256>,
    /// Override the blob base fee
    pub blob_base_fee: Option<U256>,
}

impl BlockOverrides {
    /// Overwrite each non-nil field of `ctx`
    pub fn apply(&self, ctx: &mut BlockContext) {
        if let Some(number) = self.number {
            ctx.number = number;
        }
        if let Some(time) = self.time {
            ctx.time = time;
        }
        if let Some(gas_limit) = self.gas_limit {
            ctx.gas_limit = gas_limit;
        }
        if let Some(coinbase) = self.coinbase {
            ctx.coinbase = coinbase;
        }
        if let Some(random) = self.random {
            ctx.prev_randao = Some(random);
        }
        if let Some(base_fee) = self.base_fee {
            ctx.base_fee = base_fee;
        }
        if let Some(blob_base_fee) = self.blob_base_fee {
            ctx.blob_base_fee = blob_base_fee;
        }
        if let Some(difficulty) = self.difficulty {
            // Post-merge the difficulty field travels as prev-randao.
            ctx.prev_randao = Some(B256::from(difficulty.to_be_bytes::<32>()));
        }
    }
}

/// External EVM execution engine
pub trait StateProcessor {
    /// Execute `txs` under `ctx` with `gas_limit` gas available.
    ///
    /// Returns one receipt per transaction, `None` for skipped
    /// transactions. `on_new_log` fires for every emitted log before it is
    /// attached to its receipt.
    fn execute(
        &mut self,
        ctx: &BlockContext,
        txs: &[RawTransaction],
        gas_limit: u64,
        on_new_log: &mut dyn FnMut(&mut Log),
    ) -> Vec<Option<Receipt>>;
}

/// External state database finalization
pub trait StateDb {
    /// End the block and compute the resulting state root
    fn finalize(&mut self) -> B256;
}

/// The produced block, EVM-facing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmBlock {
    /// Context the block was produced under
    pub ctx: BlockContext,
    /// State root after execution
    pub state_root: B256,
    /// Total gas used
    pub gas_used: u64,
    /// Header extra field
    pub extra: Vec<u8>,
    /// Included transactions, in execution order
    pub transactions: Vec<RawTransaction>,
}

/// Per-block execution driver.
///
/// `execute` may run several batches; log transaction indices stay
/// consistent across batches. `finalize` filters skipped transactions and
/// seals the block.
pub struct BlockRunner<'p, P: StateProcessor> {
    processor: &'p mut P,
    ctx: BlockContext,
    transactions: Vec<RawTransaction>,
    receipts: Vec<Option<Receipt>>,
    gas_used: u64,
}

impl<'p, P: StateProcessor> BlockRunner<'p, P> {
    /// Start a block run under `ctx`
    pub fn new(processor: &'p mut P, ctx: BlockContext) -> Self {
        BlockRunner {
            processor,
            ctx,
            transactions: Vec::new(),
            receipts: Vec::new(),
            gas_used: 0,
        }
    }

    /// The context of the running block
    pub fn ctx(&self) -> &BlockContext {
        &self.ctx
    }

    /// Gas used so far
    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }

    /// Execute one batch of transactions with `gas_limit` gas available.
    ///
    /// Log `tx_index` values are shifted by the number of transactions
    /// already executed, so logs from every batch share one index space.
    pub fn execute(&mut self, txs: &[RawTransaction], gas_limit: u64) {
        let offset = self.transactions.len() as u32;
        let mut on_new_log = |log: &mut Log| {
            log.tx_index += offset;
        };
        let receipts = self
            .processor
            .execute(&self.ctx, txs, gas_limit, &mut on_new_log);

        for receipt in &receipts {
            if let Some(receipt) = receipt {
                self.gas_used += receipt.gas_used;
            }
        }
        self.transactions.extend_from_slice(txs);
        self.receipts.extend(receipts);
    }

    /// End the block: finalize the state, compute the state root and
    /// return the block, the indices of skipped transactions and the
    /// receipts of the executed ones.
    pub fn finalize(self, state: &mut dyn StateDb) -> (EvmBlock, Vec<usize>, Vec<Receipt>) {
        let state_root = state.finalize();

        let mut skipped = Vec::new();
        let mut receipts = Vec::new();
        for (i, receipt) in self.receipts.into_iter().enumerate() {
            match receipt {
                Some(receipt) => receipts.push(receipt),
                None => skipped.push(i),
            }
        }

        let extra = self.ctx.extra().to_vec();
        let block = EvmBlock {
            ctx: self.ctx,
            state_root,
            gas_used: self.gas_used,
            extra,
            transactions: self.transactions,
        };
        (block, skipped, receipts)
    }
}

/// Base fee for `number`, deriving from the parent block's usage.
///
/// Block zero starts at `max(10 gwei, min_base_fee)`; later blocks follow
/// the exponential recurrence of [`gasrate`].
pub fn next_base_fee(
    number: BlockNumber,
    parent_base_fee: U256,
    parent_gas_used: u64,
    parent_duration_nanos: i64,
    rules: &Rules,
) -> U256 {
    if number == 0 {
        return gasrate::initial_base_fee(rules.min_base_fee);
    }
    gasrate::base_fee_for_next_block(
        parent_base_fee,
        parent_gas_used,
        parent_duration_nanos,
        rules.target_gas_rate(),
        rules.min_base_fee,
    )
}
