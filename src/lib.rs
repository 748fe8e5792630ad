//! # Sonic Node Core
//!
//! Core subsystems of a byzantine fault tolerant, EVM-compatible L1 node
//! with an auxiliary certification chain for light clients.
//!
//! ## Core Features
//! - Leaderless DAG consensus intake: out-of-order event buffering with
//!   backpressure, parallel validation, parent completion
//! - Deterministic proposer rotation over time-bounded turns
//! - Per-block EVM execution pipeline with protocol base-fee control
//! - Epoch sealing with validator-set rotation and deferred rules
//! - Sonic Certification Chain: BLS threshold certificates over blocks
//!   and committees, light-client sync with retry/multiplex transports
//!
//! The EVM interpreter, storage backends and wire transports are external
//! collaborators consumed through traits.

pub mod cert;
pub mod committee;
pub mod crypto;
pub mod dag;
pub mod epoch;
pub mod evm;
pub mod proposal;
pub mod rpc;
pub mod scc;
pub mod validators;

// Re-exports
pub use cert::{BlockCertificate, BlockStatement, Certificate, CommitteeCertificate,
    CommitteeStatement};
pub use committee::{Committee, Member, MemberId};
pub use crypto::{BlsKeypair, BlsPublicKey, BlsSecretKey, BlsSignature, EventId, Hash,
    ProofOfPossession};
pub use dag::{Event, EventBuilder, OrderingBuffer, Processor};
pub use epoch::{EpochState, Rules};
pub use proposal::{Proposal, ProposalSyncState, ProposalTracker};
pub use scc::{LightClientState, SccNode};
pub use validators::{ValidatorId, ValidatorSet, ValidatorSetBuilder};

// =============================================================================
// SCALAR TYPES
// =============================================================================

/// Epoch counter
pub type Epoch = u32;

/// Per-creator event sequence number, starting at 1
pub type Seq = u32;

/// Consensus frame counter
pub type Frame = u32;

/// Lamport time
pub type Lamport = u32;

/// Proposal turn counter
pub type Turn = u32;

/// Block number
pub type BlockNumber = u64;

/// Wall-clock time in nanoseconds since the unix epoch
pub type Timestamp = u64;

// =============================================================================
// NETWORK CONFIGURATION
// =============================================================================

/// Node version
pub const SONIC_VERSION: &str = "0.3.0";

/// Default chain id of the main network
pub const DEFAULT_CHAIN_ID: u64 = 250;

/// Blocks certified by one committee (re-exported for convenience)
pub const PERIOD_LENGTH: u64 = scc::PERIOD_LENGTH;

/// Frames before a proposer turn can be skipped
pub const TURN_TIMEOUT_IN_FRAMES: Frame = proposal::TURN_TIMEOUT_IN_FRAMES;

/// Maximum committee size
pub const MAX_COMMITTEE_SIZE: usize = committee::MAX_COMMITTEE_SIZE;
