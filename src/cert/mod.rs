//! Certificate layer: statements, signer bitmasks, aggregated signatures
//! and their protobuf wire format

pub mod bitset;
pub mod certificate;
pub mod proto;
pub mod statement;

pub use bitset::BitSet;
pub use certificate::{AggregatedSignature, CertError, Certificate};
pub use statement::{BlockStatement, CommitteeStatement, Statement};

/// Certificate over a block statement
pub type BlockCertificate = Certificate<BlockStatement>;
/// Certificate over a committee statement
pub type CommitteeCertificate = Certificate<CommitteeStatement>;
