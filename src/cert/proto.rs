//! Protobuf wire format for certificates
//!
//! Hand-written prost messages mirroring the certificate wire schema:
//!
//! ```text
//! CommitteeCertificate { chain_id, period, members[], signature }
//! BlockCertificate     { chain_id, number, hash(32), state_root(32), signature }
//! AggregatedSignature  { signer_mask, signature(96) }
//! Member               { public_key(48), proof_of_possession(96), voting_power }
//! ```
//!
//! Fixed-width fields are validated on decode; mismatched lengths are
//! rejected with descriptive errors.

use super::bitset::BitSet;
use super::certificate::{AggregatedSignature, CertError, Certificate};
use super::statement::{BlockStatement, CommitteeStatement};
use crate::committee::{Committee, Member};
use crate::crypto::bls::{BlsPublicKey, BlsSignature, ProofOfPossession};
use crate::crypto::Hash;
use prost::Message;

/// Wire form of an aggregated signature
#[derive(Clone, PartialEq, Message)]
pub struct PbAggregatedSignature {
    /// Byte-wise signer bitmask over the producer committee
    #[prost(bytes = "vec", tag = "1")]
    pub signer_mask: Vec<u8>,
    /// 96-byte aggregate signature; empty when no signer contributed yet
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

/// Wire form of a committee member
#[derive(Clone, PartialEq, Message)]
pub struct PbMember {
    /// 48-byte compressed public key
    #[prost(bytes = "vec", tag = "1")]
    pub public_key: Vec<u8>,
    /// 96-byte proof of possession
    #[prost(bytes = "vec", tag = "2")]
    pub proof_of_possession: Vec<u8>,
    /// Voting power
    #[prost(uint64, tag = "3")]
    pub voting_power: u64,
}

/// Wire form of a committee certificate
#[derive(Clone, PartialEq, Message)]
pub struct PbCommitteeCertificate {
    /// Chain id; negative values are invalid
    #[prost(int64, tag = "1")]
    pub chain_id: i64,
    /// Certified period
    #[prost(uint64, tag = "2")]
    pub period: u64,
    /// Committee members in order
    #[prost(message, repeated, tag = "3")]
    pub members: Vec<PbMember>,
    /// Aggregate signature
    #[prost(message, optional, tag = "4")]
    pub signature: Option<PbAggregatedSignature>,
}

/// Wire form of a block certificate
#[derive(Clone, PartialEq, Message)]
pub struct PbBlockCertificate {
    /// Chain id; negative values are invalid
    #[prost(int64, tag = "1")]
    pub chain_id: i64,
    /// Block number
    #[prost(uint64, tag = "2")]
    pub number: u64,
    /// 32-byte block hash
    #[prost(bytes = "vec", tag = "3")]
    pub hash: Vec<u8>,
    /// 32-byte state root
    #[prost(bytes = "vec", tag = "4")]
    pub state_root: Vec<u8>,
    /// Aggregate signature
    #[prost(message, optional, tag = "5")]
    pub signature: Option<PbAggregatedSignature>,
}

fn chain_id_to_wire(chain_id: u64) -> Result<i64, CertError> {
    i64::try_from(chain_id)
        .map_err(|_| CertError::InvalidEncoding(format!("chain id {chain_id} exceeds int64")))
}

fn chain_id_from_wire(chain_id: i64) -> Result<u64, CertError> {
    u64::try_from(chain_id)
        .map_err(|_| CertError::InvalidEncoding(format!("negative chain id {chain_id}")))
}

fn hash_from_wire(bytes: &[u8], field: &str) -> Result<Hash, CertError> {
    if bytes.len() != 32 {
        return Err(CertError::InvalidEncoding(format!(
            "{field} must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(bytes);
    Ok(Hash(arr))
}

fn signature_to_wire<S: super::statement::Statement>(
    sig: &AggregatedSignature<S>,
) -> PbAggregatedSignature {
    PbAggregatedSignature {
        signer_mask: sig.signers().as_bytes().to_vec(),
        signature: sig
            .signature()
            .map(|s| s.to_bytes().to_vec())
            .unwrap_or_default(),
    }
}

fn signature_from_wire<S: super::statement::Statement>(
    pb: Option<PbAggregatedSignature>,
) -> Result<AggregatedSignature<S>, CertError> {
    let pb = match pb {
        Some(pb) => pb,
        None => return Ok(AggregatedSignature::new()),
    };
    let signature = if pb.signature.is_empty() {
        None
    } else {
        if pb.signature.len() != BlsSignature::BYTES {
            return Err(CertError::InvalidEncoding(format!(
                "aggregate signature must be {} bytes, got {}",
                BlsSignature::BYTES,
                pb.signature.len()
            )));
        }
        Some(
            BlsSignature::from_bytes(&pb.signature)
                .map_err(|e| CertError::InvalidEncoding(format!("aggregate signature: {e}")))?,
        )
    };
    Ok(AggregatedSignature::from_parts(
        BitSet::from_bytes(pb.signer_mask),
        signature,
    ))
}

fn member_to_wire(m: &Member) -> PbMember {
    PbMember {
        public_key: m.public_key.to_bytes().to_vec(),
        proof_of_possession: m.proof_of_possession.to_bytes().to_vec(),
        voting_power: m.voting_power,
    }
}

fn member_from_wire(pb: &PbMember) -> Result<Member, CertError> {
    if pb.public_key.len() != BlsPublicKey::BYTES {
        return Err(CertError::InvalidEncoding(format!(
            "member public key must be {} bytes, got {}",
            BlsPublicKey::BYTES,
            pb.public_key.len()
        )));
    }
    if pb.proof_of_possession.len() != ProofOfPossession::BYTES {
        return Err(CertError::InvalidEncoding(format!(
            "member proof of possession must be {} bytes, got {}",
            ProofOfPossession::BYTES,
            pb.proof_of_possession.len()
        )));
    }
    let public_key = BlsPublicKey::from_bytes(&pb.public_key)
        .map_err(|e| CertError::InvalidEncoding(format!("member public key: {e}")))?;
    let proof_of_possession = ProofOfPossession::from_bytes(&pb.proof_of_possession)
        .map_err(|e| CertError::InvalidEncoding(format!("member proof of possession: {e}")))?;
    Ok(Member::new(public_key, proof_of_possession, pb.voting_power))
}

/// Encode a block certificate to protobuf bytes
pub fn encode_block_certificate(cert: &Certificate<BlockStatement>) -> Result<Vec<u8>, CertError> {
    let pb = PbBlockCertificate {
        chain_id: chain_id_to_wire(cert.subject.chain_id)?,
        number: cert.subject.number,
        hash: cert.subject.hash.as_bytes().to_vec(),
        state_root: cert.subject.state_root.as_bytes().to_vec(),
        signature: Some(signature_to_wire(&cert.signature)),
    };
    Ok(pb.encode_to_vec())
}

/// Decode a block certificate from protobuf bytes
pub fn decode_block_certificate(bytes: &[u8]) -> Result<Certificate<BlockStatement>, CertError> {
    let pb = PbBlockCertificate::decode(bytes)
        .map_err(|e| CertError::InvalidEncoding(format!("block certificate: {e}")))?;
    Ok(Certificate {
        subject: BlockStatement {
            chain_id: chain_id_from_wire(pb.chain_id)?,
            number: pb.number,
            hash: hash_from_wire(&pb.hash, "block hash")?,
            state_root: hash_from_wire(&pb.state_root, "state root")?,
        },
        signature: signature_from_wire(pb.signature)?,
    })
}

/// Encode a committee certificate to protobuf bytes
pub fn encode_committee_certificate(
    cert: &Certificate<CommitteeStatement>,
) -> Result<Vec<u8>, CertError> {
    let pb = PbCommitteeCertificate {
        chain_id: chain_id_to_wire(cert.subject.chain_id)?,
        period: cert.subject.period,
        members: cert
            .subject
            .committee
            .members()
            .iter()
            .map(member_to_wire)
            .collect(),
        signature: Some(signature_to_wire(&cert.signature)),
    };
    Ok(pb.encode_to_vec())
}

/// Decode a committee certificate from protobuf bytes
pub fn decode_committee_certificate(
    bytes: &[u8],
) -> Result<Certificate<CommitteeStatement>, CertError> {
    let pb = PbCommitteeCertificate::decode(bytes)
        .map_err(|e| CertError::InvalidEncoding(format!("committee certificate: {e}")))?;
    let members = pb
        .members
        .iter()
        .map(member_from_wire)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Certificate {
        subject: CommitteeStatement {
            chain_id: chain_id_from_wire(pb.chain_id)?,
            period: pb.period,
            committee: Committee::new(members),
        },
        signature: signature_from_wire(pb.signature)?,
    })
}
