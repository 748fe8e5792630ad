//! RPC request/response types and literal parsing
//!
//! Numeric parameters accept decimal, `0x` hex, `0b` binary or
//! leading-zero octal, plus the sentinels `"latest"` (block/period
//! selectors) and `"max"` (result counts). Certificates travel as
//! camelCase JSON with hex-encoded fixed-width fields.

use crate::cert::{
    AggregatedSignature, BitSet, BlockCertificate, BlockStatement, CertError,
    CommitteeCertificate, CommitteeStatement, Statement,
};
use crate::committee::{Committee, Member};
use crate::crypto::bls::{BlsPublicKey, BlsSignature, ProofOfPossession};
use crate::crypto::Hash;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Ceiling on certificate batch sizes served per request
pub const MAX_CERTIFICATE_BATCH: u64 = 128;

/// Parse a numeric literal: decimal, `0x` hex, `0b` binary or
/// leading-zero octal
pub fn parse_numeric(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty numeric literal".to_string());
    }
    let (radix, digits) = if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
    {
        (16, rest)
    } else if let Some(rest) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        (2, rest)
    } else if s != "0" && s.starts_with('0') {
        (8, &s[1..])
    } else {
        (10, s)
    };
    u64::from_str_radix(digits, radix).map_err(|e| format!("invalid numeric literal {s:?}: {e}"))
}

/// Block or period selector: a number or `"latest"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockNumberArg {
    /// The current head
    Latest,
    /// An explicit number
    Number(u64),
}

impl<'de> Deserialize<'de> for BlockNumberArg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ArgVisitor;

        impl<'de> serde::de::Visitor<'de> for ArgVisitor {
            type Value = BlockNumberArg;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a number, a numeric string, or \"latest\"")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(BlockNumberArg::Number(v))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v.eq_ignore_ascii_case("latest") {
                    return Ok(BlockNumberArg::Latest);
                }
                parse_numeric(v)
                    .map(BlockNumberArg::Number)
                    .map_err(E::custom)
            }
        }

        deserializer.deserialize_any(ArgVisitor)
    }
}

impl Serialize for BlockNumberArg {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BlockNumberArg::Latest => serializer.serialize_str("latest"),
            BlockNumberArg::Number(n) => serializer.serialize_u64(*n),
        }
    }
}

/// Result count: a number or `"max"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountArg {
    /// As many as the server allows
    Max,
    /// An explicit count
    Count(u64),
}

impl CountArg {
    /// Resolve against the server batch ceiling
    pub fn resolve(&self) -> u64 {
        match self {
            CountArg::Max => MAX_CERTIFICATE_BATCH,
            CountArg::Count(n) => (*n).min(MAX_CERTIFICATE_BATCH),
        }
    }
}

impl<'de> Deserialize<'de> for CountArg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ArgVisitor;

        impl<'de> serde::de::Visitor<'de> for ArgVisitor {
            type Value = CountArg;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a number, a numeric string, or \"max\"")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(CountArg::Count(v))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v.eq_ignore_ascii_case("max") {
                    return Ok(CountArg::Max);
                }
                parse_numeric(v).map(CountArg::Count).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(ArgVisitor)
    }
}

impl Serialize for CountArg {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CountArg::Max => serializer.serialize_str("max"),
            CountArg::Count(n) => serializer.serialize_u64(*n),
        }
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn decode_hex(s: &str, field: &str) -> Result<Vec<u8>, CertError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped)
        .map_err(|e| CertError::InvalidEncoding(format!("{field}: invalid hex: {e}")))
}

fn decode_hash(s: &str, field: &str) -> Result<Hash, CertError> {
    let bytes = decode_hex(s, field)?;
    if bytes.len() != 32 {
        return Err(CertError::InvalidEncoding(format!(
            "{field} must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(Hash(arr))
}

/// Aggregated signature over the wire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RpcAggregatedSignature {
    /// Hex-encoded signer bitmask
    pub signers: String,
    /// Hex-encoded 96-byte aggregate signature; empty when unsigned
    pub signature: String,
}

impl RpcAggregatedSignature {
    fn from_domain<S: Statement>(sig: &AggregatedSignature<S>) -> Self {
        RpcAggregatedSignature {
            signers: encode_hex(sig.signers().as_bytes()),
            signature: sig
                .signature()
                .map(|s| encode_hex(&s.to_bytes()))
                .unwrap_or_else(|| "0x".to_string()),
        }
    }

    fn to_domain<S: Statement>(&self) -> Result<AggregatedSignature<S>, CertError> {
        let mask = decode_hex(&self.signers, "signer mask")?;
        let sig_bytes = decode_hex(&self.signature, "aggregate signature")?;
        let signature = if sig_bytes.is_empty() {
            None
        } else {
            Some(BlsSignature::from_bytes(&sig_bytes).map_err(|e| {
                CertError::InvalidEncoding(format!("aggregate signature: {e}"))
            })?)
        };
        Ok(AggregatedSignature::from_parts(
            BitSet::from_bytes(mask),
            signature,
        ))
    }
}

/// Committee member over the wire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RpcMember {
    /// Hex-encoded 48-byte public key
    pub public_key: String,
    /// Hex-encoded 96-byte proof of possession
    pub proof_of_possession: String,
    /// Voting power
    pub voting_power: u64,
}

impl RpcMember {
    fn from_domain(m: &Member) -> Self {
        RpcMember {
            public_key: encode_hex(&m.public_key.to_bytes()),
            proof_of_possession: encode_hex(&m.proof_of_possession.to_bytes()),
            voting_power: m.voting_power,
        }
    }

    fn to_domain(&self) -> Result<Member, CertError> {
        let key = decode_hex(&self.public_key, "member public key")?;
        let pop = decode_hex(&self.proof_of_possession, "member proof of possession")?;
        Ok(Member::new(
            BlsPublicKey::from_bytes(&key)
                .map_err(|e| CertError::InvalidEncoding(format!("member public key: {e}")))?,
            ProofOfPossession::from_bytes(&pop).map_err(|e| {
                CertError::InvalidEncoding(format!("member proof of possession: {e}"))
            })?,
            self.voting_power,
        ))
    }
}

/// Block certificate over the wire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlockCertificate {
    /// Chain id
    pub chain_id: u64,
    /// Block number
    pub number: u64,
    /// Hex-encoded block hash
    pub hash: String,
    /// Hex-encoded state root
    pub state_root: String,
    /// Aggregate signature
    pub signature: RpcAggregatedSignature,
}

impl RpcBlockCertificate {
    /// Convert from the domain certificate
    pub fn from_domain(cert: &BlockCertificate) -> Self {
        RpcBlockCertificate {
            chain_id: cert.subject.chain_id,
            number: cert.subject.number,
            hash: encode_hex(cert.subject.hash.as_bytes()),
            state_root: encode_hex(cert.subject.state_root.as_bytes()),
            signature: RpcAggregatedSignature::from_domain(&cert.signature),
        }
    }

    /// Convert into the domain certificate
    pub fn to_domain(&self) -> Result<BlockCertificate, CertError> {
        Ok(BlockCertificate {
            subject: BlockStatement {
                chain_id: self.chain_id,
                number: self.number,
                hash: decode_hash(&self.hash, "block hash")?,
                state_root: decode_hash(&self.state_root, "state root")?,
            },
            signature: self.signature.to_domain()?,
        })
    }
}

/// Committee certificate over the wire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RpcCommitteeCertificate {
    /// Chain id
    pub chain_id: u64,
    /// Certified period
    pub period: u64,
    /// Committee members in order
    pub members: Vec<RpcMember>,
    /// Aggregate signature
    pub signature: RpcAggregatedSignature,
}

impl RpcCommitteeCertificate {
    /// Convert from the domain certificate
    pub fn from_domain(cert: &CommitteeCertificate) -> Self {
        RpcCommitteeCertificate {
            chain_id: cert.subject.chain_id,
            period: cert.subject.period,
            members: cert
                .subject
                .committee
                .members()
                .iter()
                .map(RpcMember::from_domain)
                .collect(),
            signature: RpcAggregatedSignature::from_domain(&cert.signature),
        }
    }

    /// Convert into the domain certificate
    pub fn to_domain(&self) -> Result<CommitteeCertificate, CertError> {
        let members = self
            .members
            .iter()
            .map(RpcMember::to_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CommitteeCertificate {
            subject: CommitteeStatement {
                chain_id: self.chain_id,
                period: self.period,
                committee: Committee::new(members),
            },
            signature: self.signature.to_domain()?,
        })
    }
}

/// One storage slot witness of `eth_getProof`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RpcStorageProof {
    /// Hex-encoded storage key
    pub key: String,
    /// Hex-encoded stored value
    pub value: String,
    /// Hex-encoded proof nodes from the storage root to the slot
    pub proof: Vec<String>,
}

/// `eth_getProof` response: account and storage witnesses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RpcProof {
    /// Hex-encoded state root the proof anchors to
    pub state_root: String,
    /// Hex-encoded proof nodes from the state root to the account
    pub account_proof: Vec<String>,
    /// Hex-encoded account balance
    pub balance: String,
    /// Account nonce
    pub nonce: u64,
    /// Hex-encoded storage root of the account
    pub storage_hash: String,
    /// Storage slot witnesses
    pub storage_proof: Vec<RpcStorageProof>,
}

/// Rules snapshot over the wire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RpcRules {
    /// Network name
    pub name: String,
    /// Current epoch the snapshot applies to
    pub epoch: u64,
    /// The rules themselves
    pub rules: crate::epoch::Rules,
    /// True if a deferred change is pending for the next epoch
    pub has_pending_change: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::Certificate;
    use crate::committee::MemberId;
    use crate::crypto::bls::BlsKeypair;

    #[test]
    fn test_parse_numeric_radices() {
        assert_eq!(parse_numeric("42").unwrap(), 42);
        assert_eq!(parse_numeric("0x10").unwrap(), 16);
        assert_eq!(parse_numeric("0X10").unwrap(), 16);
        assert_eq!(parse_numeric("0b101").unwrap(), 5);
        assert_eq!(parse_numeric("010").unwrap(), 8);
        assert_eq!(parse_numeric("0").unwrap(), 0);
        assert!(parse_numeric("").is_err());
        assert!(parse_numeric("0xzz").is_err());
    }

    #[test]
    fn test_block_number_arg_deserialize() {
        let latest: BlockNumberArg = serde_json::from_str("\"latest\"").unwrap();
        assert_eq!(latest, BlockNumberArg::Latest);

        let n: BlockNumberArg = serde_json::from_str("17").unwrap();
        assert_eq!(n, BlockNumberArg::Number(17));

        let hex: BlockNumberArg = serde_json::from_str("\"0x11\"").unwrap();
        assert_eq!(hex, BlockNumberArg::Number(17));
    }

    #[test]
    fn test_count_arg_resolution() {
        let max: CountArg = serde_json::from_str("\"max\"").unwrap();
        assert_eq!(max.resolve(), MAX_CERTIFICATE_BATCH);

        let small: CountArg = serde_json::from_str("5").unwrap();
        assert_eq!(small.resolve(), 5);

        let big: CountArg = serde_json::from_str("1000").unwrap();
        assert_eq!(big.resolve(), MAX_CERTIFICATE_BATCH);
    }

    #[test]
    fn test_block_certificate_wire_round_trip() {
        let kp = BlsKeypair::generate().unwrap();
        let subject = BlockStatement {
            chain_id: 250,
            number: 1025,
            hash: Hash::hash(b"h"),
            state_root: Hash::hash(b"r"),
        };
        let mut cert = Certificate::new(subject.clone());
        cert.add(
            MemberId(0),
            kp.sign(&subject.data_to_sign(), BlockStatement::dst()),
        )
        .unwrap();

        let wire = RpcBlockCertificate::from_domain(&cert);
        let json = serde_json::to_string(&wire).unwrap();
        let parsed: RpcBlockCertificate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.to_domain().unwrap(), cert);
    }

    #[test]
    fn test_committee_certificate_wire_round_trip() {
        let kp = BlsKeypair::generate().unwrap();
        let committee = Committee::new(vec![Member::new(
            *kp.public_key(),
            *kp.proof_of_possession(),
            3,
        )]);
        let cert = Certificate::new(CommitteeStatement {
            chain_id: 250,
            period: 2,
            committee,
        });

        let wire = RpcCommitteeCertificate::from_domain(&cert);
        let json = serde_json::to_string(&wire).unwrap();
        let parsed: RpcCommitteeCertificate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.to_domain().unwrap(), cert);
    }

    #[test]
    fn test_bad_hash_rejected() {
        let wire = RpcBlockCertificate {
            chain_id: 1,
            number: 1,
            hash: "0x1234".to_string(),
            state_root: encode_hex(&[0u8; 32]),
            signature: RpcAggregatedSignature {
                signers: "0x".to_string(),
                signature: "0x".to_string(),
            },
        };
        assert!(wire.to_domain().is_err());
    }
}
