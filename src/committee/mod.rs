//! Committee model for the certification chain
//!
//! A committee is the ordered set of validators authorised to sign
//! certificates for one period. Member order is significant: the signer
//! bitmask of an aggregated signature indexes into it.

use crate::crypto::bls::{BlsPublicKey, ProofOfPossession};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Maximum number of members a committee may hold
pub const MAX_COMMITTEE_SIZE: usize = 512;

/// Index of a member inside its committee's order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct MemberId(pub u64);

impl MemberId {
    /// Member index as usize
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MemberId {
    fn from(id: u64) -> Self {
        MemberId(id)
    }
}

/// Committee validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommitteeError {
    #[error("committee has no members")]
    Empty,

    #[error("committee exceeds maximum size of {MAX_COMMITTEE_SIZE} members")]
    TooLarge,

    #[error("duplicate public key at member index {0}")]
    DuplicateKey(usize),

    #[error("invalid public key at member index {0}")]
    InvalidKey(usize),

    #[error("invalid proof of possession at member index {0}")]
    InvalidProofOfPossession(usize),

    #[error("total voting power overflows u64")]
    VotingPowerOverflow,

    #[error("invalid member encoding: {0}")]
    InvalidEncoding(String),
}

/// A single committee member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// BLS public key (48 bytes compressed G1)
    pub public_key: BlsPublicKey,
    /// Proof of possession over the serialized public key
    pub proof_of_possession: ProofOfPossession,
    /// Voting power of this member
    pub voting_power: u64,
}

impl Member {
    /// Fixed serialized size: 48 key + 96 pop + 8 power + 24 reserved
    pub const BYTES: usize = 176;

    /// Create a new member
    pub fn new(
        public_key: BlsPublicKey,
        proof_of_possession: ProofOfPossession,
        voting_power: u64,
    ) -> Self {
        Member {
            public_key,
            proof_of_possession,
            voting_power,
        }
    }

    /// Check the member's key is valid and its proof of possession verifies
    pub fn validate(&self) -> Result<(), CommitteeError> {
        self.public_key
            .validate()
            .map_err(|_| CommitteeError::InvalidKey(0))?;
        if !self.proof_of_possession.verify(&self.public_key) {
            return Err(CommitteeError::InvalidProofOfPossession(0));
        }
        Ok(())
    }

    /// Serialize to the fixed 176-byte record.
    ///
    /// Layout: key(48) ∥ pop(96) ∥ voting_power(8, BE) ∥ reserved(24, zero).
    pub fn serialize(&self) -> [u8; Self::BYTES] {
        let mut out = [0u8; Self::BYTES];
        out[..48].copy_from_slice(&self.public_key.to_bytes());
        out[48..144].copy_from_slice(&self.proof_of_possession.to_bytes());
        out[144..152].copy_from_slice(&self.voting_power.to_be_bytes());
        out
    }

    /// Deserialize from the fixed 176-byte record
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CommitteeError> {
        if bytes.len() != Self::BYTES {
            return Err(CommitteeError::InvalidEncoding(format!(
                "member record must be {} bytes, got {}",
                Self::BYTES,
                bytes.len()
            )));
        }

        let public_key = BlsPublicKey::from_bytes(&bytes[..48])
            .map_err(|e| CommitteeError::InvalidEncoding(format!("public key: {e}")))?;
        let proof_of_possession = ProofOfPossession::from_bytes(&bytes[48..144])
            .map_err(|e| CommitteeError::InvalidEncoding(format!("proof of possession: {e}")))?;
        let mut power_bytes = [0u8; 8];
        power_bytes.copy_from_slice(&bytes[144..152]);
        let voting_power = u64::from_be_bytes(power_bytes);

        Ok(Member {
            public_key,
            proof_of_possession,
            voting_power,
        })
    }
}

/// An ordered committee of validators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committee {
    members: Vec<Member>,
}

impl Committee {
    /// Create a committee from an ordered member list
    pub fn new(members: Vec<Member>) -> Self {
        Committee { members }
    }

    /// Members in committee order
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True if the committee has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Get a member by id
    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.get(id.as_usize())
    }

    /// Find the member id holding `key`, if any
    pub fn member_id_by_key(&self, key: &BlsPublicKey) -> Option<MemberId> {
        self.members
            .iter()
            .position(|m| &m.public_key == key)
            .map(|i| MemberId(i as u64))
    }

    /// Sum of all voting powers.
    ///
    /// Fails if the sum overflows u64; `validate` guarantees it does not
    /// for valid committees.
    pub fn total_voting_power(&self) -> Result<u64, CommitteeError> {
        let mut total: u64 = 0;
        for m in &self.members {
            total = total
                .checked_add(m.voting_power)
                .ok_or(CommitteeError::VotingPowerOverflow)?;
        }
        Ok(total)
    }

    /// Validate the committee:
    /// - at least one member, at most `MAX_COMMITTEE_SIZE`
    /// - no duplicate public keys
    /// - every key valid and every proof of possession verifying
    /// - total voting power fits u64
    pub fn validate(&self) -> Result<(), CommitteeError> {
        if self.members.is_empty() {
            return Err(CommitteeError::Empty);
        }
        if self.members.len() > MAX_COMMITTEE_SIZE {
            return Err(CommitteeError::TooLarge);
        }

        let mut seen = HashSet::with_capacity(self.members.len());
        for (i, m) in self.members.iter().enumerate() {
            if !seen.insert(m.public_key.to_bytes()) {
                return Err(CommitteeError::DuplicateKey(i));
            }
            m.public_key
                .validate()
                .map_err(|_| CommitteeError::InvalidKey(i))?;
            if !m.proof_of_possession.verify(&m.public_key) {
                return Err(CommitteeError::InvalidProofOfPossession(i));
            }
        }

        self.total_voting_power()?;
        Ok(())
    }

    /// Serialize all members as consecutive fixed-width records
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.members.len() * Member::BYTES);
        for m in &self.members {
            out.extend_from_slice(&m.serialize());
        }
        out
    }

    /// Deserialize from consecutive fixed-width member records
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CommitteeError> {
        if bytes.len() % Member::BYTES != 0 {
            return Err(CommitteeError::InvalidEncoding(format!(
                "committee encoding length {} is not a multiple of {}",
                bytes.len(),
                Member::BYTES
            )));
        }
        let members = bytes
            .chunks_exact(Member::BYTES)
            .map(Member::deserialize)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Committee { members })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::bls::BlsKeypair;

    fn member_with_power(power: u64) -> (BlsKeypair, Member) {
        let kp = BlsKeypair::generate().unwrap();
        let m = Member::new(*kp.public_key(), *kp.proof_of_possession(), power);
        (kp, m)
    }

    #[test]
    fn test_valid_committee() {
        let (_k1, m1) = member_with_power(10);
        let (_k2, m2) = member_with_power(20);
        let committee = Committee::new(vec![m1, m2]);

        committee.validate().unwrap();
        assert_eq!(committee.total_voting_power().unwrap(), 30);
    }

    #[test]
    fn test_empty_committee_rejected() {
        let committee = Committee::new(vec![]);
        assert!(matches!(committee.validate(), Err(CommitteeError::Empty)));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let (_k, m) = member_with_power(10);
        let committee = Committee::new(vec![m.clone(), m]);
        assert!(matches!(
            committee.validate(),
            Err(CommitteeError::DuplicateKey(1))
        ));
    }

    #[test]
    fn test_wrong_pop_rejected() {
        let (_k1, mut m1) = member_with_power(10);
        let (k2, _m2) = member_with_power(10);
        m1.proof_of_possession = *k2.proof_of_possession();

        let committee = Committee::new(vec![m1]);
        assert!(matches!(
            committee.validate(),
            Err(CommitteeError::InvalidProofOfPossession(0))
        ));
    }

    #[test]
    fn test_voting_power_overflow_rejected() {
        let (_k1, m1) = member_with_power(u64::MAX);
        let (_k2, m2) = member_with_power(1);
        let committee = Committee::new(vec![m1, m2]);
        assert!(matches!(
            committee.validate(),
            Err(CommitteeError::VotingPowerOverflow)
        ));
    }

    #[test]
    fn test_member_serialization_round_trip() {
        let (_k, m) = member_with_power(123_456);
        let bytes = m.serialize();
        assert_eq!(bytes.len(), 176);

        let restored = Member::deserialize(&bytes).unwrap();
        assert_eq!(m, restored);
        assert_eq!(restored.voting_power, 123_456);

        // The reserved tail is zero
        assert!(bytes[152..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_committee_serialization_round_trip() {
        let (_k1, m1) = member_with_power(1);
        let (_k2, m2) = member_with_power(2);
        let committee = Committee::new(vec![m1, m2]);

        let bytes = committee.serialize();
        let restored = Committee::deserialize(&bytes).unwrap();
        assert_eq!(committee, restored);
    }

    #[test]
    fn test_member_deserialize_bad_length() {
        assert!(Member::deserialize(&[0u8; 100]).is_err());
        assert!(Committee::deserialize(&[0u8; 177]).is_err());
    }

    #[test]
    fn test_member_lookup() {
        let (k1, m1) = member_with_power(1);
        let (_k2, m2) = member_with_power(2);
        let committee = Committee::new(vec![m1, m2]);

        assert_eq!(
            committee.member_id_by_key(k1.public_key()),
            Some(MemberId(0))
        );
        assert_eq!(committee.member(MemberId(1)).unwrap().voting_power, 2);
        assert!(committee.member(MemberId(2)).is_none());
    }
}
