//! Aggregated certificates over statements
//!
//! Signatures are collected one at a time into an [`AggregatedSignature`];
//! the signer bitmask indexes into the *producer* committee. Verification
//! takes a second, *authority* committee whose 2/3 voting power forms the
//! threshold, so a certificate signed under committee N can be checked
//! against committee N-1 as long as each signer is a member of both.

use super::bitset::BitSet;
use super::statement::Statement;
use crate::committee::{Committee, CommitteeError, MemberId};
use crate::crypto::bls::{BlsError, BlsPublicKey, BlsSignature};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Certificate errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum CertError {
    #[error("member {0} already signed")]
    DuplicateSigner(MemberId),

    #[error("signer {0} is not a member of the producer committee")]
    UnknownSigner(MemberId),

    #[error("insufficient voting power: {signed} of {total}")]
    InsufficientVotingPower { signed: u64, total: u64 },

    #[error("invalid aggregated signature")]
    InvalidAggregatedSignature,

    #[error("committee validation failed: {0}")]
    InvalidCommittee(#[from] CommitteeError),

    #[error("bls operation failed: {0}")]
    Bls(#[from] BlsError),

    #[error("invalid certificate encoding: {0}")]
    InvalidEncoding(String),
}

/// Aggregate BLS signature plus the bitmask of members who contributed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedSignature<S: Statement> {
    signers: BitSet,
    signature: Option<BlsSignature>,
    #[serde(skip)]
    _kind: PhantomData<S>,
}

impl<S: Statement> Default for AggregatedSignature<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Statement> AggregatedSignature<S> {
    /// Create an empty aggregate with no signers
    pub fn new() -> Self {
        AggregatedSignature {
            signers: BitSet::new(),
            signature: None,
            _kind: PhantomData,
        }
    }

    /// Reassemble from wire parts
    pub fn from_parts(signers: BitSet, signature: Option<BlsSignature>) -> Self {
        AggregatedSignature {
            signers,
            signature,
            _kind: PhantomData,
        }
    }

    /// Signer bitmask over the producer committee
    pub fn signers(&self) -> &BitSet {
        &self.signers
    }

    /// The aggregate signature, if any signer contributed yet
    pub fn signature(&self) -> Option<&BlsSignature> {
        self.signature.as_ref()
    }

    /// Add one member's signature to the aggregate.
    ///
    /// Fails if the member already signed; the aggregate is unchanged in
    /// that case.
    pub fn add(&mut self, member: MemberId, sig: BlsSignature) -> Result<(), CertError> {
        if !self.signers.insert(member) {
            return Err(CertError::DuplicateSigner(member));
        }
        self.signature = Some(match &self.signature {
            None => sig,
            Some(current) => BlsSignature::aggregate(&[current, &sig])?,
        });
        Ok(())
    }

    /// Verify the aggregate over `subject`.
    ///
    /// `producers` resolves the signer bitmask to public keys; `authority`
    /// supplies the voting power that must exceed the strict 2/3 threshold.
    /// A signer missing from the authority contributes its signature but no
    /// power.
    pub fn verify(
        &self,
        authority: &Committee,
        producers: &Committee,
        subject: &S,
    ) -> Result<(), CertError> {
        // A producer set that fails validation would admit rogue keys.
        producers.validate()?;

        let total = authority.total_voting_power()?;

        let mut signer_keys: Vec<&BlsPublicKey> = Vec::with_capacity(self.signers.count());
        let mut signed_power: u64 = 0;
        for id in self.signers.iter() {
            let member = producers.member(id).ok_or(CertError::UnknownSigner(id))?;
            signer_keys.push(&member.public_key);
            if let Some(auth_id) = authority.member_id_by_key(&member.public_key) {
                // Power always comes from the authority's ledger, not the
                // producer's.
                signed_power = signed_power.saturating_add(
                    authority
                        .member(auth_id)
                        .map(|m| m.voting_power)
                        .unwrap_or(0),
                );
            }
        }

        if 3 * (signed_power as u128) <= 2 * (total as u128) {
            return Err(CertError::InsufficientVotingPower {
                signed: signed_power,
                total,
            });
        }

        let signature = self
            .signature
            .as_ref()
            .ok_or(CertError::InvalidAggregatedSignature)?;
        if !signature.verify_all(&signer_keys, &subject.data_to_sign(), S::dst()) {
            return Err(CertError::InvalidAggregatedSignature);
        }
        Ok(())
    }
}

/// A statement together with its aggregate signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate<S: Statement> {
    /// The certified statement
    pub subject: S,
    /// Aggregate signature over the subject
    pub signature: AggregatedSignature<S>,
}

impl<S: Statement> Certificate<S> {
    /// Create an unsigned certificate for `subject`
    pub fn new(subject: S) -> Self {
        Certificate {
            subject,
            signature: AggregatedSignature::new(),
        }
    }

    /// Add one member's signature
    pub fn add(&mut self, member: MemberId, sig: BlsSignature) -> Result<(), CertError> {
        self.signature.add(member, sig)
    }

    /// Verify against an authority and a producer committee
    pub fn verify(&self, authority: &Committee, producers: &Committee) -> Result<(), CertError> {
        self.signature.verify(authority, producers, &self.subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::statement::BlockStatement;
    use crate::committee::Member;
    use crate::crypto::bls::BlsKeypair;
    use crate::crypto::Hash;

    fn unit_committee(n: usize) -> (Vec<BlsKeypair>, Committee) {
        let keypairs: Vec<BlsKeypair> = (0..n).map(|_| BlsKeypair::generate().unwrap()).collect();
        let members = keypairs
            .iter()
            .map(|kp| Member::new(*kp.public_key(), *kp.proof_of_possession(), 1))
            .collect();
        (keypairs, Committee::new(members))
    }

    fn subject() -> BlockStatement {
        BlockStatement {
            chain_id: 250,
            number: 42,
            hash: Hash::hash(b"block 42"),
            state_root: Hash::hash(b"root 42"),
        }
    }

    fn sign(kp: &BlsKeypair, s: &BlockStatement) -> BlsSignature {
        kp.sign(&s.data_to_sign(), BlockStatement::dst())
    }

    #[test]
    fn test_two_thirds_threshold_is_strict() {
        // 4 of 6 unit-weight members is not > 2/3; 5 of 6 is.
        let (keypairs, committee) = unit_committee(6);
        let s = subject();

        let mut cert = Certificate::new(s.clone());
        for (i, kp) in keypairs.iter().take(4).enumerate() {
            cert.add(MemberId(i as u64), sign(kp, &s)).unwrap();
        }
        assert!(matches!(
            cert.verify(&committee, &committee),
            Err(CertError::InsufficientVotingPower { signed: 4, total: 6 })
        ));

        cert.add(MemberId(4), sign(&keypairs[4], &s)).unwrap();
        cert.verify(&committee, &committee).unwrap();
    }

    #[test]
    fn test_duplicate_signer_rejected() {
        let (keypairs, _committee) = unit_committee(2);
        let s = subject();

        let mut agg: AggregatedSignature<BlockStatement> = AggregatedSignature::new();
        agg.add(MemberId(0), sign(&keypairs[0], &s)).unwrap();
        let err = agg.add(MemberId(0), sign(&keypairs[0], &s));
        assert!(matches!(err, Err(CertError::DuplicateSigner(MemberId(0)))));
        assert_eq!(agg.signers().count(), 1);
    }

    #[test]
    fn test_verification_monotone_in_signers() {
        let (keypairs, committee) = unit_committee(4);
        let s = subject();

        let mut cert = Certificate::new(s.clone());
        for (i, kp) in keypairs.iter().take(3).enumerate() {
            cert.add(MemberId(i as u64), sign(kp, &s)).unwrap();
        }
        cert.verify(&committee, &committee).unwrap();

        // One more valid signature never turns a verified certificate
        // into an unverified one.
        cert.add(MemberId(3), sign(&keypairs[3], &s)).unwrap();
        cert.verify(&committee, &committee).unwrap();
    }

    #[test]
    fn test_wrong_message_signature_fails() {
        let (keypairs, committee) = unit_committee(1);
        let s = subject();

        let mut cert = Certificate::new(s);
        let other = BlockStatement {
            number: 43,
            ..subject()
        };
        cert.add(MemberId(0), sign(&keypairs[0], &other)).unwrap();

        assert!(matches!(
            cert.verify(&committee, &committee),
            Err(CertError::InvalidAggregatedSignature)
        ));
    }

    #[test]
    fn test_unknown_signer_rejected() {
        let (keypairs, committee) = unit_committee(2);
        let s = subject();

        let mut cert = Certificate::new(s.clone());
        cert.add(MemberId(7), sign(&keypairs[0], &s)).unwrap();

        assert!(matches!(
            cert.verify(&committee, &committee),
            Err(CertError::UnknownSigner(MemberId(7)))
        ));
    }

    #[test]
    fn test_cross_committee_verification() {
        // Certificate produced under committee N, verified against an
        // authority of committee N-1 that shares the signers.
        let (keypairs, producers) = unit_committee(3);
        let s = subject();

        // Authority has the same members with different powers.
        let authority = Committee::new(
            keypairs
                .iter()
                .map(|kp| Member::new(*kp.public_key(), *kp.proof_of_possession(), 10))
                .collect(),
        );

        let mut cert = Certificate::new(s.clone());
        for (i, kp) in keypairs.iter().enumerate() {
            cert.add(MemberId(i as u64), sign(kp, &s)).unwrap();
        }
        cert.verify(&authority, &producers).unwrap();
    }

    #[test]
    fn test_empty_aggregate_fails() {
        let (_keypairs, committee) = unit_committee(1);
        let cert = Certificate::new(subject());
        assert!(cert.verify(&committee, &committee).is_err());
    }
}
