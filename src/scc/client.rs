//! Light-client state synchronisation
//!
//! A light client holds one trusted committee and folds forward period by
//! period: each committee certificate is verified with the committee the
//! client already trusts before the embedded committee is adopted. The
//! head block certificate is verified last, with the final committee. Any
//! failure aborts the sync without mutating the state.

use super::provider::{BlockQuery, PeriodQuery, Provider, ProviderError};
use super::{get_period, PERIOD_LENGTH};
use crate::cert::CertError;
use crate::committee::{Committee, CommitteeError};
use crate::crypto::Hash;
use crate::rpc::types::MAX_CERTIFICATE_BATCH;
use crate::BlockNumber;
use tracing::{debug, info};

/// Light-client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Certificate(#[from] CertError),

    #[error("committee validation failed: {0}")]
    Committee(#[from] CommitteeError),

    #[error("head would regress from {current} to {offered}")]
    HeadRegress { current: u64, offered: u64 },

    #[error("unexpected committee period: expected {expected}, got {got}")]
    UnexpectedPeriod { expected: u64, got: u64 },

    #[error("certificate chain id {got} does not match {expected}")]
    WrongChainId { expected: u64, got: u64 },
}

/// Verified view of the certified chain held by a light client
#[derive(Debug, Clone)]
pub struct LightClientState {
    chain_id: u64,
    committee: Committee,
    period: u64,
    head_number: BlockNumber,
    head_hash: Hash,
    head_root: Hash,
    has_synced: bool,
}

impl LightClientState {
    /// Start from a trusted genesis committee for period 0
    pub fn new(chain_id: u64, genesis_committee: Committee) -> Result<Self, ClientError> {
        genesis_committee.validate()?;
        Ok(LightClientState {
            chain_id,
            committee: genesis_committee,
            period: 0,
            head_number: 0,
            head_hash: Hash::zero(),
            head_root: Hash::zero(),
            has_synced: false,
        })
    }

    /// Chain id the client follows
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Currently trusted committee
    pub fn committee(&self) -> &Committee {
        &self.committee
    }

    /// Period the trusted committee belongs to
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Verified head block number
    pub fn head_number(&self) -> BlockNumber {
        self.head_number
    }

    /// Verified head block hash
    pub fn head_hash(&self) -> Hash {
        self.head_hash
    }

    /// Verified head state root
    pub fn head_root(&self) -> Hash {
        self.head_root
    }

    /// True once a sync has completed
    pub fn has_synced(&self) -> bool {
        self.has_synced
    }

    /// Synchronise to the provider's head.
    ///
    /// All-or-nothing: the state is only mutated after the full chain of
    /// custody up to the head certificate verified.
    pub async fn sync(&mut self, provider: &dyn Provider) -> Result<BlockNumber, ClientError> {
        let head_certs = provider
            .get_block_certificates(BlockQuery::Latest, 1)
            .await?;
        let head_cert = head_certs.first().ok_or(ProviderError::NoBlockCertificates)?;

        if head_cert.subject.chain_id != self.chain_id {
            return Err(ClientError::WrongChainId {
                expected: self.chain_id,
                got: head_cert.subject.chain_id,
            });
        }
        if head_cert.subject.number <= self.head_number {
            return Err(ClientError::HeadRegress {
                current: self.head_number,
                offered: head_cert.subject.number,
            });
        }

        let target_period = get_period(head_cert.subject.number);

        // Stage all progress locally; commit only after the head verifies.
        let mut committee = self.committee.clone();
        let mut period = self.period;

        while period < target_period {
            let remaining = target_period - period;
            let batch = remaining.min(MAX_CERTIFICATE_BATCH);
            let certs = provider
                .get_committee_certificates(PeriodQuery::Number(period + 1), batch)
                .await?;

            for cert in certs {
                let expected = period + 1;
                if cert.subject.period != expected {
                    return Err(ClientError::UnexpectedPeriod {
                        expected,
                        got: cert.subject.period,
                    });
                }
                if cert.subject.chain_id != self.chain_id {
                    return Err(ClientError::WrongChainId {
                        expected: self.chain_id,
                        got: cert.subject.chain_id,
                    });
                }
                cert.subject.committee.validate()?;
                // The committee the client already trusts is the
                // authority; the embedded committee resolves the signer
                // bitmask.
                cert.verify(&committee, &cert.subject.committee)?;

                committee = cert.subject.committee.clone();
                period = expected;
                debug!(period, "adopted committee");
            }
        }

        head_cert.verify(&committee, &committee)?;

        self.committee = committee;
        self.period = period;
        self.head_number = head_cert.subject.number;
        self.head_hash = head_cert.subject.hash;
        self.head_root = head_cert.subject.state_root;
        self.has_synced = true;

        info!(
            head = self.head_number,
            period = self.period,
            "light client synced"
        );
        Ok(self.head_number)
    }

    /// Blocks of the current period still uncertified ahead of the head
    pub fn blocks_until_next_period(&self) -> u64 {
        PERIOD_LENGTH - (self.head_number % PERIOD_LENGTH)
    }
}
