//! Certificate providers for light-client synchronisation
//!
//! A [`Provider`] serves certificates and state witnesses. The plain
//! [`HttpProvider`] is a thin RPC client; [`Multiplexer`] fans a call out
//! over several providers and returns the first success; [`RetryProvider`]
//! wraps one provider with bounded retries and exponential backoff.

use crate::cert::{BlockCertificate, CommitteeCertificate};
use crate::rpc::types::{BlockNumberArg, RpcBlockCertificate, RpcCommitteeCertificate, RpcProof};
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Block selector for certificate queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockQuery {
    /// The head block
    Latest,
    /// An explicit block number
    Number(u64),
}

/// Period selector for certificate queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodQuery {
    /// The latest certified period
    Latest,
    /// An explicit period
    Number(u64),
}

/// Provider errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("rpc call failed: {0}")]
    Rpc(String),

    #[error("exceeded timeout")]
    Timeout,

    #[error("no block certificates found")]
    NoBlockCertificates,

    #[error("no committee certificates found")]
    NoCommitteeCertificates,

    #[error("block certificates out of order")]
    BlockCertificatesOutOfOrder,

    #[error("committee certificates out of order")]
    CommitteeCertificatesOutOfOrder,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("all providers failed: {0}")]
    AllProvidersFailed(String),

    #[error("retries exhausted: {0}")]
    RetriesExhausted(String),
}

/// Source of certificates and state witnesses
#[async_trait]
pub trait Provider: Send + Sync {
    /// Block certificates starting at `first`, at most `max_results`.
    /// `Latest` yields exactly the head certificate.
    async fn get_block_certificates(
        &self,
        first: BlockQuery,
        max_results: u64,
    ) -> Result<Vec<BlockCertificate>, ProviderError>;

    /// Committee certificates starting at `first`, at most `max_results`
    async fn get_committee_certificates(
        &self,
        first: PeriodQuery,
        max_results: u64,
    ) -> Result<Vec<CommitteeCertificate>, ProviderError>;

    /// Account and storage witness for `address` at `block`
    async fn get_proof(
        &self,
        address: Address,
        keys: &[B256],
        block: BlockNumberArg,
    ) -> Result<RpcProof, ProviderError>;

    /// Release any transport resources
    async fn close(&self);
}

/// Check certificates are consecutive (by the projected key) and start at
/// the requested position; truncate entries beyond `max`.
fn validate_sequence<C>(
    mut certs: Vec<C>,
    first: Option<u64>,
    max: u64,
    key: impl Fn(&C) -> u64,
    out_of_order: ProviderError,
) -> Result<Vec<C>, ProviderError> {
    if certs.len() as u64 > max {
        certs.truncate(max as usize);
    }
    if let (Some(first), Some(head)) = (first, certs.first()) {
        if key(head) != first {
            return Err(out_of_order);
        }
    }
    for pair in certs.windows(2) {
        if key(&pair[1]) != key(&pair[0]) + 1 {
            return Err(out_of_order);
        }
    }
    Ok(certs)
}

/// Thin RPC client provider speaking to a node's `sonic_*` endpoints
pub struct HttpProvider {
    client: HttpClient,
    url: String,
}

impl HttpProvider {
    /// Connect to a node RPC endpoint
    pub fn new(url: &str) -> Result<Self, ProviderError> {
        let client = HttpClientBuilder::default()
            .build(url)
            .map_err(|e| ProviderError::Rpc(e.to_string()))?;
        Ok(HttpProvider {
            client,
            url: url.to_string(),
        })
    }

    /// The endpoint this provider talks to
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn get_block_certificates(
        &self,
        first: BlockQuery,
        max_results: u64,
    ) -> Result<Vec<BlockCertificate>, ProviderError> {
        let first_param = match first {
            BlockQuery::Latest => serde_json::json!("latest"),
            BlockQuery::Number(n) => serde_json::json!(n),
        };
        let wire: Vec<RpcBlockCertificate> = self
            .client
            .request(
                "sonic_getBlockCertificates",
                rpc_params![first_param, max_results],
            )
            .await
            .map_err(|e| ProviderError::Rpc(e.to_string()))?;

        let certs = wire
            .iter()
            .map(|c| c.to_domain())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        if certs.is_empty() {
            return Err(ProviderError::NoBlockCertificates);
        }

        let first_number = match first {
            BlockQuery::Latest => None,
            BlockQuery::Number(n) => Some(n),
        };
        validate_sequence(
            certs,
            first_number,
            max_results,
            |c| c.subject.number,
            ProviderError::BlockCertificatesOutOfOrder,
        )
    }

    async fn get_committee_certificates(
        &self,
        first: PeriodQuery,
        max_results: u64,
    ) -> Result<Vec<CommitteeCertificate>, ProviderError> {
        let first_param = match first {
            PeriodQuery::Latest => serde_json::json!("latest"),
            PeriodQuery::Number(n) => serde_json::json!(n),
        };
        let wire: Vec<RpcCommitteeCertificate> = self
            .client
            .request(
                "sonic_getCommitteeCertificates",
                rpc_params![first_param, max_results],
            )
            .await
            .map_err(|e| ProviderError::Rpc(e.to_string()))?;

        let certs = wire
            .iter()
            .map(|c| c.to_domain())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        if certs.is_empty() {
            return Err(ProviderError::NoCommitteeCertificates);
        }

        let first_period = match first {
            PeriodQuery::Latest => None,
            PeriodQuery::Number(p) => Some(p),
        };
        validate_sequence(
            certs,
            first_period,
            max_results,
            |c| c.subject.period,
            ProviderError::CommitteeCertificatesOutOfOrder,
        )
    }

    async fn get_proof(
        &self,
        address: Address,
        keys: &[B256],
        block: BlockNumberArg,
    ) -> Result<RpcProof, ProviderError> {
        let keys: Vec<String> = keys.iter().map(|k| format!("{k}")).collect();
        self.client
            .request(
                "eth_getProof",
                rpc_params![format!("{address}"), keys, block],
            )
            .await
            .map_err(|e| ProviderError::Rpc(e.to_string()))
    }

    async fn close(&self) {}
}

/// First-success fan-out over a list of providers
pub struct Multiplexer {
    providers: Vec<Box<dyn Provider>>,
}

impl Multiplexer {
    /// Create from an ordered provider list; earlier entries are tried
    /// first
    pub fn new(providers: Vec<Box<dyn Provider>>) -> Self {
        Multiplexer { providers }
    }
}

macro_rules! multiplex {
    ($self:ident, $call:ident ( $($arg:expr),* )) => {{
        let mut errors: Vec<String> = Vec::new();
        for provider in &$self.providers {
            match provider.$call($($arg),*).await {
                Ok(result) => return Ok(result),
                Err(err) => errors.push(err.to_string()),
            }
        }
        Err(ProviderError::AllProvidersFailed(errors.join("; ")))
    }};
}

#[async_trait]
impl Provider for Multiplexer {
    async fn get_block_certificates(
        &self,
        first: BlockQuery,
        max_results: u64,
    ) -> Result<Vec<BlockCertificate>, ProviderError> {
        multiplex!(self, get_block_certificates(first, max_results))
    }

    async fn get_committee_certificates(
        &self,
        first: PeriodQuery,
        max_results: u64,
    ) -> Result<Vec<CommitteeCertificate>, ProviderError> {
        multiplex!(self, get_committee_certificates(first, max_results))
    }

    async fn get_proof(
        &self,
        address: Address,
        keys: &[B256],
        block: BlockNumberArg,
    ) -> Result<RpcProof, ProviderError> {
        multiplex!(self, get_proof(address, keys, block))
    }

    async fn close(&self) {
        for provider in &self.providers {
            provider.close().await;
        }
    }
}

/// Retry policy of [`RetryProvider`]
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_retries: usize,
    /// Overall deadline for one logical call
    pub timeout: Duration,
    /// First backoff delay; doubles per retry
    pub initial_backoff: Duration,
    /// Backoff ceiling
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 1024,
            timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(1),
        }
    }
}

/// Provider wrapper retrying failed calls with exponential backoff.
///
/// Retries only on error; errors of exhausted calls are aggregated into
/// one composite message.
pub struct RetryProvider<P: Provider> {
    inner: P,
    cfg: RetryConfig,
}

impl<P: Provider> RetryProvider<P> {
    /// Wrap `inner` with the default policy
    pub fn new(inner: P) -> Self {
        Self::with_config(inner, RetryConfig::default())
    }

    /// Wrap `inner` with an explicit policy
    pub fn with_config(inner: P, cfg: RetryConfig) -> Self {
        RetryProvider { inner, cfg }
    }

    async fn retry_op<T, Fut, F>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let deadline = tokio::time::Instant::now() + self.cfg.timeout;
        let mut errors: Vec<String> = Vec::new();
        let mut backoff = self.cfg.initial_backoff;

        for _ in 0..self.cfg.max_retries.max(1) {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => errors.push(err.to_string()),
            }
            if tokio::time::Instant::now() + backoff >= deadline {
                errors.push(ProviderError::Timeout.to_string());
                break;
            }
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(self.cfg.max_backoff);
        }

        warn!(
            attempts = errors.len(),
            "provider retries exhausted, giving up"
        );
        Err(ProviderError::RetriesExhausted(errors.join("; ")))
    }
}

#[async_trait]
impl<P: Provider> Provider for RetryProvider<P> {
    async fn get_block_certificates(
        &self,
        first: BlockQuery,
        max_results: u64,
    ) -> Result<Vec<BlockCertificate>, ProviderError> {
        self.retry_op(|| self.inner.get_block_certificates(first, max_results))
            .await
    }

    async fn get_committee_certificates(
        &self,
        first: PeriodQuery,
        max_results: u64,
    ) -> Result<Vec<CommitteeCertificate>, ProviderError> {
        self.retry_op(|| self.inner.get_committee_certificates(first, max_results))
            .await
    }

    async fn get_proof(
        &self,
        address: Address,
        keys: &[B256],
        block: BlockNumberArg,
    ) -> Result<RpcProof, ProviderError> {
        self.retry_op(|| self.inner.get_proof(address, keys, block))
            .await
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
