//! RPC method implementations

use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::error::{ErrorCode, ErrorObject, ErrorObjectOwned};

use crate::evm::{BlockOverrides, Receipt};
use crate::scc::store::Store;
use crate::BlockNumber;

use super::types::{
    BlockNumberArg, CountArg, RpcBlockCertificate, RpcCommitteeCertificate, RpcProof, RpcRules,
};
use serde::{Deserialize, Serialize};

/// Transaction call request for `eth_call` / `debug_traceCall`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcCallRequest {
    /// Sender
    pub from: Option<String>,
    /// Recipient; absent for contract creation
    pub to: Option<String>,
    /// Gas limit
    pub gas: Option<u64>,
    /// Gas price
    pub gas_price: Option<String>,
    /// Transferred value
    pub value: Option<String>,
    /// Call data
    pub data: Option<String>,
}

/// Tracer selection for the `debug_trace*` calls
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceConfig {
    /// Named tracer; the structlog tracer when absent
    pub tracer: Option<String>,
    /// Tracer timeout, e.g. `"5s"`
    pub timeout: Option<String>,
}

/// Node-side backend the RPC methods delegate to.
///
/// The EVM, the witness source and transaction storage are external
/// collaborators behind this trait; the RPC layer only shapes requests and
/// responses.
pub trait RpcBackend: Send + Sync + 'static {
    /// Chain id
    fn chain_id(&self) -> u64;

    /// Rules snapshot visible at `block`
    fn rules_at(&self, block: BlockNumberArg) -> RpcRules;

    /// Current head block number
    fn head_block(&self) -> BlockNumber;

    /// Receipts of all transactions of a block
    fn block_receipts(&self, block: BlockNumberArg) -> Result<Vec<Receipt>, String>;

    /// Account and storage witness
    fn proof(
        &self,
        address: &str,
        keys: &[String],
        block: BlockNumberArg,
    ) -> Result<RpcProof, String>;

    /// Execute a call against `block` state, with optional overrides
    fn call(
        &self,
        request: &RpcCallRequest,
        block: BlockNumberArg,
        overrides: Option<&BlockOverrides>,
    ) -> Result<String, String>;

    /// Estimate the gas of a call
    fn estimate_gas(&self, request: &RpcCallRequest, block: BlockNumberArg)
        -> Result<u64, String>;

    /// Trace a call with optional block overrides
    fn trace_call(
        &self,
        request: &RpcCallRequest,
        block: BlockNumberArg,
        overrides: Option<&BlockOverrides>,
        config: Option<&TraceConfig>,
    ) -> Result<serde_json::Value, String>;

    /// Trace a stored transaction
    fn trace_transaction(
        &self,
        tx_hash: &str,
        config: Option<&TraceConfig>,
    ) -> Result<serde_json::Value, String>;

    /// Submit a raw transaction; returns its hash
    fn send_raw_transaction(&self, data: &str) -> Result<String, String>;
}

/// Sonic RPC API
#[rpc(server)]
pub trait SonicRpc {
    /// Chain id, hex encoded
    #[method(name = "eth_chainId")]
    async fn chain_id(&self) -> RpcResult<String>;

    /// Rules snapshot at a block
    #[method(name = "eth_getRules")]
    async fn get_rules(&self, block: BlockNumberArg) -> RpcResult<RpcRules>;

    /// Current head block number, hex encoded
    #[method(name = "eth_blockNumber")]
    async fn block_number(&self) -> RpcResult<String>;

    /// Account and storage witness
    #[method(name = "eth_getProof")]
    async fn get_proof(
        &self,
        address: String,
        keys: Vec<String>,
        block: BlockNumberArg,
    ) -> RpcResult<RpcProof>;

    /// Receipts of all transactions of a block
    #[method(name = "eth_getBlockReceipts")]
    async fn get_block_receipts(&self, block: BlockNumberArg) -> RpcResult<Vec<Receipt>>;

    /// Execute a read-only call
    #[method(name = "eth_call")]
    async fn call(
        &self,
        request: RpcCallRequest,
        block: Option<BlockNumberArg>,
        overrides: Option<BlockOverrides>,
    ) -> RpcResult<String>;

    /// Estimate gas of a call
    #[method(name = "eth_estimateGas")]
    async fn estimate_gas(
        &self,
        request: RpcCallRequest,
        block: Option<BlockNumberArg>,
    ) -> RpcResult<String>;

    /// Submit a raw transaction
    #[method(name = "eth_sendRawTransaction")]
    async fn send_raw_transaction(&self, data: String) -> RpcResult<String>;

    /// Trace a call without storing anything
    #[method(name = "debug_traceCall")]
    async fn trace_call(
        &self,
        request: RpcCallRequest,
        block: Option<BlockNumberArg>,
        config: Option<TraceConfig>,
        overrides: Option<BlockOverrides>,
    ) -> RpcResult<serde_json::Value>;

    /// Trace a stored transaction
    #[method(name = "debug_traceTransaction")]
    async fn trace_transaction(
        &self,
        tx_hash: String,
        config: Option<TraceConfig>,
    ) -> RpcResult<serde_json::Value>;

    /// Committee certificates from a period, strictly consecutive
    #[method(name = "sonic_getCommitteeCertificates")]
    async fn get_committee_certificates(
        &self,
        first: BlockNumberArg,
        max_results: CountArg,
    ) -> RpcResult<Vec<RpcCommitteeCertificate>>;

    /// Block certificates from a block number; `"latest"` yields exactly
    /// the head certificate
    #[method(name = "sonic_getBlockCertificates")]
    async fn get_block_certificates(
        &self,
        first: BlockNumberArg,
        max_results: CountArg,
    ) -> RpcResult<Vec<RpcBlockCertificate>>;
}

fn invalid_params(msg: impl Into<String>) -> ErrorObjectOwned {
    ErrorObject::owned(ErrorCode::InvalidParams.code(), msg.into(), None::<()>)
}

fn internal_error(msg: impl Into<String>) -> ErrorObjectOwned {
    ErrorObject::owned(ErrorCode::InternalError.code(), msg.into(), None::<()>)
}

/// RPC method implementation over a certificate store and a node backend
pub struct SonicRpcImpl<S: Store + 'static, B: RpcBackend> {
    store: Arc<S>,
    backend: Arc<B>,
}

impl<S: Store + 'static, B: RpcBackend> SonicRpcImpl<S, B> {
    /// Create the method implementation
    pub fn new(store: Arc<S>, backend: Arc<B>) -> Self {
        SonicRpcImpl { store, backend }
    }
}

#[async_trait]
impl<S: Store + 'static, B: RpcBackend> SonicRpcServer for SonicRpcImpl<S, B> {
    async fn chain_id(&self) -> RpcResult<String> {
        Ok(format!("0x{:x}", self.backend.chain_id()))
    }

    async fn get_rules(&self, block: BlockNumberArg) -> RpcResult<RpcRules> {
        Ok(self.backend.rules_at(block))
    }

    async fn block_number(&self) -> RpcResult<String> {
        Ok(format!("0x{:x}", self.backend.head_block()))
    }

    async fn get_proof(
        &self,
        address: String,
        keys: Vec<String>,
        block: BlockNumberArg,
    ) -> RpcResult<RpcProof> {
        self.backend
            .proof(&address, &keys, block)
            .map_err(internal_error)
    }

    async fn get_block_receipts(&self, block: BlockNumberArg) -> RpcResult<Vec<Receipt>> {
        self.backend.block_receipts(block).map_err(internal_error)
    }

    async fn call(
        &self,
        request: RpcCallRequest,
        block: Option<BlockNumberArg>,
        overrides: Option<BlockOverrides>,
    ) -> RpcResult<String> {
        let block = block.unwrap_or(BlockNumberArg::Latest);
        self.backend
            .call(&request, block, overrides.as_ref())
            .map_err(internal_error)
    }

    async fn estimate_gas(
        &self,
        request: RpcCallRequest,
        block: Option<BlockNumberArg>,
    ) -> RpcResult<String> {
        let block = block.unwrap_or(BlockNumberArg::Latest);
        let gas = self
            .backend
            .estimate_gas(&request, block)
            .map_err(internal_error)?;
        Ok(format!("0x{gas:x}"))
    }

    async fn send_raw_transaction(&self, data: String) -> RpcResult<String> {
        self.backend
            .send_raw_transaction(&data)
            .map_err(invalid_params)
    }

    async fn trace_call(
        &self,
        request: RpcCallRequest,
        block: Option<BlockNumberArg>,
        config: Option<TraceConfig>,
        overrides: Option<BlockOverrides>,
    ) -> RpcResult<serde_json::Value> {
        let block = block.unwrap_or(BlockNumberArg::Latest);
        self.backend
            .trace_call(&request, block, overrides.as_ref(), config.as_ref())
            .map_err(internal_error)
    }

    async fn trace_transaction(
        &self,
        tx_hash: String,
        config: Option<TraceConfig>,
    ) -> RpcResult<serde_json::Value> {
        self.backend
            .trace_transaction(&tx_hash, config.as_ref())
            .map_err(internal_error)
    }

    async fn get_committee_certificates(
        &self,
        first: BlockNumberArg,
        max_results: CountArg,
    ) -> RpcResult<Vec<RpcCommitteeCertificate>> {
        let max = max_results.resolve() as usize;
        let first_period = match first {
            BlockNumberArg::Number(p) => p,
            BlockNumberArg::Latest => match self.store.latest_committee_certificate() {
                Some(cert) => cert.subject.period,
                None => return Ok(Vec::new()),
            },
        };

        let certs = self.store.get_committee_certificates_from(first_period, max);

        // Strictly consecutive from the requested period; truncate at the
        // first gap.
        let mut out = Vec::with_capacity(certs.len());
        let mut expected = first_period;
        for cert in certs {
            if cert.subject.period != expected {
                break;
            }
            out.push(RpcCommitteeCertificate::from_domain(&cert));
            expected += 1;
        }
        Ok(out)
    }

    async fn get_block_certificates(
        &self,
        first: BlockNumberArg,
        max_results: CountArg,
    ) -> RpcResult<Vec<RpcBlockCertificate>> {
        match first {
            BlockNumberArg::Latest => {
                // Exactly one certificate for the head.
                let cert = self
                    .store
                    .latest_block_certificate()
                    .ok_or_else(|| invalid_params("no block certificates found"))?;
                Ok(vec![RpcBlockCertificate::from_domain(&cert)])
            }
            BlockNumberArg::Number(first_number) => {
                let max = max_results.resolve() as usize;
                let certs = self.store.get_block_certificates_from(first_number, max);

                let mut out = Vec::with_capacity(certs.len());
                let mut expected = first_number;
                for cert in certs {
                    if cert.subject.number != expected {
                        break;
                    }
                    out.push(RpcBlockCertificate::from_domain(&cert));
                    expected += 1;
                }
                Ok(out)
            }
        }
    }
}
