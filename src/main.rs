//! Sonic node binary
//!
//! Usage:
//!   sonic-node --help

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use parking_lot::RwLock;
use sonic::{
    epoch::{EpochState, Rules},
    evm::{BlockOverrides, Receipt},
    rpc::{
        types::{BlockNumberArg, RpcProof, RpcRules},
        RpcBackend, RpcCallRequest, RpcServer, RpcServerConfig, TraceConfig,
    },
    scc::{MemoryStore, SccNode},
    BlockNumber, BlsKeypair, DEFAULT_CHAIN_ID, SONIC_VERSION,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "sonic-node")]
#[command(version = SONIC_VERSION)]
#[command(about = "Sonic blockchain node", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a node serving the RPC surface
    Node {
        /// RPC listen port
        #[arg(short, long, default_value = "18545")]
        rpc_port: u16,

        /// Chain id
        #[arg(short, long, default_value_t = DEFAULT_CHAIN_ID)]
        chain_id: u64,

        /// Log level (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "info")]
        log_level: String,
    },

    /// Generate a BLS validator keypair and print it
    Keygen,
}

/// Backend wiring of the standalone binary.
///
/// The EVM, witness source and transaction pool are integration-time
/// collaborators; the standalone node serves the certificate surface and
/// reports the rest as unattached.
struct NodeBackend {
    chain_id: u64,
    epoch_state: RwLock<EpochState>,
    head: RwLock<BlockNumber>,
}

impl NodeBackend {
    fn new(chain_id: u64, rules: Rules) -> Self {
        NodeBackend {
            chain_id,
            epoch_state: RwLock::new(EpochState::new(rules, 0)),
            head: RwLock::new(0),
        }
    }
}

impl RpcBackend for NodeBackend {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn rules_at(&self, _block: BlockNumberArg) -> RpcRules {
        let state = self.epoch_state.read();
        RpcRules {
            name: state.rules.name.clone(),
            epoch: state.epoch as u64,
            rules: state.rules.clone(),
            has_pending_change: state.dirty_rules.is_some(),
        }
    }

    fn head_block(&self) -> BlockNumber {
        *self.head.read()
    }

    fn block_receipts(&self, _block: BlockNumberArg) -> Result<Vec<Receipt>, String> {
        Err("receipt store not attached".to_string())
    }

    fn proof(
        &self,
        _address: &str,
        _keys: &[String],
        _block: BlockNumberArg,
    ) -> Result<RpcProof, String> {
        Err("witness source not attached".to_string())
    }

    fn call(
        &self,
        _request: &RpcCallRequest,
        _block: BlockNumberArg,
        _overrides: Option<&BlockOverrides>,
    ) -> Result<String, String> {
        Err("evm backend not attached".to_string())
    }

    fn estimate_gas(
        &self,
        _request: &RpcCallRequest,
        _block: BlockNumberArg,
    ) -> Result<u64, String> {
        Err("evm backend not attached".to_string())
    }

    fn trace_call(
        &self,
        _request: &RpcCallRequest,
        _block: BlockNumberArg,
        _overrides: Option<&BlockOverrides>,
        _config: Option<&TraceConfig>,
    ) -> Result<serde_json::Value, String> {
        Err("evm backend not attached".to_string())
    }

    fn trace_transaction(
        &self,
        _tx_hash: &str,
        _config: Option<&TraceConfig>,
    ) -> Result<serde_json::Value, String> {
        Err("evm backend not attached".to_string())
    }

    fn send_raw_transaction(&self, _data: &str) -> Result<String, String> {
        Err("transaction pool not attached".to_string())
    }
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Node {
            rpc_port,
            chain_id,
            log_level,
        } => {
            init_logging(&log_level);
            info!("sonic-node v{SONIC_VERSION}");
            info!(chain_id, "starting node");

            let store = Arc::new(MemoryStore::new());
            let _scc = SccNode::new(chain_id, store.clone());
            let backend = Arc::new(NodeBackend::new(chain_id, Rules::default()));

            let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), rpc_port);
            let mut server = RpcServer::new(RpcServerConfig {
                addr,
                ..Default::default()
            });
            server.start(store, backend).await?;

            tokio::signal::ctrl_c()
                .await
                .map_err(|e| format!("failed to install signal handler: {e}"))?;
            info!("shutting down");
            server.stop().await;
            Ok(())
        }

        Commands::Keygen => {
            let keypair =
                BlsKeypair::generate().map_err(|e| format!("key generation failed: {e}"))?;
            println!("public key:          0x{}", hex::encode(keypair.public_key().to_bytes()));
            println!(
                "proof of possession: 0x{}",
                hex::encode(keypair.proof_of_possession().to_bytes())
            );
            Ok(())
        }
    }
}
