//! RPC server wrapper around jsonrpsee

use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::server::{Server, ServerHandle};
use tracing::info;

use super::methods::{RpcBackend, SonicRpcImpl, SonicRpcServer};
use crate::scc::store::Store;

/// RPC server configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    /// Listen address
    pub addr: SocketAddr,
    /// Maximum concurrent connections
    pub max_connections: u32,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        RpcServerConfig {
            addr: "127.0.0.1:18545".parse().expect("static address"),
            max_connections: 100,
        }
    }
}

/// JSON-RPC server serving the `eth_*`, `debug_*` and `sonic_*` surface
pub struct RpcServer {
    config: RpcServerConfig,
    handle: Option<ServerHandle>,
    local_addr: Option<SocketAddr>,
}

impl RpcServer {
    /// Create an unstarted server
    pub fn new(config: RpcServerConfig) -> Self {
        RpcServer {
            config,
            handle: None,
            local_addr: None,
        }
    }

    /// Bind and start serving
    pub async fn start<S: Store + 'static, B: RpcBackend>(
        &mut self,
        store: Arc<S>,
        backend: Arc<B>,
    ) -> Result<SocketAddr, String> {
        let server = Server::builder()
            .max_connections(self.config.max_connections)
            .build(self.config.addr)
            .await
            .map_err(|e| format!("failed to bind rpc server: {e}"))?;

        let addr = server
            .local_addr()
            .map_err(|e| format!("failed to resolve local address: {e}"))?;

        let rpc = SonicRpcImpl::new(store, backend);
        let handle = server.start(rpc.into_rpc());

        info!(%addr, "rpc server listening");
        self.handle = Some(handle);
        self.local_addr = Some(addr);
        Ok(addr)
    }

    /// Address the server is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stop serving and wait for shutdown
    pub async fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.stop();
            handle.stopped().await;
            info!("rpc server stopped");
        }
    }
}
