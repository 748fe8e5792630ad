//! JSON-RPC surface: method definitions, wire types and the server
//! wrapper

pub mod methods;
pub mod server;
pub mod types;

pub use methods::{RpcBackend, RpcCallRequest, SonicRpcImpl, SonicRpcServer, TraceConfig};
pub use server::{RpcServer, RpcServerConfig};
pub use types::{
    parse_numeric, BlockNumberArg, CountArg, RpcBlockCertificate, RpcCommitteeCertificate,
    RpcProof, RpcRules, MAX_CERTIFICATE_BATCH,
};
