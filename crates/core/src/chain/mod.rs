//! Chain data collaborators used to resolve contract addresses.
//!
//! Two narrow interfaces: a chain RPC endpoint that returns deployed bytecode,
//! and an ABI registry that may know the verified ABI. Registry misses are
//! never fatal; the resolver falls back to bytecode.

pub mod etherscan;
pub mod rpc;

use anyhow::Result;
use async_trait::async_trait;

pub use etherscan::EtherscanRegistry;
pub use rpc::JsonRpcClient;

#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Hex-encoded runtime bytecode at `address` (`0x` prefixed).
    async fn get_code(&self, address: &str) -> Result<String>;
}

#[async_trait]
pub trait AbiRegistry: Send + Sync {
    /// Verified ABI JSON, or `None` when unknown or unreachable.
    async fn fetch_abi(&self, address: &str) -> Option<String>;
}
