//! Target resolution for the summarizer.
//!
//! A target is tried against a fixed priority chain: contract address, the
//! stdin sentinel, an existing file, and finally literal source text. There is
//! no backtracking between categories. An address-shaped target whose data
//! cannot be fetched fails instead of being treated as literal text.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info};

use crate::chain::{AbiRegistry, ChainRpc};
use crate::config::ConfigError;

pub const STDIN_SENTINEL: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Abi,
    Bytecode,
    Solidity,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abi => write!(f, "abi"),
            Self::Bytecode => write!(f, "bytecode"),
            Self::Solidity => write!(f, "solidity"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub kind: InputKind,
    pub payload: String,
}

impl ResolvedInput {
    pub fn new(kind: InputKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    pub fn solidity(payload: impl Into<String>) -> Self {
        Self::new(InputKind::Solidity, payload)
    }
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to fetch bytecode for {address}: {message}")]
    Bytecode { address: String, message: String },

    #[error("Failed to read standard input: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("address pattern is valid"))
}

pub fn is_address(target: &str) -> bool {
    address_pattern().is_match(target)
}

#[derive(Default)]
pub struct InputResolver<'a> {
    rpc: Option<&'a dyn ChainRpc>,
    registry: Option<&'a dyn AbiRegistry>,
}

impl<'a> InputResolver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rpc(mut self, rpc: Option<&'a dyn ChainRpc>) -> Self {
        self.rpc = rpc;
        self
    }

    pub fn with_registry(mut self, registry: Option<&'a dyn AbiRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub async fn resolve(&self, target: &str) -> Result<ResolvedInput, InputError> {
        self.resolve_with_stdin(target, std::io::stdin()).await
    }

    pub async fn resolve_with_stdin<R: Read>(
        &self,
        target: &str,
        mut stdin: R,
    ) -> Result<ResolvedInput, InputError> {
        if is_address(target) {
            return self.resolve_address(target).await;
        }

        if target == STDIN_SENTINEL {
            let mut payload = String::new();
            stdin
                .read_to_string(&mut payload)
                .map_err(InputError::Stdin)?;
            debug!("Read {} bytes of source from stdin", payload.len());
            return Ok(ResolvedInput::solidity(payload));
        }

        let path = Path::new(target);
        if path.exists() {
            let payload = std::fs::read_to_string(path).map_err(|source| InputError::File {
                path: path.to_path_buf(),
                source,
            })?;
            debug!("Loaded source from {}", path.display());
            return Ok(ResolvedInput::solidity(payload));
        }

        Ok(ResolvedInput::solidity(target))
    }

    async fn resolve_address(&self, address: &str) -> Result<ResolvedInput, InputError> {
        if let Some(registry) = self.registry {
            if let Some(abi) = registry.fetch_abi(address).await {
                info!("Using verified ABI for {}", address);
                return Ok(ResolvedInput::new(InputKind::Abi, abi));
            }
        }

        let rpc = self.rpc.ok_or(ConfigError::MissingRpcEndpoint)?;
        let code = rpc
            .get_code(address)
            .await
            .map_err(|e| InputError::Bytecode {
                address: address.to_string(),
                message: format!("{:#}", e),
            })?;

        info!("Using deployed bytecode for {} ({} chars)", address, code.len());
        Ok(ResolvedInput::new(InputKind::Bytecode, code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ADDRESS: &str = "0xAbC0000000000000000000000000000000000001";

    struct FixedRpc {
        code: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl FixedRpc {
        fn returning(code: &'static str) -> Self {
            Self {
                code: Some(code),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                code: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChainRpc for FixedRpc {
        async fn get_code(&self, _address: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.code
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("connection refused"))
        }
    }

    struct FixedRegistry(Option<&'static str>);

    #[async_trait]
    impl AbiRegistry for FixedRegistry {
        async fn fetch_abi(&self, _address: &str) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn test_address_pattern_is_strict() {
        assert!(is_address(ADDRESS));
        assert!(!is_address("0xabc"));
        assert!(!is_address(&format!("{}0", ADDRESS)));
        assert!(!is_address(&format!(" {}", ADDRESS)));
        assert!(!is_address("0xZZC0000000000000000000000000000000000001"));
    }

    #[tokio::test]
    async fn test_address_without_registry_uses_bytecode() {
        let rpc = FixedRpc::returning("0x6080604052");
        let resolver = InputResolver::new().with_rpc(Some(&rpc));

        let resolved = resolver.resolve(ADDRESS).await.unwrap();

        assert_eq!(resolved, ResolvedInput::new(InputKind::Bytecode, "0x6080604052"));
        assert_eq!(rpc.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_verified_abi_wins_over_bytecode() {
        let rpc = FixedRpc::returning("0x60");
        let registry = FixedRegistry(Some("[]"));
        let resolver = InputResolver::new()
            .with_rpc(Some(&rpc))
            .with_registry(Some(&registry));

        let resolved = resolver.resolve(ADDRESS).await.unwrap();

        assert_eq!(resolved.kind, InputKind::Abi);
        assert_eq!(resolved.payload, "[]");
        assert_eq!(rpc.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_registry_miss_falls_back_to_bytecode() {
        let rpc = FixedRpc::returning("0x60");
        let registry = FixedRegistry(None);
        let resolver = InputResolver::new()
            .with_rpc(Some(&rpc))
            .with_registry(Some(&registry));

        let resolved = resolver.resolve(ADDRESS).await.unwrap();
        assert_eq!(resolved.kind, InputKind::Bytecode);
    }

    #[tokio::test]
    async fn test_address_without_rpc_is_config_error() {
        let resolver = InputResolver::new();
        let err = resolver.resolve(ADDRESS).await.unwrap_err();
        assert!(matches!(
            err,
            InputError::Config(ConfigError::MissingRpcEndpoint)
        ));
    }

    #[tokio::test]
    async fn test_failed_fetch_does_not_fall_through_to_literal() {
        let rpc = FixedRpc::failing();
        let resolver = InputResolver::new().with_rpc(Some(&rpc));

        let err = resolver.resolve(ADDRESS).await.unwrap_err();
        assert!(matches!(err, InputError::Bytecode { .. }));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_stdin_sentinel_reads_everything() {
        let resolver = InputResolver::new();
        let stdin = Cursor::new("contract FromStdin {}\n");

        let resolved = resolver.resolve_with_stdin("-", stdin).await.unwrap();
        assert_eq!(resolved, ResolvedInput::solidity("contract FromStdin {}\n"));
    }

    #[tokio::test]
    async fn test_existing_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Token.sol");
        std::fs::write(&path, "contract Token {}").unwrap();

        let resolver = InputResolver::new();
        let resolved = resolver.resolve(path.to_str().unwrap()).await.unwrap();
        assert_eq!(resolved, ResolvedInput::solidity("contract Token {}"));
    }

    #[tokio::test]
    async fn test_anything_else_is_literal_source() {
        let resolver = InputResolver::new();
        let literal = "contract Inline { function f() external {} }";

        let resolved = resolver.resolve(literal).await.unwrap();
        assert_eq!(resolved, ResolvedInput::solidity(literal));
    }
}
