//! Runtime configuration shared by both command-line tools.
//!
//! The configuration is built once at startup and handed to each collaborator
//! by reference. Layers apply in order: built-in defaults, an optional YAML
//! file, then environment variables (a `.env` file is loaded first).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const CONFIG_PATH_ENV: &str = "SOLSCRIBE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing OPENAI_API_KEY")]
    MissingApiKey,

    #[error("SEPOLIA_RPC not set for bytecode fetch.")]
    MissingRpcEndpoint,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub chain: ChainSettings,

    #[serde(default)]
    pub sampling: SamplingSettings,

    #[serde(default)]
    pub static_analysis: StaticAnalysisSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub api_key: Option<String>, // falls back to OPENAI_API_KEY

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSettings {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rpc_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub etherscan_api_key: Option<String>,

    #[serde(default = "default_etherscan_api_url")]
    pub etherscan_api_url: String,

    #[serde(default = "default_registry_timeout_seconds")]
    pub registry_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingSettings {
    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,

    #[serde(default = "default_generation_temperature")]
    pub generation_temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticAnalysisSettings {
    #[serde(default = "default_static_analysis_enabled")]
    pub enabled: bool,
}

fn default_model() -> String {
    "gpt-4".to_string()
}
fn default_etherscan_api_url() -> String {
    "https://api-sepolia.etherscan.io/api".to_string()
}
fn default_registry_timeout_seconds() -> u64 {
    10
}
fn default_summary_temperature() -> f32 {
    0.0
}
fn default_generation_temperature() -> f32 {
    0.2
}
fn default_static_analysis_enabled() -> bool {
    true
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
        }
    }
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            rpc_url: None,
            etherscan_api_key: None,
            etherscan_api_url: default_etherscan_api_url(),
            registry_timeout_seconds: default_registry_timeout_seconds(),
        }
    }
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            summary_temperature: default_summary_temperature(),
            generation_temperature: default_generation_temperature(),
        }
    }
}

impl Default for StaticAnalysisSettings {
    fn default() -> Self {
        Self {
            enabled: default_static_analysis_enabled(),
        }
    }
}

impl AppConfig {
    /// Loads `.env`, the optional YAML file (explicit path or `SOLSCRIBE_CONFIG`)
    /// and the process environment, then checks the required credential.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenv::dotenv() {
            debug!("Loaded environment from {}", env_file.display());
        }

        let file = path
            .map(Path::to_path_buf)
            .or_else(|| non_empty(std::env::var(CONFIG_PATH_ENV).ok()).map(PathBuf::from));

        let mut config = match file {
            Some(file) => Self::from_yaml_file(&file)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlays environment values. Empty values count as unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| non_empty(lookup(key));

        if let Some(key) = get("OPENAI_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.provider.base_url = Some(url);
        }
        if let Some(model) = get("LLM_MODEL") {
            self.provider.model = model;
        }
        if let Some(rpc) = get("SEPOLIA_RPC") {
            self.chain.rpc_url = Some(rpc);
        }
        if let Some(key) = get("ETHERSCAN_API_KEY") {
            self.chain.etherscan_api_key = Some(key);
        }
        if let Some(url) = get("ETHERSCAN_API_URL") {
            self.chain.etherscan_api_url = url;
        }
        if let Some(flag) = get("SOLSCRIBE_STATIC_ANALYSIS") {
            self.static_analysis.enabled =
                !matches!(flag.to_lowercase().as_str(), "0" | "false" | "off" | "no");
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_key().map(|_| ())
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.provider
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    pub fn rpc_url(&self) -> Result<&str, ConfigError> {
        self.chain
            .rpc_url
            .as_deref()
            .ok_or(ConfigError::MissingRpcEndpoint)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub const EXAMPLE_CONFIG: &str = r#"
# solscribe configuration

provider:
  model: gpt-4
  # api_key: sk-...  # Optional, defaults to OPENAI_API_KEY env var
  # base_url: https://api.openai.com/v1

chain:
  # rpc_url: https://sepolia.infura.io/v3/<project>  # or SEPOLIA_RPC
  # etherscan_api_key: ...                            # or ETHERSCAN_API_KEY
  etherscan_api_url: https://api-sepolia.etherscan.io/api
  registry_timeout_seconds: 10

sampling:
  summary_temperature: 0.0
  generation_temperature: 0.2

static_analysis:
  enabled: true
"#;
