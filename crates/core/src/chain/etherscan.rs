use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::AbiRegistry;
use crate::config::ChainSettings;

/// Etherscan-compatible `getabi` lookup.
pub struct EtherscanRegistry {
    client: Client,
    api_url: String,
    api_key: String,
}

impl EtherscanRegistry {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
        })
    }

    /// `None` when no API key is configured.
    pub fn from_settings(settings: &ChainSettings) -> Result<Option<Self>> {
        match settings.etherscan_api_key.as_deref() {
            Some(key) => Ok(Some(Self::new(
                settings.etherscan_api_url.clone(),
                key,
                Duration::from_secs(settings.registry_timeout_seconds),
            )?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AbiRegistry for EtherscanRegistry {
    async fn fetch_abi(&self, address: &str) -> Option<String> {
        let request = self.client.get(&self.api_url).query(&[
            ("module", "contract"),
            ("action", "getabi"),
            ("address", address),
            ("apikey", self.api_key.as_str()),
        ]);

        let body: Value = match request.send().await {
            Ok(response) => match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("ABI registry returned unreadable body: {}", e);
                    return None;
                }
            },
            Err(e) => {
                warn!("ABI registry request failed: {}", e);
                return None;
            }
        };

        let abi = parse_getabi_response(&body);
        if abi.is_none() {
            debug!("No verified ABI for {}", address);
        }
        abi
    }
}

pub(crate) fn parse_getabi_response(body: &Value) -> Option<String> {
    if body.get("status").and_then(Value::as_str) != Some("1") {
        return None;
    }
    body.get("result")
        .and_then(Value::as_str)
        .filter(|abi| !abi.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verified_abi_is_returned() {
        let body = json!({"status": "1", "message": "OK", "result": "[{\"type\":\"function\"}]"});
        assert_eq!(
            parse_getabi_response(&body).as_deref(),
            Some("[{\"type\":\"function\"}]")
        );
    }

    #[test]
    fn test_unverified_contract_yields_none() {
        let body = json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Contract source code not verified"
        });
        assert!(parse_getabi_response(&body).is_none());
    }

    #[test]
    fn test_registry_absent_without_key() {
        let settings = ChainSettings::default();
        assert!(EtherscanRegistry::from_settings(&settings).unwrap().is_none());
    }
}
