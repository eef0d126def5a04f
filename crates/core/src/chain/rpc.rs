use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::ChainRpc;

/// Minimal Ethereum JSON-RPC client over HTTP.
pub struct JsonRpcClient {
    client: Client,
    url: String,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ChainRpc for JsonRpcClient {
    async fn get_code(&self, address: &str) -> Result<String> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_getCode",
            "params": [address, "latest"],
        });

        debug!("eth_getCode {} via {}", address, self.url);

        let response: Value = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("RPC request to {} failed", self.url))?
            .error_for_status()
            .context("RPC endpoint returned an error status")?
            .json()
            .await
            .context("RPC response was not JSON")?;

        parse_rpc_result(&response)
    }
}

pub(crate) fn parse_rpc_result(response: &Value) -> Result<String> {
    if let Some(error) = response.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(anyhow!("RPC error: {}", message));
    }

    response
        .get("result")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("RPC response has no result field"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_is_returned_verbatim() {
        let response = json!({"jsonrpc": "2.0", "id": 1, "result": "0x6080604052"});
        assert_eq!(parse_rpc_result(&response).unwrap(), "0x6080604052");
    }

    #[test]
    fn test_rpc_error_is_reported() {
        let response = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32602, "message": "invalid address"}
        });
        let err = parse_rpc_result(&response).unwrap_err();
        assert!(err.to_string().contains("invalid address"));
    }

    #[test]
    fn test_missing_result_is_an_error() {
        assert!(parse_rpc_result(&json!({"jsonrpc": "2.0", "id": 1})).is_err());
    }
}
