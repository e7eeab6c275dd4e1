//! HTTP client for the chain-data gateway.

use crate::retry::retry_once;
use alloy::primitives::B256;
use mevscope_heuristics::{ProviderError, ProviderResult};
use mevscope_telemetry::Metrics;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.1inch.dev";

/// Connection settings of the gateway.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Sent as a bearer token when present.
    pub api_key: Option<String>,
    /// Applied to every request.
    pub timeout: Duration,
    /// Pause before the single retry of a transient failure.
    pub retry_delay: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            retry_delay: Duration::from_millis(500),
        }
    }
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else if let Some(status) = err.status() {
        ProviderError::Status(status.as_u16())
    } else if err.is_decode() {
        ProviderError::Decode(err.to_string())
    } else {
        ProviderError::Transport(err.to_string())
    }
}

/// Extract `result` from a JSON-RPC response body.
pub fn rpc_result(body: Value) -> ProviderResult<Value> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        return Err(ProviderError::Rpc {
            code: error["code"].as_i64().unwrap_or_default(),
            message: error["message"].as_str().unwrap_or("unknown error").to_string(),
        });
    }
    match body {
        Value::Object(mut map) => map
            .remove("result")
            .ok_or_else(|| ProviderError::Decode("response has no result".to_string())),
        _ => Err(ProviderError::Decode("response is not an object".to_string())),
    }
}

/// Gateway client wrapper.
pub struct RpcClient {
    client: Client,
    config: ProviderConfig,
    metrics: Metrics,
}

impl RpcClient {
    /// Create a new gateway client.
    ///
    /// # Arguments
    /// * `config` - Base URL, credentials, timeout and retry delay
    /// * `metrics` - Metrics collector
    pub fn new(config: ProviderConfig, metrics: Metrics) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        info!("Initialized gateway client for {}", config.base_url);

        Ok(Self {
            client,
            config,
            metrics,
        })
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// JSON-RPC proxy endpoint of a chain.
    pub fn web3_url(&self, chain_id: u64) -> String {
        format!("{}/web3/{}", self.base(), chain_id)
    }

    /// Trace endpoint of one transaction.
    pub fn trace_url(&self, chain_id: u64, block_number: u64, tx_hash: B256) -> String {
        format!(
            "{}/traces/v1.0/chain/{}/block-trace/{}/tx-hash/{}",
            self.base(),
            chain_id,
            block_number,
            tx_hash
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Send a request and read its JSON body; `None` on HTTP 404.
    async fn send_json(&self, request: RequestBuilder) -> ProviderResult<Option<Value>> {
        let timeout = self.config.timeout;
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;
        Ok(Some(body))
    }

    async fn observed<T, F, Fut>(&self, operation: &str, op: F) -> ProviderResult<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: std::future::Future<Output = ProviderResult<T>>,
    {
        let start = Instant::now();
        let result = retry_once(operation, self.config.retry_delay, op).await;
        self.metrics
            .observe_provider_latency(operation, start.elapsed().as_secs_f64());
        if result.is_err() {
            self.metrics.inc_provider_errors();
        }
        result
    }

    /// Issue a JSON-RPC call against a chain.
    ///
    /// # Arguments
    /// * `chain_id` - Chain to query
    /// * `method` - JSON-RPC method name
    /// * `params` - JSON-RPC params array
    ///
    /// # Returns
    /// The `result` member, which may be `null`.
    pub async fn call_rpc(&self, chain_id: u64, method: &str, params: Value) -> ProviderResult<Value> {
        let url = self.web3_url(chain_id);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let body = self
            .observed(method, |attempt| {
                debug!("{} on chain {} (attempt {})", method, chain_id, attempt);
                self.send_json(self.client.post(&url).json(&payload))
            })
            .await?
            .ok_or(ProviderError::Status(StatusCode::NOT_FOUND.as_u16()))?;
        rpc_result(body)
    }

    /// Fetch the raw trace document of a transaction, `None` if unknown.
    pub async fn get_trace(
        &self,
        chain_id: u64,
        block_number: u64,
        tx_hash: B256,
    ) -> ProviderResult<Option<Value>> {
        let url = self.trace_url(chain_id, block_number, tx_hash);
        self.observed("trace", |attempt| {
            debug!("Trace for {} (attempt {})", tx_hash, attempt);
            self.send_json(self.client.get(&url))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> RpcClient {
        let config = ProviderConfig {
            base_url: base_url.to_string(),
            ..ProviderConfig::default()
        };
        RpcClient::new(config, Metrics::new().unwrap()).unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let rpc = client("https://gateway.example/");
        assert_eq!(rpc.web3_url(8453), "https://gateway.example/web3/8453");

        let hash = B256::repeat_byte(0xab);
        assert_eq!(
            rpc.trace_url(1, 19_000_000, hash),
            format!(
                "https://gateway.example/traces/v1.0/chain/1/block-trace/19000000/tx-hash/0x{}",
                "ab".repeat(32)
            )
        );
    }

    #[test]
    fn test_rpc_result_extraction() {
        assert_eq!(rpc_result(json!({"jsonrpc": "2.0", "id": 1, "result": "0x1"})).unwrap(), json!("0x1"));
        assert_eq!(rpc_result(json!({"result": null})).unwrap(), Value::Null);

        let err = rpc_result(json!({"error": {"code": -32000, "message": "header not found"}})).unwrap_err();
        assert!(matches!(err, ProviderError::Rpc { code: -32000, .. }));
        assert!(!err.is_transient());

        assert!(matches!(rpc_result(json!({"id": 1})), Err(ProviderError::Decode(_))));
    }
}
