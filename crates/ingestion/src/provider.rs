//! `ChainDataProvider` over the HTTP gateway.

use crate::rpc_client::{ProviderConfig, RpcClient};
use alloy::primitives::B256;
use async_trait::async_trait;
use mevscope_heuristics::decode::decode_trace;
use mevscope_heuristics::model::TransactionTrace;
use mevscope_heuristics::{ChainDataProvider, ProviderResult};
use mevscope_telemetry::Metrics;
use serde_json::Value;
use tracing::debug;

/// Chain-data provider backed by the gateway's JSON-RPC proxy and trace API.
pub struct HttpChainProvider {
    client: RpcClient,
}

impl HttpChainProvider {
    /// Create a provider.
    ///
    /// # Arguments
    /// * `config` - Gateway connection settings
    /// * `metrics` - Metrics collector for request latency and errors
    pub fn new(config: ProviderConfig, metrics: Metrics) -> ProviderResult<Self> {
        Ok(Self {
            client: RpcClient::new(config, metrics)?,
        })
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }
}

#[async_trait]
impl ChainDataProvider for HttpChainProvider {
    async fn json_rpc(&self, chain_id: u64, method: &str, params: Value) -> ProviderResult<Value> {
        self.client.call_rpc(chain_id, method, params).await
    }

    async fn transaction_trace(
        &self,
        chain_id: u64,
        tx_hash: B256,
        block_number: u64,
    ) -> ProviderResult<Option<TransactionTrace>> {
        let document = self.client.get_trace(chain_id, block_number, tx_hash).await?;
        let trace = trace_from_document(document, tx_hash)?;
        if trace.is_none() {
            debug!("No trace for {} in block {}", tx_hash, block_number);
        }
        Ok(trace)
    }
}

/// Decode a trace API response; an absent or `null` trace means "unknown".
fn trace_from_document(document: Option<Value>, tx_hash: B256) -> ProviderResult<Option<TransactionTrace>> {
    let Some(document) = document else {
        return Ok(None);
    };
    if document.is_null() || document.get("transactionTrace").is_some_and(Value::is_null) {
        return Ok(None);
    }
    decode_trace(&document, tx_hash).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, U256};
    use mevscope_heuristics::ProviderError;
    use serde_json::json;

    #[test]
    fn test_missing_trace_is_none() {
        let hash = B256::repeat_byte(0x01);
        assert!(trace_from_document(None, hash).unwrap().is_none());
        assert!(trace_from_document(Some(Value::Null), hash).unwrap().is_none());
        assert!(trace_from_document(Some(json!({"transactionTrace": null})), hash)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_gateway_trace_is_decoded() {
        let hash = B256::repeat_byte(0x02);
        let document = json!({
            "transactionTrace": {
                "type": "CALL",
                "from": "0x00000000000000000000000000000000000000aa",
                "to": "0x00000000000000000000000000000000000000bb",
                "value": "0xde0b6b3a7640000",
                "gasUsed": "0x5208",
                "gasPrice": "0x3b9aca00",
                "calls": [],
                "events": [{
                    "contract": "0x00000000000000000000000000000000000000cc",
                    "topics": [
                        "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
                    ],
                    "data": "0x"
                }]
            }
        });

        let trace = trace_from_document(Some(document), hash).unwrap().unwrap();
        assert_eq!(trace.tx_hash, hash);
        assert_eq!(trace.root.from, address!("00000000000000000000000000000000000000aa"));
        assert_eq!(trace.root.value, U256::from(10u64).pow(U256::from(18)));
        assert_eq!(trace.gas_price, U256::from(1_000_000_000u64));
        assert_eq!(trace.events.len(), 1);
    }

    #[test]
    fn test_malformed_trace_is_a_decode_error() {
        let result = trace_from_document(Some(json!({"transactionTrace": {"to": "0x01"}})), B256::ZERO);
        assert!(matches!(result, Err(ProviderError::Decode(_))));
    }
}
