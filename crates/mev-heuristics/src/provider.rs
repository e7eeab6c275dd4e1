//! Chain-data provider interface.
//!
//! The analyzer treats the provider as a black box: anything that can answer
//! JSON-RPC calls and return structured call traces is substitutable. Typed
//! accessors are implemented on top of [`ChainDataProvider::json_rpc`] and can
//! be overridden by providers with a faster path.

use crate::decode::{decode_block, decode_receipt, parse_bytes};
use crate::error::ProviderError;
use crate::model::{BlockSummary, TransactionReceipt, TransactionTrace};
use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait for chain-data providers.
#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    /// Issue a raw JSON-RPC call and return its `result` member.
    async fn json_rpc(&self, chain_id: u64, method: &str, params: Value) -> ProviderResult<Value>;

    /// Fetch the structured call trace of a transaction.
    ///
    /// # Returns
    /// `None` when the provider has no trace for the hash in that block.
    async fn transaction_trace(
        &self,
        chain_id: u64,
        tx_hash: B256,
        block_number: u64,
    ) -> ProviderResult<Option<TransactionTrace>>;

    /// Fetch a transaction receipt, `None` if the transaction is unknown.
    async fn transaction_receipt(
        &self,
        chain_id: u64,
        tx_hash: B256,
    ) -> ProviderResult<Option<TransactionReceipt>> {
        let result = self
            .json_rpc(chain_id, "eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        decode_receipt(&result).map(Some)
    }

    /// Fetch a block with its full transaction list, `None` if not yet produced.
    async fn block(&self, chain_id: u64, number: u64) -> ProviderResult<Option<BlockSummary>> {
        let result = self
            .json_rpc(
                chain_id,
                "eth_getBlockByNumber",
                json!([format!("0x{:x}", number), true]),
            )
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        decode_block(&result).map(Some)
    }

    /// Execute a read-only contract call against the latest state.
    async fn call(&self, chain_id: u64, to: Address, data: Bytes) -> ProviderResult<Bytes> {
        let result = self
            .json_rpc(chain_id, "eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        parse_bytes(&result)
            .ok_or_else(|| ProviderError::Decode("eth_call result is not hex".to_string()))
    }
}
