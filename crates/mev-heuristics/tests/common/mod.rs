//! In-memory chain used by the integration tests.

#![allow(dead_code)]

use alloy::primitives::{Address, Bytes, B256};
use alloy::sol_types::{sol_data, SolCall, SolType, SolValue};
use async_trait::async_trait;
use mevscope_heuristics::decode::decode_trace;
use mevscope_heuristics::erc20::IERC20::{decimalsCall, symbolCall};
use mevscope_heuristics::flows::TRANSFER_TOPIC;
use mevscope_heuristics::model::TransactionTrace;
use mevscope_heuristics::{ChainDataProvider, ProviderError, ProviderResult};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const GAS_USED: u64 = 21_000;
pub const GAS_PRICE: u64 = 1_000_000_000;

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn hash(byte: u8) -> B256 {
    B256::repeat_byte(byte)
}

/// A `CALL` frame carrying native value.
pub fn call(from: Address, to: Address, value: u128) -> Value {
    json!({
        "type": "CALL",
        "from": from,
        "to": to,
        "value": format!("0x{:x}", value),
        "calls": []
    })
}

/// An ERC20 `Transfer` event.
pub fn transfer(token: Address, from: Address, to: Address, amount: u128) -> Value {
    json!({
        "contract": token,
        "topics": [TRANSFER_TOPIC, from.into_word(), to.into_word()],
        "data": format!("0x{:064x}", amount)
    })
}

/// A trace document the way the gateway returns it.
pub fn trace(from: Address, to: Address, calls: Vec<Value>, events: Vec<Value>) -> Value {
    json!({
        "transactionTrace": {
            "type": "CALL",
            "from": from,
            "to": to,
            "value": "0x0",
            "gasUsed": format!("0x{:x}", GAS_USED),
            "gasPrice": format!("0x{:x}", GAS_PRICE),
            "calls": calls,
            "events": events
        }
    })
}

/// One transaction to place in a block.
pub struct Tx {
    pub hash: B256,
    pub from: Address,
    pub to: Address,
    pub trace: Value,
}

impl Tx {
    pub fn new(hash: B256, from: Address, to: Address, calls: Vec<Value>, events: Vec<Value>) -> Self {
        Self {
            hash,
            from,
            to,
            trace: trace(from, to, calls, events),
        }
    }
}

/// Receipts, blocks, traces and token contracts held in memory.
#[derive(Default)]
pub struct FakeChain {
    receipts: HashMap<B256, Value>,
    blocks: HashMap<u64, Value>,
    traces: HashMap<B256, Value>,
    tokens: HashMap<Address, (String, u8)>,
    /// `eth_call` always reverts.
    pub broken_token_calls: bool,
    /// Every request times out.
    pub outage: bool,
    requests: AtomicUsize,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: Address, symbol: &str, decimals: u8) -> Self {
        self.tokens.insert(token, (symbol.to_string(), decimals));
        self
    }

    /// Add a block; receipts and traces of its transactions become available.
    pub fn with_block(mut self, number: u64, txs: Vec<Tx>) -> Self {
        let mut listed = Vec::with_capacity(txs.len());
        for (index, tx) in txs.into_iter().enumerate() {
            listed.push(json!({
                "hash": tx.hash,
                "from": tx.from,
                "to": tx.to,
                "transactionIndex": format!("0x{:x}", index),
                "gasPrice": format!("0x{:x}", GAS_PRICE)
            }));
            self.receipts.insert(
                tx.hash,
                json!({
                    "transactionHash": tx.hash,
                    "blockNumber": format!("0x{:x}", number),
                    "transactionIndex": format!("0x{:x}", index),
                    "from": tx.from,
                    "to": tx.to,
                    "gasUsed": format!("0x{:x}", GAS_USED),
                    "effectiveGasPrice": format!("0x{:x}", GAS_PRICE),
                    "status": "0x1"
                }),
            );
            self.traces.insert(tx.hash, tx.trace);
        }
        self.blocks.insert(
            number,
            json!({
                "number": format!("0x{:x}", number),
                "timestamp": format!("0x{:x}", 1_700_000_000u64 + number * 12),
                "transactions": listed
            }),
        );
        self
    }

    /// Drop a trace while keeping its receipt and block entry.
    pub fn without_trace(mut self, hash: B256) -> Self {
        self.traces.remove(&hash);
        self
    }

    /// Number of requests served so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn token_call(&self, params: &Value) -> ProviderResult<Value> {
        let revert = || ProviderError::Rpc {
            code: 3,
            message: "execution reverted".to_string(),
        };
        if self.broken_token_calls {
            return Err(revert());
        }
        let to: Address = params[0]["to"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(revert)?;
        let (symbol, decimals) = self.tokens.get(&to).ok_or_else(revert)?;
        let data: Bytes = params[0]["data"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(revert)?;
        if data.starts_with(&symbolCall::SELECTOR) {
            Ok(json!(Bytes::from(symbol.abi_encode())))
        } else if data.starts_with(&decimalsCall::SELECTOR) {
            Ok(json!(Bytes::from(sol_data::Uint::<8>::abi_encode(decimals))))
        } else {
            Err(revert())
        }
    }
}

#[async_trait]
impl ChainDataProvider for FakeChain {
    async fn json_rpc(&self, _chain_id: u64, method: &str, params: Value) -> ProviderResult<Value> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.outage {
            return Err(ProviderError::Timeout(Duration::from_secs(30)));
        }
        match method {
            "eth_getTransactionReceipt" => {
                let hash: Option<B256> = params[0].as_str().and_then(|s| s.parse().ok());
                Ok(hash.and_then(|h| self.receipts.get(&h).cloned()).unwrap_or(Value::Null))
            }
            "eth_getBlockByNumber" => {
                let number = params[0]
                    .as_str()
                    .and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok());
                Ok(number.and_then(|n| self.blocks.get(&n).cloned()).unwrap_or(Value::Null))
            }
            "eth_call" => self.token_call(&params),
            other => Err(ProviderError::Rpc {
                code: -32601,
                message: format!("method {} not found", other),
            }),
        }
    }

    async fn transaction_trace(
        &self,
        _chain_id: u64,
        tx_hash: B256,
        _block_number: u64,
    ) -> ProviderResult<Option<TransactionTrace>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.outage {
            return Err(ProviderError::Timeout(Duration::from_secs(30)));
        }
        match self.traces.get(&tx_hash) {
            Some(document) => decode_trace(document, tx_hash).map(Some),
            None => Ok(None),
        }
    }
}
