//! Chain data as seen by the analyzer.
//!
//! These types are immutable once fetched and are owned by one analysis run.

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::Serialize;

/// One call in a transaction's call tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Call kind as reported by the tracer (`CALL`, `DELEGATECALL`, ...).
    pub call_type: String,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub gas_used: u64,
    pub input: Bytes,
    pub error: Option<String>,
    pub calls: Vec<CallFrame>,
}

impl CallFrame {
    /// Create a plain `CALL` frame with no input and no children.
    pub fn new(from: Address, to: Address, value: U256) -> Self {
        Self {
            call_type: "CALL".to_string(),
            from,
            to,
            value,
            gas_used: 0,
            input: Bytes::new(),
            error: None,
            calls: Vec::new(),
        }
    }

    /// Append a child call, builder style.
    pub fn with_call(mut self, call: CallFrame) -> Self {
        self.calls.push(call);
        self
    }
}

/// A log entry emitted during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub contract: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Call tree plus event log of a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionTrace {
    pub tx_hash: B256,
    /// Top-level call: `from` is the transaction sender, `to` the callee.
    pub root: CallFrame,
    pub events: Vec<TraceEvent>,
    pub gas_used: u64,
    /// Effective gas price in wei. Zero when the tracer did not report it.
    pub gas_price: U256,
}

impl TransactionTrace {
    /// Transaction sender.
    pub fn sender(&self) -> Address {
        self.root.from
    }

    /// Top-level callee.
    pub fn callee(&self) -> Address {
        self.root.to
    }

    pub fn value(&self) -> U256 {
        self.root.value
    }

    /// Transaction fee debited from the sender.
    pub fn fee(&self) -> U256 {
        U256::from(self.gas_used).saturating_mul(self.gas_price)
    }
}

/// The subset of a transaction receipt the analyzer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub transaction_index: u64,
    pub from: Address,
    pub to: Option<Address>,
    pub gas_used: u64,
    pub effective_gas_price: U256,
    pub success: bool,
}

/// A transaction as listed inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTransaction {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub transaction_index: u64,
    pub gas_price: U256,
}

/// A block with its ordered transaction list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSummary {
    pub number: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    pub transactions: Vec<BlockTransaction>,
}

impl BlockSummary {
    /// Position of a transaction in this block, if present.
    pub fn position_of(&self, hash: B256) -> Option<usize> {
        self.transactions.iter().position(|tx| tx.hash == hash)
    }
}

/// Symbol and decimals of a token contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    pub const UNKNOWN_SYMBOL: &'static str = "UNKNOWN";
    pub const DEFAULT_DECIMALS: u8 = 18;

    /// Placeholder used whenever metadata cannot be resolved.
    pub fn unknown(address: Address) -> Self {
        Self {
            address,
            symbol: Self::UNKNOWN_SYMBOL.to_string(),
            decimals: Self::DEFAULT_DECIMALS,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.symbol == Self::UNKNOWN_SYMBOL
    }
}

/// Confidence attached to detections and profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}
