//! Decoding of provider JSON into analyzer types.
//!
//! Quantities are accepted as `0x` hex strings, decimal strings or JSON
//! numbers, since tracers and RPC nodes disagree on the encoding.

use crate::error::ProviderError;
use crate::model::{
    BlockSummary, BlockTransaction, CallFrame, TraceEvent, TransactionReceipt, TransactionTrace,
};
use alloy::primitives::{Address, Bytes, B256, U256};
use serde_json::Value;

fn malformed(what: &str) -> ProviderError {
    ProviderError::Decode(format!("missing or malformed {what}"))
}

/// Parse a quantity that fits in 64 bits.
pub fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => match s.strip_prefix("0x") {
            Some("") => Some(0),
            Some(hex_str) => u64::from_str_radix(hex_str, 16).ok(),
            None => s.parse().ok(),
        },
        _ => None,
    }
}

/// Parse an arbitrary-precision quantity.
pub fn parse_u256(value: &Value) -> Option<U256> {
    match value {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) => match s.strip_prefix("0x") {
            Some("") => Some(U256::ZERO),
            Some(hex_str) => U256::from_str_radix(hex_str, 16).ok(),
            None if s.is_empty() => Some(U256::ZERO),
            None => U256::from_str_radix(s, 10).ok(),
        },
        _ => None,
    }
}

pub fn parse_address(value: &Value) -> Option<Address> {
    value.as_str()?.parse().ok()
}

pub fn parse_hash(value: &Value) -> Option<B256> {
    value.as_str()?.parse().ok()
}

/// Decode a hex byte string. A missing value decodes to empty bytes.
pub fn parse_bytes(value: &Value) -> Option<Bytes> {
    match value {
        Value::Null => Some(Bytes::new()),
        Value::String(s) => {
            let digits = s.strip_prefix("0x").unwrap_or(s);
            hex::decode(digits).ok().map(Bytes::from)
        }
        _ => None,
    }
}

/// Decode an `eth_getTransactionReceipt` result.
pub fn decode_receipt(json: &Value) -> Result<TransactionReceipt, ProviderError> {
    let gas_price = parse_u256(&json["effectiveGasPrice"])
        .or_else(|| parse_u256(&json["gasPrice"]))
        .unwrap_or(U256::ZERO);

    Ok(TransactionReceipt {
        tx_hash: parse_hash(&json["transactionHash"]).ok_or_else(|| malformed("transactionHash"))?,
        block_number: parse_u64(&json["blockNumber"]).ok_or_else(|| malformed("blockNumber"))?,
        transaction_index: parse_u64(&json["transactionIndex"])
            .ok_or_else(|| malformed("transactionIndex"))?,
        from: parse_address(&json["from"]).ok_or_else(|| malformed("from"))?,
        to: parse_address(&json["to"]),
        gas_used: parse_u64(&json["gasUsed"]).ok_or_else(|| malformed("gasUsed"))?,
        effective_gas_price: gas_price,
        success: parse_u64(&json["status"]).map(|s| s == 1).unwrap_or(true),
    })
}

/// Decode an `eth_getBlockByNumber` result requested with full transactions.
pub fn decode_block(json: &Value) -> Result<BlockSummary, ProviderError> {
    let number = parse_u64(&json["number"]).ok_or_else(|| malformed("block number"))?;
    let timestamp = parse_u64(&json["timestamp"]).unwrap_or(0);
    let txs = json["transactions"]
        .as_array()
        .ok_or_else(|| malformed("transactions array"))?;

    let mut transactions = Vec::with_capacity(txs.len());
    for (position, tx) in txs.iter().enumerate() {
        transactions.push(BlockTransaction {
            hash: parse_hash(&tx["hash"]).ok_or_else(|| malformed("transaction hash"))?,
            from: parse_address(&tx["from"]).ok_or_else(|| malformed("transaction sender"))?,
            to: parse_address(&tx["to"]),
            transaction_index: parse_u64(&tx["transactionIndex"]).unwrap_or(position as u64),
            gas_price: parse_u256(&tx["gasPrice"]).unwrap_or(U256::ZERO),
        });
    }

    Ok(BlockSummary {
        number,
        timestamp,
        transactions,
    })
}

fn decode_call(json: &Value) -> Result<CallFrame, ProviderError> {
    let mut calls = Vec::new();
    if let Some(children) = json["calls"].as_array() {
        for child in children {
            calls.push(decode_call(child)?);
        }
    }

    Ok(CallFrame {
        call_type: json["type"].as_str().unwrap_or("CALL").to_uppercase(),
        from: parse_address(&json["from"]).ok_or_else(|| malformed("call from"))?,
        // Contract creations carry no callee
        to: parse_address(&json["to"]).unwrap_or(Address::ZERO),
        value: parse_u256(&json["value"]).unwrap_or(U256::ZERO),
        gas_used: parse_u64(&json["gasUsed"]).unwrap_or(0),
        input: parse_bytes(&json["input"]).unwrap_or_default(),
        error: json["error"].as_str().map(str::to_string),
        calls,
    })
}

fn decode_event(json: &Value) -> Result<TraceEvent, ProviderError> {
    let contract = parse_address(&json["contract"])
        .or_else(|| parse_address(&json["address"]))
        .ok_or_else(|| malformed("event contract"))?;
    let topics = json["topics"]
        .as_array()
        .map(|topics| topics.iter().filter_map(parse_hash).collect())
        .unwrap_or_default();

    Ok(TraceEvent {
        contract,
        topics,
        data: parse_bytes(&json["data"]).ok_or_else(|| malformed("event data"))?,
    })
}

/// Decode a structured call trace.
///
/// Accepts either the trace object itself or a wrapper holding it under
/// `transactionTrace`. Events are read from the top-level `events` list; a
/// tracer that only attaches `logs` to individual calls is read in call order.
pub fn decode_trace(json: &Value, tx_hash: B256) -> Result<TransactionTrace, ProviderError> {
    let trace = json.get("transactionTrace").unwrap_or(json);
    let root = decode_call(trace)?;

    let mut events = Vec::new();
    match trace["events"].as_array() {
        Some(list) => {
            for event in list {
                events.push(decode_event(event)?);
            }
        }
        None => collect_call_logs(trace, &mut events)?,
    }

    Ok(TransactionTrace {
        tx_hash: parse_hash(&trace["txHash"]).unwrap_or(tx_hash),
        root,
        events,
        gas_used: parse_u64(&trace["gasUsed"]).unwrap_or(0),
        gas_price: parse_u256(&trace["gasPrice"]).unwrap_or(U256::ZERO),
    })
}

fn collect_call_logs(call: &Value, events: &mut Vec<TraceEvent>) -> Result<(), ProviderError> {
    if let Some(logs) = call["logs"].as_array() {
        for log in logs {
            events.push(decode_event(log)?);
        }
    }
    if let Some(children) = call["calls"].as_array() {
        for child in children {
            collect_call_logs(child, events)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_quantities() {
        assert_eq!(parse_u64(&json!("0x1a")), Some(26));
        assert_eq!(parse_u64(&json!("26")), Some(26));
        assert_eq!(parse_u64(&json!(26)), Some(26));
        assert_eq!(parse_u64(&json!("0x")), Some(0));
        assert_eq!(parse_u256(&json!("0xde0b6b3a7640000")), Some(U256::from(10u64).pow(U256::from(18))));
        assert_eq!(parse_u256(&json!("1000000")), Some(U256::from(1_000_000u64)));
        assert_eq!(parse_u256(&json!(null)), None);
    }

    #[test]
    fn test_decode_receipt_prefers_effective_gas_price() {
        let receipt = decode_receipt(&json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockNumber": "0x10",
            "transactionIndex": "0x2",
            "from": "0x00000000000000000000000000000000000000aa",
            "to": null,
            "gasUsed": "0x5208",
            "gasPrice": "0x1",
            "effectiveGasPrice": "0x3b9aca00",
            "status": "0x1"
        }))
        .unwrap();

        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.transaction_index, 2);
        assert_eq!(receipt.gas_used, 21_000);
        assert_eq!(receipt.effective_gas_price, U256::from(1_000_000_000u64));
        assert!(receipt.to.is_none());
        assert!(receipt.success);
    }

    #[test]
    fn test_decode_trace_with_wrapper_and_nested_logs() {
        let trace = decode_trace(
            &json!({
                "transactionTrace": {
                    "from": "0x00000000000000000000000000000000000000aa",
                    "to": "0x00000000000000000000000000000000000000bb",
                    "value": "0x0",
                    "gasUsed": "0x5208",
                    "calls": [{
                        "type": "call",
                        "from": "0x00000000000000000000000000000000000000bb",
                        "to": "0x00000000000000000000000000000000000000cc",
                        "value": "0x64",
                        "logs": [{
                            "contract": "0x00000000000000000000000000000000000000cc",
                            "topics": [],
                            "data": "0x"
                        }]
                    }]
                }
            }),
            B256::ZERO,
        )
        .unwrap();

        assert_eq!(trace.gas_used, 21_000);
        assert_eq!(trace.root.calls.len(), 1);
        assert_eq!(trace.root.calls[0].call_type, "CALL");
        assert_eq!(trace.root.calls[0].value, U256::from(100u64));
        assert_eq!(trace.events.len(), 1);
        assert_eq!(trace.gas_price, U256::ZERO);
    }

    #[test]
    fn test_decode_block_rejects_missing_transactions() {
        assert!(decode_block(&json!({ "number": "0x1" })).is_err());
    }
}
