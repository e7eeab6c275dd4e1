//! Token-flow extraction.
//!
//! Flattens ERC20 `Transfer` events and native-value calls into one list of
//! directed movements. ERC20 flows come first in log order, native flows
//! follow in call pre-order.

use crate::erc20::IERC20::Transfer;
use crate::model::TransactionTrace;
use crate::walker::walk;
use alloy::primitives::{address, Address, B256, U256};
use alloy::sol_types::SolEvent;
use serde::Serialize;
use std::collections::BTreeSet;

/// `keccak256("Transfer(address,address,uint256)")`.
pub const TRANSFER_TOPIC: B256 = Transfer::SIGNATURE_HASH;

/// Sentinel token address standing for the chain's native asset.
pub const NATIVE_TOKEN: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

/// Direction of a flow relative to the transaction's root sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    Buy,
    Sell,
}

/// Where a flow was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowSource {
    Erc20Transfer,
    NativeCall,
}

/// One directed movement of value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenFlow {
    pub token: Address,
    #[serde(serialize_with = "crate::report::serialize_u256_decimal")]
    pub amount: U256,
    pub from: Address,
    pub to: Address,
    pub direction: FlowDirection,
    pub source: FlowSource,
}

impl TokenFlow {
    pub fn is_native(&self) -> bool {
        self.token == NATIVE_TOKEN
    }
}

/// Decode an ERC20 `Transfer` log into `(from, to, amount)`.
///
/// ERC721 transfers share the topic but index the token id, giving four
/// topics and no data; those are skipped.
fn decode_transfer(topics: &[B256], data: &[u8]) -> Option<Transfer> {
    if topics.len() != 3 {
        return None;
    }
    Transfer::decode_raw_log(topics.iter().copied(), data, true).ok()
}

fn direction(sender: Address, from: Address) -> FlowDirection {
    // Anything not leaving the root sender counts as a buy, including intermediate hops
    if from == sender {
        FlowDirection::Sell
    } else {
        FlowDirection::Buy
    }
}

/// Extract every token flow of a trace.
///
/// # Arguments
/// * `trace` - The transaction trace
///
/// # Returns
/// ERC20 transfer flows in log order followed by native-value call flows.
pub fn extract_token_flows(trace: &TransactionTrace) -> Vec<TokenFlow> {
    let sender = trace.sender();

    let transfers = trace.events.iter().filter_map(|event| {
        let transfer = decode_transfer(&event.topics, &event.data)?;
        Some(TokenFlow {
            token: event.contract,
            amount: transfer.value,
            from: transfer.from,
            to: transfer.to,
            direction: direction(sender, transfer.from),
            source: FlowSource::Erc20Transfer,
        })
    });

    let native = walk(&trace.root)
        .filter(|visit| !visit.frame.value.is_zero())
        .map(|visit| TokenFlow {
            token: NATIVE_TOKEN,
            amount: visit.frame.value,
            from: visit.frame.from,
            to: visit.frame.to,
            direction: direction(sender, visit.frame.from),
            source: FlowSource::NativeCall,
        });

    transfers.chain(native).collect()
}

/// Distinct tokens touched by a set of flows, in address order.
pub fn distinct_tokens(flows: &[TokenFlow]) -> BTreeSet<Address> {
    flows.iter().map(|f| f.token).collect()
}

/// Only the ERC20 transfer flows, in log order.
pub fn erc20_transfers(flows: &[TokenFlow]) -> impl Iterator<Item = &TokenFlow> {
    flows
        .iter()
        .filter(|f| f.source == FlowSource::Erc20Transfer)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::model::{CallFrame, TraceEvent};
    use alloy::primitives::Bytes;

    pub fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    pub fn transfer_event(token: Address, from: Address, to: Address, amount: u128) -> TraceEvent {
        TraceEvent {
            contract: token,
            topics: vec![TRANSFER_TOPIC, from.into_word(), to.into_word()],
            data: Bytes::from(U256::from(amount).to_be_bytes::<32>().to_vec()),
        }
    }

    pub fn trace_with(root: CallFrame, events: Vec<TraceEvent>) -> TransactionTrace {
        TransactionTrace {
            tx_hash: B256::ZERO,
            root,
            events,
            gas_used: 0,
            gas_price: U256::ZERO,
        }
    }
}
