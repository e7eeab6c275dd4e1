//! Structured analysis result.
//!
//! Everything here is plain data handed to the narrative generator and to
//! callers. Amounts are carried as exact integers until this layer, which
//! renders them with token metadata.

use crate::accounting::{format_token_amount, primary_in, primary_out, to_signed, NetPositions};
use crate::detectors::arbitrage::ArbitragePattern;
use crate::detectors::bot_profile::MevBotProfile;
use crate::detectors::sandwich::{DetectionMethod, SandwichRole, SandwichTransaction};
use crate::flows::NATIVE_TOKEN;
use crate::gas::GasAnalysis;
use crate::model::{Confidence, TokenInfo, TransactionReceipt};
use crate::protocols::ProtocolInteraction;
use crate::registry::TokenRegistry;
use alloy::primitives::{Address, I256, U256};
use chrono::{TimeZone, Utc};
use futures::future::join_all;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Serialize a `U256` as a decimal string.
pub fn serialize_u256_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn serialize_i256_decimal<S: Serializer>(value: &I256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

/// Top-level classification of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalysisType {
    Sandwich,
    Arbitrage,
    Swap,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Sandwich => "Sandwich",
            AnalysisType::Arbitrage => "Arbitrage",
            AnalysisType::Swap => "Swap",
        }
    }
}

/// A signed net change rendered with its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedAmount {
    pub token: TokenInfo,
    #[serde(serialize_with = "serialize_i256_decimal")]
    pub raw_amount: I256,
    /// Magnitude with decimals applied, e.g. `1.5 WETH`.
    pub formatted_amount: String,
    pub is_profit: bool,
}

impl FormattedAmount {
    pub fn new(token: TokenInfo, net: I256) -> Self {
        let formatted_amount = format_token_amount(net.unsigned_abs(), token.decimals, &token.symbol);
        Self {
            token,
            raw_amount: net,
            formatted_amount,
            is_profit: net.is_positive(),
        }
    }
}

/// Resolve metadata for every entry of a net map, preserving address order.
pub async fn format_net_changes(
    registry: &TokenRegistry,
    chain_id: u64,
    net: &BTreeMap<Address, I256>,
) -> Vec<FormattedAmount> {
    let lookups = net.iter().map(|(token, value)| async move {
        FormattedAmount::new(registry.token_info(chain_id, *token).await, *value)
    });
    join_all(lookups).await
}

/// Profit and loss of one actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Financials {
    /// Every token with a non-zero net change.
    pub net_profit_or_loss: Vec<FormattedAmount>,
    /// Tokens the actor gave up.
    pub tokens_in: Vec<FormattedAmount>,
    /// Tokens the actor gained.
    pub tokens_out: Vec<FormattedAmount>,
    /// Native asset net change, gas included.
    pub native_net_after_gas: Option<FormattedAmount>,
}

impl Financials {
    pub async fn build(registry: &TokenRegistry, chain_id: u64, net: &BTreeMap<Address, I256>) -> Self {
        let net_profit_or_loss = format_net_changes(registry, chain_id, net).await;
        let tokens_in = net_profit_or_loss
            .iter()
            .filter(|a| a.raw_amount.is_negative())
            .cloned()
            .collect();
        let tokens_out = net_profit_or_loss
            .iter()
            .filter(|a| a.raw_amount.is_positive())
            .cloned()
            .collect();
        let native_net_after_gas = net_profit_or_loss
            .iter()
            .find(|a| a.token.address == NATIVE_TOKEN)
            .cloned();
        Self {
            net_profit_or_loss,
            tokens_in,
            tokens_out,
            native_net_after_gas,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapType {
    SimpleSwap,
    MultiToken,
    Complex,
}

impl SwapType {
    /// Classify by the number of tokens with a non-zero net change.
    pub fn classify(tokens_moved: usize) -> Self {
        match tokens_moved {
            2 => SwapType::SimpleSwap,
            n if n > 2 => SwapType::MultiToken,
            _ => SwapType::Complex,
        }
    }
}

/// Two-sided summary of what an actor paid and received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapDetails {
    pub asset_in: Option<FormattedAmount>,
    pub asset_out: Option<FormattedAmount>,
    pub swap_type: SwapType,
}

impl SwapDetails {
    pub async fn build(registry: &TokenRegistry, chain_id: u64, net: &BTreeMap<Address, I256>) -> Self {
        let side = |entry: Option<(Address, I256)>| async move {
            match entry {
                Some((token, value)) => {
                    Some(FormattedAmount::new(registry.token_info(chain_id, token).await, value))
                }
                None => None,
            }
        };
        let (asset_in, asset_out) = tokio::join!(side(primary_in(net)), side(primary_out(net)));
        Self {
            asset_in,
            asset_out,
            swap_type: SwapType::classify(net.len()),
        }
    }
}

/// Receipt and block facts about the analyzed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMetadata {
    pub tx_hash: alloy::primitives::B256,
    pub chain_id: u64,
    pub network: &'static str,
    pub block_number: u64,
    /// RFC 3339, `None` when the block timestamp is out of range.
    pub block_timestamp: Option<String>,
    pub transaction_index: u64,
    pub from: Address,
    pub to: Option<Address>,
    #[serde(serialize_with = "serialize_u256_decimal")]
    pub value: U256,
    pub gas_used: u64,
    #[serde(serialize_with = "serialize_u256_decimal")]
    pub gas_price: U256,
    pub gas_cost: String,
    pub status: &'static str,
}

impl TransactionMetadata {
    pub fn new(
        chain_id: u64,
        network: &'static str,
        native_symbol: &str,
        receipt: &TransactionReceipt,
        block_timestamp: u64,
        value: U256,
    ) -> Self {
        let fee = U256::from(receipt.gas_used).saturating_mul(receipt.effective_gas_price);
        let block_timestamp = i64::try_from(block_timestamp)
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .map(|ts| ts.to_rfc3339());
        Self {
            tx_hash: receipt.tx_hash,
            chain_id,
            network,
            block_number: receipt.block_number,
            block_timestamp,
            transaction_index: receipt.transaction_index,
            from: receipt.from,
            to: receipt.to,
            value,
            gas_used: receipt.gas_used,
            gas_price: receipt.effective_gas_price,
            gas_cost: format_token_amount(fee, 18, native_symbol),
            status: if receipt.success { "success" } else { "failed" },
        }
    }
}

/// Attacker spread measured on the pair the sandwich moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceImpact {
    pub token_a: TokenInfo,
    pub token_b: TokenInfo,
    /// Front-run outflow of token A.
    pub front_run_spent: String,
    /// Back-run inflow of token A.
    pub back_run_received: String,
    #[serde(serialize_with = "serialize_i256_decimal")]
    pub attacker_spread_bps: I256,
}

impl PriceImpact {
    pub fn unknown() -> Self {
        Self {
            token_a: TokenInfo::unknown(Address::ZERO),
            token_b: TokenInfo::unknown(Address::ZERO),
            front_run_spent: "0".to_string(),
            back_run_received: "0".to_string(),
            attacker_spread_bps: I256::ZERO,
        }
    }
}

/// Raw price-impact figures before token metadata is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceImpactInputs {
    pub token_a: Address,
    pub token_b: Address,
    pub front_run_spent: U256,
    pub back_run_received: U256,
    pub spread_bps: I256,
}

/// Pick the traded pair and measure the attacker's spread on it.
///
/// # Arguments
/// * `front_run` - Attacker positions over the front-run
/// * `back_run` - Attacker positions over the back-run
/// * `common` - Tokens shared by the front-run and victim flows
///
/// # Returns
/// `None` with fewer than two common tokens or no attacker outflow.
pub fn price_impact_inputs(
    front_run: &NetPositions,
    back_run: &NetPositions,
    common: &BTreeSet<Address>,
) -> Option<PriceImpactInputs> {
    if common.len() < 2 {
        return None;
    }

    let outflow = |token: &Address| front_run.get(token).map_or(U256::ZERO, |p| p.total_outflow);
    let inflow = |token: &Address| front_run.get(token).map_or(U256::ZERO, |p| p.total_inflow);

    // Ties resolve to the lowest address
    let token_a = *common
        .iter()
        .filter(|t| !outflow(t).is_zero())
        .rev()
        .max_by_key(|t| outflow(t))?;
    let token_b = *common
        .iter()
        .filter(|t| **t != token_a)
        .rev()
        .max_by_key(|t| inflow(t))?;

    let spent = outflow(&token_a);
    let received = back_run.get(&token_a).map_or(U256::ZERO, |p| p.total_inflow);
    let diff = to_signed(received).saturating_sub(to_signed(spent));
    let spread_bps = diff.saturating_mul(I256::from_raw(U256::from(10_000u64))) / to_signed(spent);

    Some(PriceImpactInputs {
        token_a,
        token_b,
        front_run_spent: spent,
        back_run_received: received,
        spread_bps,
    })
}

/// The detected sandwich with per-actor positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SandwichPattern {
    pub front_run: SandwichTransaction,
    pub victim: SandwichTransaction,
    pub back_run: SandwichTransaction,
    pub confidence: Confidence,
    pub common_tokens: Vec<TokenInfo>,
    pub price_impact: PriceImpact,
    /// Front-run and back-run net changes summed per token.
    pub attacker_positions: Financials,
    pub victim_positions: Financials,
}

/// Summary of one sandwich leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegSummary {
    pub hash: alloy::primitives::B256,
    pub role: SandwichRole,
    pub swap: SwapDetails,
    pub gas_used: u64,
    pub gas_cost: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SandwichAnalysis {
    pub pattern: SandwichPattern,
    pub detection_method: DetectionMethod,
    /// Role of the analyzed transaction.
    pub target_role: SandwichRole,
    pub attacker: Address,
    pub legs: Vec<LegSummary>,
    pub bot_profile: MevBotProfile,
    /// Fees of the front-run and back-run together.
    pub attacker_gas_spent: String,
}

/// One hop of an arbitrage route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapStep {
    pub step: usize,
    pub token_in: TokenInfo,
    pub token_out: TokenInfo,
    pub amount_in: String,
    pub amount_out: String,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrageAnalysis {
    pub pattern: ArbitragePattern,
    pub swap_path: Vec<SwapStep>,
}

/// Complete structured output of one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(rename = "type")]
    pub analysis_type: AnalysisType,
    /// Strategy or classifier that produced the result.
    pub detection_method: String,
    pub metadata: TransactionMetadata,
    pub controlled_addresses: Vec<Address>,
    pub protocols: Vec<ProtocolInteraction>,
    pub gas_analysis: GasAnalysis,
    pub financials: Financials,
    pub swap_details: SwapDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandwich: Option<SandwichAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arbitrage: Option<ArbitrageAnalysis>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlled::ControlledAddressSet;
    use crate::flows::test_support::{addr, trace_with};
    use crate::flows::{FlowDirection, FlowSource, TokenFlow};
    use crate::model::CallFrame;

    fn flow(token: Address, from: Address, to: Address, amount: u64) -> TokenFlow {
        TokenFlow {
            token,
            amount: U256::from(amount),
            from,
            to,
            direction: FlowDirection::Buy,
            source: FlowSource::Erc20Transfer,
        }
    }

    fn positions(actor: Address, flows: &[TokenFlow]) -> NetPositions {
        let trace = trace_with(CallFrame::new(actor, addr(0xfe), U256::ZERO), vec![]);
        NetPositions::compute(&trace, &ControlledAddressSet::seeded(actor, addr(0xfe)), flows)
    }

    #[test]
    fn test_formatted_amount_uses_magnitude() {
        let token = TokenInfo {
            address: addr(1),
            symbol: "USDC".to_string(),
            decimals: 6,
        };
        let loss = FormattedAmount::new(token, I256::try_from(-2_500_000i64).unwrap());
        assert_eq!(loss.formatted_amount, "2.5 USDC");
        assert!(!loss.is_profit);
        assert_eq!(serde_json::to_value(&loss).unwrap()["rawAmount"], "-2500000");
    }

    #[test]
    fn test_swap_type_classification() {
        assert_eq!(SwapType::classify(2), SwapType::SimpleSwap);
        assert_eq!(SwapType::classify(4), SwapType::MultiToken);
        assert_eq!(SwapType::classify(1), SwapType::Complex);
    }

    #[test]
    fn test_price_impact_spread() {
        let attacker = addr(0xa1);
        let pool = addr(0xb2);
        let weth = addr(0x10);
        let usdc = addr(0x20);

        // Front-run: 100 WETH in, 300 USDC out; back-run: 300 USDC in, 105 WETH out
        let front = positions(attacker, &[flow(weth, attacker, pool, 100), flow(usdc, pool, attacker, 300)]);
        let back = positions(attacker, &[flow(usdc, attacker, pool, 300), flow(weth, pool, attacker, 105)]);
        let common = BTreeSet::from([weth, usdc]);

        let impact = price_impact_inputs(&front, &back, &common).unwrap();
        assert_eq!(impact.token_a, weth);
        assert_eq!(impact.token_b, usdc);
        assert_eq!(impact.spread_bps, I256::try_from(500i64).unwrap());
    }

    #[test]
    fn test_price_impact_needs_two_common_tokens() {
        let front = NetPositions::default();
        let common = BTreeSet::from([addr(1)]);
        assert!(price_impact_inputs(&front, &front, &common).is_none());
    }

    #[test]
    fn test_metadata_timestamp_is_rfc3339() {
        let receipt = TransactionReceipt {
            tx_hash: alloy::primitives::B256::ZERO,
            block_number: 1,
            transaction_index: 0,
            from: addr(1),
            to: Some(addr(2)),
            gas_used: 21_000,
            effective_gas_price: U256::from(1_000_000_000u64),
            success: true,
        };
        let metadata = TransactionMetadata::new(1, "Ethereum", "ETH", &receipt, 1_700_000_000, U256::ZERO);
        assert_eq!(metadata.block_timestamp.as_deref(), Some("2023-11-14T22:13:20+00:00"));
        assert_eq!(metadata.gas_cost, "0.000021 ETH");
    }
}
