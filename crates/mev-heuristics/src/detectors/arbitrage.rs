//! Arbitrage classification.
//!
//! Five independent classifiers inspect the same input; the first match in
//! priority order wins (flash-loan, triangular, cross-protocol, simple,
//! statistical).

use crate::accounting::{to_signed, NetPositions};
use crate::config::ArbitrageConfig;
use crate::flows::{distinct_tokens, erc20_transfers, TokenFlow, NATIVE_TOKEN};
use crate::model::Confidence;
use crate::protocols::{lookup_protocol, ProtocolInteraction};
use alloy::primitives::{Address, I256, U256};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArbitrageKind {
    #[serde(rename = "simple-arbitrage")]
    Simple,
    #[serde(rename = "cross-protocol-arbitrage")]
    CrossProtocol,
    #[serde(rename = "triangular-arbitrage")]
    Triangular,
    #[serde(rename = "flash-loan-arbitrage")]
    FlashLoan,
    #[serde(rename = "statistical-arbitrage")]
    Statistical,
}

impl ArbitrageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArbitrageKind::Simple => "simple-arbitrage",
            ArbitrageKind::CrossProtocol => "cross-protocol-arbitrage",
            ArbitrageKind::Triangular => "triangular-arbitrage",
            ArbitrageKind::FlashLoan => "flash-loan-arbitrage",
            ArbitrageKind::Statistical => "statistical-arbitrage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitragePattern {
    #[serde(rename = "type")]
    pub kind: ArbitrageKind,
    pub confidence: Confidence,
    pub protocols: Vec<ProtocolInteraction>,
    /// Distinct tokens moved by the transaction.
    pub token_pairs: Vec<Address>,
    pub complexity: usize,
}

/// Everything the classifiers look at.
pub struct ArbitrageInput<'a> {
    pub protocols: &'a [ProtocolInteraction],
    pub flows: &'a [TokenFlow],
    pub positions: &'a NetPositions,
    /// Transaction fee, added back to the native position so that "flat"
    /// means flat on trading alone.
    pub fee: U256,
    /// Decimals per token; missing entries count as 18.
    pub decimals: &'a BTreeMap<Address, u8>,
}

impl ArbitrageInput<'_> {
    fn decimals_of(&self, token: &Address) -> u8 {
        self.decimals.get(token).copied().unwrap_or(18)
    }

    fn trading_net(&self, token: &Address) -> I256 {
        let net = self.positions.get(token).map_or(I256::ZERO, |p| p.net_change());
        if *token == NATIVE_TOKEN {
            net.saturating_add(to_signed(self.fee))
        } else {
            net
        }
    }

    fn pattern(&self, kind: ArbitrageKind, confidence: Confidence, complexity: usize) -> ArbitragePattern {
        ArbitragePattern {
            kind,
            confidence,
            protocols: self.protocols.to_vec(),
            token_pairs: distinct_tokens(self.flows).into_iter().collect(),
            complexity,
        }
    }
}

/// One swap inferred from a pair of consecutive transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapLeg {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub amount_out: U256,
    /// Recipient of the input transfer.
    pub pool: Address,
}

/// Pair consecutive ERC20 transfers `(0,1), (2,3), ...` into swaps.
pub fn swap_sequence(flows: &[TokenFlow]) -> Vec<SwapLeg> {
    let transfers: Vec<&TokenFlow> = erc20_transfers(flows).collect();
    transfers
        .chunks_exact(2)
        .map(|pair| SwapLeg {
            token_in: pair[0].token,
            token_out: pair[1].token,
            amount_in: pair[0].amount,
            amount_out: pair[1].amount,
            pool: pair[0].to,
        })
        .collect()
}

/// Name the protocol that executed a swap.
pub fn swap_protocol(leg: &SwapLeg, protocols: &[ProtocolInteraction]) -> String {
    lookup_protocol(&leg.pool)
        .map(|known| known.name.to_string())
        .or_else(|| protocols.first().map(|p| p.protocol.clone()))
        .unwrap_or_else(|| "Unknown".to_string())
}

fn one_unit(decimals: u8) -> U256 {
    U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .unwrap_or(U256::MAX)
}

/// Scale an amount to 18 decimals.
fn normalize(amount: U256, decimals: u8) -> U256 {
    match decimals.cmp(&18) {
        std::cmp::Ordering::Less => amount.saturating_mul(one_unit(18 - decimals)),
        std::cmp::Ordering::Equal => amount,
        std::cmp::Ordering::Greater => amount / one_unit(decimals - 18),
    }
}

fn detect_flash_loan(input: &ArbitrageInput<'_>, config: &ArbitrageConfig) -> Option<ArbitragePattern> {
    let lenders = input.protocols.iter().filter(|p| p.flash_loans()).count();
    if lenders == 0 {
        return None;
    }

    let material = input.flows.iter().any(|flow| {
        let threshold = one_unit(input.decimals_of(&flow.token))
            .saturating_mul(U256::from(config.flash_loan_min_units));
        flow.amount > threshold
    });
    if !material {
        return None;
    }

    if !input.protocols.iter().any(|p| p.swaps() && !p.flash_loans()) {
        return None;
    }

    let confidence = if lenders > 1 { Confidence::High } else { Confidence::Medium };
    Some(input.pattern(ArbitrageKind::FlashLoan, confidence, input.protocols.len() + 2))
}

fn detect_triangular(input: &ArbitrageInput<'_>, config: &ArbitrageConfig) -> Option<ArbitragePattern> {
    if distinct_tokens(input.flows).len() < 3 {
        return None;
    }
    let swaps = swap_sequence(input.flows);
    let (first, last) = (swaps.first()?, swaps.last()?);
    if swaps.len() < config.triangular_min_swaps || first.token_in != last.token_out {
        return None;
    }
    Some(input.pattern(ArbitrageKind::Triangular, Confidence::High, swaps.len()))
}

fn detect_cross_protocol(input: &ArbitrageInput<'_>, config: &ArbitrageConfig) -> Option<ArbitragePattern> {
    let dexes: BTreeSet<&str> = input
        .protocols
        .iter()
        .filter(|p| p.swaps())
        .map(|p| p.protocol.as_str())
        .collect();
    if dexes.len() < 2 || distinct_tokens(input.flows).len() < 2 {
        return None;
    }
    if erc20_transfers(input.flows).count() < config.cross_protocol_min_transfers {
        return None;
    }
    let confidence = if dexes.len() >= 3 { Confidence::High } else { Confidence::Medium };
    Some(input.pattern(ArbitrageKind::CrossProtocol, confidence, input.protocols.len()))
}

fn detect_simple(input: &ArbitrageInput<'_>, config: &ArbitrageConfig) -> Option<ArbitragePattern> {
    if input.protocols.len() != 2 || input.protocols[0].protocol == input.protocols[1].protocol {
        return None;
    }
    let tokens = distinct_tokens(input.flows);
    if tokens.len() != 2 {
        return None;
    }

    let flat = tokens.iter().all(|token| {
        let volume = input
            .flows
            .iter()
            .filter(|f| f.token == *token)
            .fold(U256::ZERO, |acc, f| acc.saturating_add(f.amount));
        let relative = volume.saturating_mul(U256::from(config.near_zero_bps)) / U256::from(10_000u64);
        let tolerance = relative.max(U256::from(config.near_zero_raw_tolerance));
        input.trading_net(token).unsigned_abs() <= tolerance
    });
    if !flat {
        return None;
    }

    Some(input.pattern(ArbitrageKind::Simple, Confidence::High, 1))
}

fn detect_statistical(input: &ArbitrageInput<'_>, config: &ArbitrageConfig) -> Option<ArbitragePattern> {
    let flows = input.flows;
    if input.protocols.len() < config.statistical_min_protocols
        || distinct_tokens(flows).len() < config.statistical_min_tokens
        || flows.len() < config.statistical_min_flows
    {
        return None;
    }

    let total = flows.iter().fold(U256::ZERO, |acc, f| {
        acc.saturating_add(normalize(f.amount, input.decimals_of(&f.token)))
    });
    let average = total / U256::from(flows.len());
    let ceiling = U256::from(config.statistical_avg_milli_units).saturating_mul(one_unit(15));
    if average >= ceiling {
        return None;
    }

    let complexity = input.protocols.len() + flows.len() / 2;
    Some(input.pattern(ArbitrageKind::Statistical, Confidence::Medium, complexity))
}

/// Classify a transaction as arbitrage.
///
/// # Arguments
/// * `input` - Protocols, flows and positions of the transaction
/// * `config` - Classifier thresholds
///
/// # Returns
/// The highest-priority matching pattern, if any.
pub fn detect_arbitrage(input: &ArbitrageInput<'_>, config: &ArbitrageConfig) -> Option<ArbitragePattern> {
    let classifiers: [fn(&ArbitrageInput<'_>, &ArbitrageConfig) -> Option<ArbitragePattern>; 5] = [
        detect_flash_loan,
        detect_triangular,
        detect_cross_protocol,
        detect_simple,
        detect_statistical,
    ];

    let pattern = classifiers.iter().find_map(|classify| classify(input, config))?;
    info!(
        "Arbitrage detected: {} with {} protocols, confidence {:?}",
        pattern.kind.as_str(),
        pattern.protocols.len(),
        pattern.confidence
    );
    Some(pattern)
}
