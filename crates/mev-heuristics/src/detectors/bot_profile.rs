//! MEV bot profiling.
//!
//! Advisory only: a profile never gates detection and never fails an analysis.

use crate::config::BotProfileConfig;
use crate::error::ProviderError;
use crate::model::Confidence;
use crate::protocols::lookup_protocol;
use crate::provider::ChainDataProvider;
use alloy::primitives::{address, Address, U256};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Addresses of well-known searchers.
pub const KNOWN_BOTS: &[(Address, &str)] = &[
    (address!("a5a13f62ce1113838e0d9b4559b8caf5f76463c0"), "MEV Bot (Jaredfromsubway.eth)"),
    (address!("00000000003b3cc22af3ae1eac0440bcee416b40"), "MEV Bot (Generic)"),
    (address!("55555558d89e3a3885b5652a9d82b26a62f8373b"), "MEV Bot (Multi-strategy)"),
    (address!("271960a542b0e9e18b87010e976722df1492e854"), "MEV Bot (Arbitrage)"),
    (address!("0000000000000d6a469742a35639169f4543b59f"), "MEV Bot (Flashbots Searcher)"),
    (address!("5050e08626c499411b5d0e0b5af0e83d3fd82edf"), "MEV Bot"),
    (address!("56178a0d5f301baf6cf3e17126ea71bd1e4e1ca1"), "Sandwich Bot"),
    (address!("0000000099cb7fc48a935bceb9f05bbae54e8987"), "Flashloan Bot"),
    (address!("74de5d4fcbf63e00296fd95d33236b9794016631"), "Arbitrage Bot"),
    (address!("93a34a2e5572f88302061645e5d153835f8d998c"), "MEV Bot (SushiSwap & Uniswap)"),
    (address!("da9dfa130df4de4673b89022ee50ff26f6ea73cf"), "MEV Bot (Beaver Build)"),
];

pub fn known_bot_label(address: &Address) -> Option<&'static str> {
    KNOWN_BOTS
        .iter()
        .find(|(bot, _)| bot == address)
        .map(|(_, label)| *label)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MevBotProfile {
    pub address: Address,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_label: Option<&'static str>,
    /// Average gas price of sampled transactions, gwei with two decimals.
    pub avg_gas_price: String,
    /// Transactions from the address in the sampled blocks.
    pub tx_frequency: usize,
    pub high_gas_price: bool,
    pub preferred_protocols: Vec<String>,
}

impl MevBotProfile {
    fn known(address: Address, label: &'static str) -> Self {
        Self {
            address,
            confidence: Confidence::High,
            known_label: Some(label),
            avg_gas_price: "0.00".to_string(),
            tx_frequency: 0,
            high_gas_price: false,
            preferred_protocols: Vec::new(),
        }
    }

    fn unavailable(address: Address) -> Self {
        Self {
            address,
            confidence: Confidence::Low,
            known_label: None,
            avg_gas_price: "0.00".to_string(),
            tx_frequency: 0,
            high_gas_price: false,
            preferred_protocols: Vec::new(),
        }
    }
}

/// Convert wei to gwei, rounded to two decimals.
fn to_gwei(wei: U256) -> Decimal {
    let wei = u128::try_from(wei).unwrap_or(u128::MAX);
    // Decimal holds 96-bit mantissas; anything beyond is not a real gas price
    Decimal::from_i128_with_scale(wei.min(i64::MAX as u128) as i128, 9).round_dp(2)
}

/// Profile an address as a potential MEV bot.
///
/// # Arguments
/// * `provider` - Chain-data provider used to sample recent blocks
/// * `chain_id` - Chain to sample
/// * `address` - Address to profile
/// * `block_number` - Newest block of the sample
/// * `config` - Sample size and thresholds
pub async fn profile_bot(
    provider: &dyn ChainDataProvider,
    chain_id: u64,
    address: Address,
    block_number: u64,
    config: &BotProfileConfig,
) -> MevBotProfile {
    if let Some(label) = known_bot_label(&address) {
        debug!("{} is a known bot: {}", address, label);
        return MevBotProfile::known(address, label);
    }

    match sample(provider, chain_id, address, block_number, config).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!("Bot profiling for {} degraded: {}", address, e);
            MevBotProfile::unavailable(address)
        }
    }
}

async fn sample(
    provider: &dyn ChainDataProvider,
    chain_id: u64,
    address: Address,
    block_number: u64,
    config: &BotProfileConfig,
) -> Result<MevBotProfile, ProviderError> {
    let mut gas_prices = Vec::new();
    let mut protocols = BTreeSet::new();

    for offset in 0..config.sample_blocks {
        let Some(number) = block_number.checked_sub(offset) else {
            break;
        };
        let Some(block) = provider.block(chain_id, number).await? else {
            continue;
        };
        for tx in block.transactions.iter().filter(|tx| tx.from == address) {
            gas_prices.push(tx.gas_price);
            if let Some(known) = tx.to.as_ref().and_then(lookup_protocol) {
                protocols.insert(known.name.to_string());
            }
        }
    }

    let tx_frequency = gas_prices.len();
    let average = if gas_prices.is_empty() {
        U256::ZERO
    } else {
        gas_prices
            .iter()
            .fold(U256::ZERO, |acc, p| acc.saturating_add(*p))
            / U256::from(tx_frequency)
    };
    let avg_gwei = to_gwei(average);

    let threshold = config.frequent_tx_threshold;
    let confidence = if tx_frequency >= threshold.saturating_mul(2) {
        Confidence::High
    } else if tx_frequency >= threshold {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    Ok(MevBotProfile {
        address,
        confidence,
        known_label: None,
        avg_gas_price: format!("{:.2}", avg_gwei),
        tx_frequency,
        high_gas_price: avg_gwei >= Decimal::from(config.high_gas_price_gwei),
        preferred_protocols: protocols.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gwei_conversion() {
        assert_eq!(format!("{:.2}", to_gwei(U256::from(25_123_456_789u64))), "25.12");
        assert_eq!(format!("{:.2}", to_gwei(U256::ZERO)), "0.00");
    }

    #[test]
    fn test_known_bot_lookup() {
        let jared = address!("a5a13f62ce1113838e0d9b4559b8caf5f76463c0");
        assert_eq!(known_bot_label(&jared), Some("MEV Bot (Jaredfromsubway.eth)"));
        assert_eq!(known_bot_label(&Address::ZERO), None);
        assert_eq!(KNOWN_BOTS.len(), 11);
    }
}
