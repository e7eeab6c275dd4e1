//! Bot profiling against sampled blocks.

mod common;

use alloy::primitives::{address, Address};
use common::{addr, hash, FakeChain, Tx};
use mevscope_heuristics::config::BotProfileConfig;
use mevscope_heuristics::detectors::profile_bot;
use mevscope_heuristics::model::Confidence;

const CHAIN: u64 = 1;
const UNISWAP_V2: Address = address!("7a250d5630b4cf539739df2c5dacb4c659f2488d");

/// `count` transactions from `from`, hashes starting at `first_hash`.
fn txs_from(from: Address, count: u8, first_hash: u8) -> Vec<Tx> {
    (0..count)
        .map(|i| Tx::new(hash(first_hash + i), from, UNISWAP_V2, vec![], vec![]))
        .collect()
}

#[tokio::test]
async fn test_frequency_thresholds() {
    let bot = addr(0x0a);
    let config = BotProfileConfig::default();
    let threshold = config.frequent_tx_threshold as u8;

    let cases = [
        (threshold - 1, Confidence::Low),
        (threshold, Confidence::Medium),
        (threshold * 2 - 1, Confidence::Medium),
        (threshold * 2, Confidence::High),
    ];
    for (count, expected) in cases {
        let mut txs = txs_from(bot, count, 0x01);
        txs.push(Tx::new(hash(0xf0), addr(0x0b), addr(0x50), vec![], vec![]));
        let chain = FakeChain::new().with_block(500, txs);

        let profile = profile_bot(&chain, CHAIN, bot, 500, &config).await;
        assert_eq!(profile.tx_frequency, count as usize);
        assert_eq!(profile.confidence, expected, "{} transactions", count);
    }
}

#[tokio::test]
async fn test_sample_spans_recent_blocks_only() {
    let bot = addr(0x0a);
    let config = BotProfileConfig::default();

    // 12 + 8 inside the five sampled blocks, 30 more outside
    let chain = FakeChain::new()
        .with_block(500, txs_from(bot, 12, 0x01))
        .with_block(497, txs_from(bot, 8, 0x20))
        .with_block(495, txs_from(bot, 30, 0x40));

    let profile = profile_bot(&chain, CHAIN, bot, 500, &config).await;
    assert_eq!(profile.tx_frequency, 20);
    assert_eq!(profile.confidence, Confidence::High);
    assert_eq!(profile.avg_gas_price, "1.00");
    assert!(!profile.high_gas_price);
    assert_eq!(profile.preferred_protocols, vec!["Uniswap V2 Router".to_string()]);
    assert!(profile.known_label.is_none());
}

#[tokio::test]
async fn test_known_bot_skips_sampling() {
    let jared = address!("a5a13f62ce1113838e0d9b4559b8caf5f76463c0");
    let chain = FakeChain::new();

    let profile = profile_bot(&chain, CHAIN, jared, 500, &BotProfileConfig::default()).await;
    assert_eq!(profile.confidence, Confidence::High);
    assert_eq!(profile.known_label, Some("MEV Bot (Jaredfromsubway.eth)"));
    assert_eq!(chain.requests(), 0);
}

#[tokio::test]
async fn test_sampling_failure_degrades_to_low() {
    let bot = addr(0x0a);
    let mut chain = FakeChain::new().with_block(500, txs_from(bot, 25, 0x01));
    chain.outage = true;

    let profile = profile_bot(&chain, CHAIN, bot, 500, &BotProfileConfig::default()).await;
    assert_eq!(profile.confidence, Confidence::Low);
    assert_eq!(profile.tx_frequency, 0);
}
