//! Analyzer configuration.
//!
//! Every threshold used by the detectors lives here so it can be tuned from a
//! JSON file without touching the heuristics. Missing fields take defaults.

use crate::controlled::ResolutionMode;
use serde::{Deserialize, Serialize};

/// Upper bound on concurrent neighbour fetches.
pub const MAX_FETCH_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AnalyzerConfig {
    pub resolution: ResolutionMode,
    /// Concurrent trace fetches during sandwich search, clamped to `1..=8`.
    pub fetch_concurrency: usize,
    pub sandwich: SandwichConfig,
    pub arbitrage: ArbitrageConfig,
    pub bot_profile: BotProfileConfig,
    pub gas: GasConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            resolution: ResolutionMode::FixedPoint,
            fetch_concurrency: 6,
            sandwich: SandwichConfig::default(),
            arbitrage: ArbitrageConfig::default(),
            bot_profile: BotProfileConfig::default(),
            gas: GasConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn effective_concurrency(&self) -> usize {
        self.fetch_concurrency.clamp(1, MAX_FETCH_CONCURRENCY)
    }
}

/// Search windows of the sandwich strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SandwichConfig {
    /// Tokens all three legs must share.
    pub min_common_tokens: usize,
    /// Transactions scanned on each side of the target by the pattern-first search.
    pub pattern_window: usize,
    /// Blocks scanned on each side by the cross-block pattern search.
    pub pattern_block_span: u64,
    /// Transactions taken from the edge of each neighbouring block.
    pub block_edge_transactions: usize,
    /// Forward distance from front-run to victim, and from victim to back-run.
    pub front_run_window: usize,
    /// Backward and forward distance searched around a victim.
    pub victim_window: usize,
    /// Backward distance searched from a back-run.
    pub back_run_window: usize,
    /// Blocks searched forward for victim and back-run with a known attacker.
    pub attacker_block_span: u64,
    /// Victim candidates tried by the attacker-anchored cross-block search.
    pub attacker_victim_candidates: usize,
}

impl Default for SandwichConfig {
    fn default() -> Self {
        Self {
            min_common_tokens: 2,
            pattern_window: 5,
            pattern_block_span: 2,
            block_edge_transactions: 10,
            front_run_window: 4,
            victim_window: 5,
            back_run_window: 5,
            attacker_block_span: 3,
            attacker_victim_candidates: 10,
        }
    }
}

/// Thresholds of the arbitrage classifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ArbitrageConfig {
    /// A flash-loan flow must exceed this many whole units of its token.
    pub flash_loan_min_units: u64,
    /// Absolute tolerance, in raw units, for a "flat" simple-arbitrage position.
    pub near_zero_raw_tolerance: u64,
    /// Relative tolerance in basis points of the token's traded volume.
    pub near_zero_bps: u64,
    /// Statistical arbitrage requires the average flow, normalized to 18
    /// decimals, to stay below this many milli-units (100 = 0.1 units).
    pub statistical_avg_milli_units: u64,
    pub statistical_min_protocols: usize,
    pub statistical_min_tokens: usize,
    pub statistical_min_flows: usize,
    pub cross_protocol_min_transfers: usize,
    pub triangular_min_swaps: usize,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            flash_loan_min_units: 1,
            near_zero_raw_tolerance: 1_000,
            near_zero_bps: 100,
            statistical_avg_milli_units: 100,
            statistical_min_protocols: 3,
            statistical_min_tokens: 4,
            statistical_min_flows: 8,
            cross_protocol_min_transfers: 4,
            triangular_min_swaps: 3,
        }
    }
}

/// Heuristics of the MEV bot profiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BotProfileConfig {
    /// Blocks sampled, counting back from the target block.
    pub sample_blocks: u64,
    /// Transactions in the sample for `medium`; twice this for `high`.
    pub frequent_tx_threshold: usize,
    /// Average gas price, in gwei, considered aggressive.
    pub high_gas_price_gwei: u64,
}

impl Default for BotProfileConfig {
    fn default() -> Self {
        Self {
            sample_blocks: 5,
            frequent_tx_threshold: 10,
            high_gas_price_gwei: 50,
        }
    }
}

/// Gas efficiency bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GasConfig {
    pub high_below: u64,
    pub low_above: u64,
    /// Gas under which a transaction touching more than two protocols still rates `high`.
    pub multi_protocol_high_below: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            high_below: 100_000,
            low_above: 500_000,
            multi_protocol_high_below: 200_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AnalyzerConfig = serde_json::from_str(
            r#"{ "resolution": "single-pass", "sandwich": { "pattern_window": 3 } }"#,
        )
        .unwrap();

        assert_eq!(config.resolution, ResolutionMode::SinglePass);
        assert_eq!(config.sandwich.pattern_window, 3);
        assert_eq!(config.sandwich.min_common_tokens, 2);
        assert_eq!(config.arbitrage, ArbitrageConfig::default());
    }

    #[test]
    fn test_concurrency_is_clamped() {
        let mut config = AnalyzerConfig::default();
        config.fetch_concurrency = 64;
        assert_eq!(config.effective_concurrency(), MAX_FETCH_CONCURRENCY);
        config.fetch_concurrency = 0;
        assert_eq!(config.effective_concurrency(), 1);
    }
}
