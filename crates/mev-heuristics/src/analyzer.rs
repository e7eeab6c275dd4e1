//! Transaction analysis pipeline.
//!
//! Fetches the target's receipt, trace and block, builds the net-position
//! baseline, then tries sandwich detection, arbitrage classification and
//! finally falls back to a plain swap report. The structured result is
//! handed to a narrative generator whose failure never fails the analysis.

use crate::accounting::{combine_net_changes, format_token_amount, NetPositions};
use crate::config::AnalyzerConfig;
use crate::controlled::{resolve_controlled, ControlledAddressSet};
use crate::detectors::arbitrage::{detect_arbitrage, swap_protocol, swap_sequence, ArbitrageInput};
use crate::detectors::bot_profile::profile_bot;
use crate::detectors::sandwich::{Candidate, SandwichDetector, SandwichMatch, SandwichTransaction};
use crate::error::{AnalysisError, AnalyzerResult};
use crate::flows::{distinct_tokens, extract_token_flows, TokenFlow};
use crate::gas::analyze_gas;
use crate::model::{TokenInfo, TransactionTrace};
use crate::networks::{network, Network};
use crate::protocols::{detect_protocols, ProtocolInteraction};
use crate::provider::ChainDataProvider;
use crate::registry::TokenRegistry;
use crate::report::{
    price_impact_inputs, AnalysisResult, AnalysisType, ArbitrageAnalysis, Financials,
    LegSummary, PriceImpact, SandwichAnalysis, SandwichPattern, SwapDetails, SwapStep,
    TransactionMetadata,
};
use alloy::primitives::{Address, B256};
use futures::future::join_all;
use mevscope_narrative::{Narrative, NarrativeGenerator};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Structured result plus its narrative.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    #[serde(flatten)]
    pub analysis: AnalysisResult,
    pub narrative: Option<Narrative>,
}

/// Parse a transaction hash: `0x` followed by exactly 64 hex digits.
pub fn parse_tx_hash(input: &str) -> AnalyzerResult<B256> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or_else(|| AnalysisError::InvalidInput(format!("transaction hash must start with 0x: {}", input)))?;
    if digits.len() != 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AnalysisError::InvalidInput(format!(
            "transaction hash must be 64 hex digits: {}",
            input
        )));
    }
    input
        .parse::<B256>()
        .map_err(|e| AnalysisError::InvalidInput(format!("invalid transaction hash {}: {}", input, e)))
}

/// Resolve a chain id against the supported network table.
pub fn supported_network(chain_id: u64) -> AnalyzerResult<&'static Network> {
    network(chain_id)
        .ok_or_else(|| AnalysisError::InvalidInput(format!("unsupported chain id {}", chain_id)))
}

/// Per-transaction derived data, computed once per trace.
struct TraceView {
    trace: Arc<TransactionTrace>,
    controlled: ControlledAddressSet,
    flows: Vec<TokenFlow>,
    positions: NetPositions,
    protocols: Vec<ProtocolInteraction>,
}

impl TraceView {
    fn new(trace: Arc<TransactionTrace>, config: &AnalyzerConfig) -> Self {
        let controlled = resolve_controlled(&trace, config.resolution);
        let flows = extract_token_flows(&trace);
        let positions = NetPositions::compute(&trace, &controlled, &flows);
        let protocols = detect_protocols(&trace);
        Self {
            trace,
            controlled,
            flows,
            positions,
            protocols,
        }
    }
}

/// Entry point of the analysis core.
pub struct TransactionAnalyzer {
    provider: Arc<dyn ChainDataProvider>,
    registry: Arc<TokenRegistry>,
    narrator: Arc<dyn NarrativeGenerator>,
    config: AnalyzerConfig,
}

impl TransactionAnalyzer {
    /// Create an analyzer.
    ///
    /// # Arguments
    /// * `provider` - Chain-data provider
    /// * `registry` - Shared token metadata cache
    /// * `narrator` - Narrative generator for finished results
    /// * `config` - Detection thresholds
    pub fn new(
        provider: Arc<dyn ChainDataProvider>,
        registry: Arc<TokenRegistry>,
        narrator: Arc<dyn NarrativeGenerator>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            narrator,
            config,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze a transaction and narrate the result.
    ///
    /// # Arguments
    /// * `chain_id` - Chain of the transaction
    /// * `tx_hash` - `0x`-prefixed transaction hash
    ///
    /// # Returns
    /// The structured result with its narrative, or a typed error. Input
    /// errors are raised before any remote call.
    pub async fn analyze(&self, chain_id: u64, tx_hash: &str) -> AnalyzerResult<AnalysisOutput> {
        let analysis = self.classify(chain_id, tx_hash).await?;
        let narrative = self.narrate(&analysis).await;
        Ok(AnalysisOutput {
            analysis,
            narrative,
        })
    }

    /// Run the detection pipeline without narration.
    pub async fn classify(&self, chain_id: u64, tx_hash: &str) -> AnalyzerResult<AnalysisResult> {
        let network = supported_network(chain_id)?;
        let hash = parse_tx_hash(tx_hash)?;
        info!("Analyzing {} on {}", hash, network.name);

        let receipt = self
            .provider
            .transaction_receipt(chain_id, hash)
            .await?
            .ok_or_else(|| AnalysisError::not_found("transaction receipt", hash))?;

        let mut trace = self
            .provider
            .transaction_trace(chain_id, hash, receipt.block_number)
            .await?
            .ok_or_else(|| AnalysisError::not_found("transaction trace", hash))?;
        if trace.gas_price.is_zero() {
            trace.gas_price = receipt.effective_gas_price;
        }
        if trace.gas_used == 0 {
            trace.gas_used = receipt.gas_used;
        }
        let trace = Arc::new(trace);

        let detector = SandwichDetector::new(
            self.provider.as_ref(),
            chain_id,
            &self.config.sandwich,
            self.config.effective_concurrency(),
        );
        detector.seed_trace(trace.clone());
        let block = detector
            .block(receipt.block_number)
            .await?
            .ok_or_else(|| AnalysisError::not_found("block", receipt.block_number))?;

        let view = TraceView::new(trace.clone(), &self.config);
        debug!(
            "{} controlled addresses, {} flows, {} protocols",
            view.controlled.len(),
            view.flows.len(),
            view.protocols.len()
        );

        let metadata = TransactionMetadata::new(
            chain_id,
            network.name,
            network.native_symbol,
            &receipt,
            block.timestamp,
            trace.value(),
        );
        let gas_analysis = analyze_gas(
            trace.gas_used,
            trace.gas_price,
            view.protocols.len(),
            network.native_symbol,
            &self.config.gas,
        );
        let net = view.positions.net_changes();
        let (financials, swap_details) = tokio::join!(
            Financials::build(&self.registry, chain_id, &net),
            SwapDetails::build(&self.registry, chain_id, &net),
        );

        let mut result = AnalysisResult {
            analysis_type: AnalysisType::Swap,
            detection_method: "net-position".to_string(),
            metadata,
            controlled_addresses: view.controlled.iter().copied().collect(),
            protocols: view.protocols.clone(),
            gas_analysis,
            financials,
            swap_details,
            sandwich: None,
            arbitrage: None,
        };

        let target = Candidate {
            hash,
            from: receipt.from,
            block_number: receipt.block_number,
            transaction_index: receipt.transaction_index,
        };
        if let Some(found) = detector.detect(&target).await? {
            result.detection_method = found.detection_method.as_str().to_string();
            result.analysis_type = AnalysisType::Sandwich;
            result.sandwich = Some(self.sandwich_report(&detector, chain_id, network, found).await?);
            info!("{} classified as sandwich ({})", hash, result.detection_method);
            return Ok(result);
        }

        if let Some(arbitrage) = self.arbitrage_report(chain_id, &view).await {
            result.detection_method = arbitrage.pattern.kind.as_str().to_string();
            result.analysis_type = AnalysisType::Arbitrage;
            result.arbitrage = Some(arbitrage);
            info!("{} classified as arbitrage ({})", hash, result.detection_method);
            return Ok(result);
        }

        info!("{} classified as swap", hash);
        Ok(result)
    }

    async fn sandwich_report(
        &self,
        detector: &SandwichDetector<'_>,
        chain_id: u64,
        network: &Network,
        found: SandwichMatch,
    ) -> AnalyzerResult<SandwichAnalysis> {
        let front = self.leg_view(detector, &found.front_run).await?;
        let victim = self.leg_view(detector, &found.victim).await?;
        let back = self.leg_view(detector, &found.back_run).await?;

        let attacker_net = combine_net_changes([
            &front.positions.net_changes(),
            &back.positions.net_changes(),
        ]);
        let victim_net = victim.positions.net_changes();
        let (attacker_positions, victim_positions) = tokio::join!(
            Financials::build(&self.registry, chain_id, &attacker_net),
            Financials::build(&self.registry, chain_id, &victim_net),
        );

        let common_tokens = self.token_infos(chain_id, found.common_tokens.iter().copied()).await;
        let price_impact = self.price_impact(chain_id, &front, &victim, &back).await;

        let mut legs = Vec::with_capacity(3);
        for (leg, view) in [(&found.front_run, &front), (&found.victim, &victim), (&found.back_run, &back)] {
            legs.push(LegSummary {
                hash: leg.hash,
                role: leg.role,
                swap: SwapDetails::build(&self.registry, chain_id, &view.positions.net_changes()).await,
                gas_used: view.trace.gas_used,
                gas_cost: format_token_amount(view.trace.fee(), 18, network.native_symbol),
            });
        }

        let attacker = found.attacker();
        let bot_profile = profile_bot(
            self.provider.as_ref(),
            chain_id,
            attacker,
            found.front_run.block_number,
            &self.config.bot_profile,
        )
        .await;
        let attacker_gas = front.trace.fee().saturating_add(back.trace.fee());

        Ok(SandwichAnalysis {
            pattern: SandwichPattern {
                front_run: found.front_run.clone(),
                victim: found.victim.clone(),
                back_run: found.back_run.clone(),
                confidence: found.confidence,
                common_tokens,
                price_impact,
                attacker_positions,
                victim_positions,
            },
            detection_method: found.detection_method,
            target_role: found.detection_method.target_role(),
            attacker,
            legs,
            bot_profile,
            attacker_gas_spent: format_token_amount(attacker_gas, 18, network.native_symbol),
        })
    }

    async fn leg_view(
        &self,
        detector: &SandwichDetector<'_>,
        leg: &SandwichTransaction,
    ) -> AnalyzerResult<TraceView> {
        let trace = detector
            .trace(leg.hash, leg.block_number)
            .await?
            .ok_or_else(|| AnalysisError::not_found("transaction trace", leg.hash))?;
        Ok(TraceView::new(trace, &self.config))
    }

    async fn price_impact(
        &self,
        chain_id: u64,
        front: &TraceView,
        victim: &TraceView,
        back: &TraceView,
    ) -> PriceImpact {
        let victim_tokens = distinct_tokens(&victim.flows);
        let common: BTreeSet<Address> = distinct_tokens(&front.flows)
            .intersection(&victim_tokens)
            .copied()
            .collect();

        let Some(inputs) = price_impact_inputs(&front.positions, &back.positions, &common) else {
            return PriceImpact::unknown();
        };
        let (token_a, token_b) = tokio::join!(
            self.registry.token_info(chain_id, inputs.token_a),
            self.registry.token_info(chain_id, inputs.token_b),
        );
        PriceImpact {
            front_run_spent: format_token_amount(inputs.front_run_spent, token_a.decimals, &token_a.symbol),
            back_run_received: format_token_amount(inputs.back_run_received, token_a.decimals, &token_a.symbol),
            attacker_spread_bps: inputs.spread_bps,
            token_a,
            token_b,
        }
    }

    async fn arbitrage_report(&self, chain_id: u64, view: &TraceView) -> Option<ArbitrageAnalysis> {
        let tokens = distinct_tokens(&view.flows);
        let infos = self.token_infos(chain_id, tokens.iter().copied()).await;
        let decimals: BTreeMap<Address, u8> = infos.iter().map(|t| (t.address, t.decimals)).collect();

        let input = ArbitrageInput {
            protocols: &view.protocols,
            flows: &view.flows,
            positions: &view.positions,
            fee: view.trace.fee(),
            decimals: &decimals,
        };
        let pattern = detect_arbitrage(&input, &self.config.arbitrage)?;

        let by_address: BTreeMap<Address, &TokenInfo> = infos.iter().map(|t| (t.address, t)).collect();
        let info_of = |token: &Address| {
            by_address
                .get(token)
                .map(|t| (*t).clone())
                .unwrap_or_else(|| TokenInfo::unknown(*token))
        };
        let swap_path = swap_sequence(&view.flows)
            .iter()
            .enumerate()
            .map(|(i, leg)| {
                let token_in = info_of(&leg.token_in);
                let token_out = info_of(&leg.token_out);
                SwapStep {
                    step: i + 1,
                    amount_in: format_token_amount(leg.amount_in, token_in.decimals, &token_in.symbol),
                    amount_out: format_token_amount(leg.amount_out, token_out.decimals, &token_out.symbol),
                    protocol: swap_protocol(leg, &view.protocols),
                    token_in,
                    token_out,
                }
            })
            .collect();

        Some(ArbitrageAnalysis { pattern, swap_path })
    }

    async fn token_infos<I>(&self, chain_id: u64, tokens: I) -> Vec<TokenInfo>
    where
        I: IntoIterator<Item = Address>,
    {
        join_all(
            tokens
                .into_iter()
                .map(|token| self.registry.token_info(chain_id, token)),
        )
        .await
    }

    async fn narrate(&self, analysis: &AnalysisResult) -> Option<Narrative> {
        let payload = match serde_json::to_value(analysis) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Could not serialize analysis for narration: {}", e);
                return None;
            }
        };
        match self.narrator.generate(&payload).await {
            Ok(narrative) => Some(narrative),
            Err(e) => {
                warn!("Narrative generation failed: {}", e);
                None
            }
        }
    }
}
