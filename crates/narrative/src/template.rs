//! Deterministic narrator built from the structured result alone.

use crate::{AnalysisKind, Narrative, NarrativeGenerator, NarrativeResult};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Narrator that needs no network access.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateNarrator;

fn text<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or("unknown")
}

fn amounts(value: &Value, pointer: &str) -> Vec<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    let sign = if item["isProfit"].as_bool().unwrap_or(false) { "+" } else { "-" };
                    format!("{}{}", sign, text(item, "/formattedAmount"))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn protocol_names(analysis: &Value) -> Vec<String> {
    analysis["protocols"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|p| p["protocol"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn role_label(role: &str) -> &'static str {
    match role {
        "front-run" => "Front-Run",
        "back-run" => "Back-Run",
        _ => "Victim",
    }
}

fn join_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(", ")
    }
}

impl TemplateNarrator {
    fn sandwich(analysis: &Value) -> Narrative {
        let sandwich = &analysis["sandwich"];
        let role = role_label(text(sandwich, "/targetRole"));
        let attacker_pnl = amounts(sandwich, "/pattern/attackerPositions/netProfitOrLoss");

        Narrative {
            strategy: format!("Sandwich Attack - {}", role),
            confidence: text(sandwich, "/pattern/confidence").to_string(),
            summary: format!(
                "Transaction is the {} leg of a sandwich by {}",
                role.to_ascii_lowercase(),
                text(sandwich, "/attacker")
            ),
            narrative: vec![
                format!("Detected via {}", text(analysis, "/detectionMethod")),
                format!(
                    "Front-run {} then victim {} then back-run {}",
                    text(sandwich, "/pattern/frontRun/hash"),
                    text(sandwich, "/pattern/victim/hash"),
                    text(sandwich, "/pattern/backRun/hash")
                ),
                format!("Attacker net position: {}", join_or(&attacker_pnl, "flat")),
                format!(
                    "Attacker spread on {}/{}: {} bps",
                    text(sandwich, "/pattern/priceImpact/tokenA/symbol"),
                    text(sandwich, "/pattern/priceImpact/tokenB/symbol"),
                    text(sandwich, "/pattern/priceImpact/attackerSpreadBps")
                ),
                format!("Attacker gas spent: {}", text(sandwich, "/attackerGasSpent")),
            ],
            details: Map::new(),
        }
    }

    fn arbitrage(analysis: &Value) -> Narrative {
        let arbitrage = &analysis["arbitrage"];
        let steps = arbitrage["swapPath"].as_array().map_or(0, Vec::len);
        let pnl = amounts(analysis, "/financials/netProfitOrLoss");

        Narrative {
            strategy: format!("Arbitrage - {}", text(arbitrage, "/pattern/type")),
            confidence: text(arbitrage, "/pattern/confidence").to_string(),
            summary: format!(
                "Arbitrage across {} with {} swap steps",
                join_or(&protocol_names(analysis), "unknown protocols"),
                steps
            ),
            narrative: vec![
                format!("Net position: {}", join_or(&pnl, "flat")),
                format!("Gas cost: {}", text(analysis, "/gasAnalysis/gasCost")),
            ],
            details: Map::new(),
        }
    }

    fn swap(analysis: &Value) -> Narrative {
        let details = &analysis["swapDetails"];
        Narrative {
            strategy: "Swap".to_string(),
            confidence: "high".to_string(),
            summary: format!(
                "Swapped {} for {}",
                text(details, "/assetIn/formattedAmount"),
                text(details, "/assetOut/formattedAmount")
            ),
            narrative: vec![
                format!("Swap type: {}", text(details, "/swapType")),
                format!(
                    "Protocols: {}",
                    join_or(&protocol_names(analysis), "none recognized")
                ),
                format!("Gas cost: {}", text(analysis, "/gasAnalysis/gasCost")),
            ],
            details: Map::new(),
        }
    }
}

#[async_trait]
impl NarrativeGenerator for TemplateNarrator {
    async fn generate(&self, analysis: &Value) -> NarrativeResult<Narrative> {
        Ok(match AnalysisKind::of(analysis) {
            AnalysisKind::Sandwich => Self::sandwich(analysis),
            AnalysisKind::Arbitrage => Self::arbitrage(analysis),
            AnalysisKind::Swap => Self::swap(analysis),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sandwich_narrative_names_role() {
        let analysis = json!({
            "type": "Sandwich",
            "detectionMethod": "pattern-analysis",
            "sandwich": {
                "targetRole": "victim",
                "attacker": "0xabc",
                "pattern": {
                    "confidence": "high",
                    "attackerPositions": {
                        "netProfitOrLoss": [{"formattedAmount": "0.5 WETH", "isProfit": true}]
                    }
                }
            }
        });

        let narrative = TemplateNarrator.generate(&analysis).await.unwrap();
        assert_eq!(narrative.strategy, "Sandwich Attack - Victim");
        assert_eq!(narrative.confidence, "high");
        assert!(narrative.narrative.iter().any(|line| line.contains("+0.5 WETH")));
    }

    #[tokio::test]
    async fn test_swap_narrative_tolerates_missing_fields() {
        let narrative = TemplateNarrator.generate(&json!({"type": "Swap"})).await.unwrap();
        assert_eq!(narrative.strategy, "Swap");
        assert_eq!(narrative.summary, "Swapped unknown for unknown");
    }
}
