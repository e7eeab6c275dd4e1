//! Natural-language narration of transaction analyses.
//!
//! This module provides a trait-based interface for narrative generators
//! that turn a structured analysis into a short human-readable story. The
//! analysis core only depends on the trait; the caller decides whether a
//! deterministic template or an LLM backend does the writing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod llm;
pub mod prompts;
pub mod template;

pub use llm::{LlmConfig, LlmNarrator};
pub use template::TemplateNarrator;

/// Error type for narrative generation.
#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    #[error("Narrative backend not configured")]
    NotConfigured,
    #[error("Narrative request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Narrative backend returned status {0}")]
    Status(u16),
    #[error("Malformed narrative response: {0}")]
    Malformed(String),
}

/// Result type for narrative operations.
pub type NarrativeResult<T> = Result<T, NarrativeError>;

/// A narrated classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub strategy: String,
    pub confidence: String,
    pub summary: String,
    #[serde(default)]
    pub narrative: Vec<String>,
    /// Any further fields the generator produced.
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

/// Trait for narrative generators.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Narrate a structured analysis.
    ///
    /// # Arguments
    /// * `analysis` - The analysis result serialized to JSON
    ///
    /// # Returns
    /// The narrative, or an error the caller is expected to tolerate.
    async fn generate(&self, analysis: &Value) -> NarrativeResult<Narrative>;
}

/// Result type of an analysis payload, read from its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Sandwich,
    Arbitrage,
    Swap,
}

impl AnalysisKind {
    /// Classify a payload; anything unrecognized is treated as a swap.
    pub fn of(analysis: &Value) -> Self {
        match analysis
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("sandwich") => AnalysisKind::Sandwich,
            Some("arbitrage") => AnalysisKind::Arbitrage,
            _ => AnalysisKind::Swap,
        }
    }
}
