//! MEV classification for single EVM transactions.
//!
//! Given a chain id and a transaction hash, the [`TransactionAnalyzer`]
//! reconstructs who gained and lost what, then labels the transaction as a
//! sandwich, an arbitrage or a plain swap.

pub mod accounting;
pub mod analyzer;
pub mod config;
pub mod controlled;
pub mod decode;
pub mod detectors;
pub mod erc20;
pub mod error;
pub mod flows;
pub mod gas;
pub mod model;
pub mod networks;
pub mod protocols;
pub mod provider;
pub mod registry;
pub mod report;
pub mod walker;

pub use analyzer::{parse_tx_hash, supported_network, AnalysisOutput, TransactionAnalyzer};
pub use config::AnalyzerConfig;
pub use error::{AnalysisError, AnalyzerResult, ErrorKind, ProviderError};
pub use provider::{ChainDataProvider, ProviderResult};
pub use registry::TokenRegistry;
pub use report::{AnalysisResult, AnalysisType};
