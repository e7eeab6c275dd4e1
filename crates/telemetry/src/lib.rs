//! Observability for the MEVScope analyzer: structured logs, Prometheus
//! metrics and audit samples of analysis results.

pub mod audit;
pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::Metrics;
