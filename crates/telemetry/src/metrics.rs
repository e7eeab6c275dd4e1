//! Prometheus metrics for the MEVScope analyzer.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Metrics collector for the analyzer service.
///
/// Each instance owns its registry so several collectors can coexist in one
/// process (tests, embedded use).
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    analyses: IntCounterVec,
    analysis_failures: IntCounterVec,
    provider_errors: IntCounter,
    provider_latency: HistogramVec,
}

impl Metrics {
    /// Create a new metrics instance.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let analyses = IntCounterVec::new(
            Opts::new("mevscope_analyses_total", "Completed analyses by result type"),
            &["type"],
        )?;
        let analysis_failures = IntCounterVec::new(
            Opts::new("mevscope_analysis_failures_total", "Failed analyses by error kind"),
            &["kind"],
        )?;
        let provider_errors = IntCounter::new(
            "mevscope_provider_errors_total",
            "Chain-data provider requests that failed after retry",
        )?;
        let provider_latency = HistogramVec::new(
            HistogramOpts::new(
                "mevscope_provider_latency_seconds",
                "Chain-data provider request latency in seconds",
            ),
            &["operation"],
        )?;

        registry.register(Box::new(analyses.clone()))?;
        registry.register(Box::new(analysis_failures.clone()))?;
        registry.register(Box::new(provider_errors.clone()))?;
        registry.register(Box::new(provider_latency.clone()))?;

        Ok(Self {
            registry,
            analyses,
            analysis_failures,
            provider_errors,
            provider_latency,
        })
    }

    /// Count a completed analysis.
    pub fn inc_analyses(&self, analysis_type: &str) {
        self.analyses.with_label_values(&[analysis_type]).inc();
    }

    /// Count a failed analysis.
    pub fn inc_analysis_failures(&self, kind: &str) {
        self.analysis_failures.with_label_values(&[kind]).inc();
    }

    pub fn inc_provider_errors(&self) {
        self.provider_errors.inc();
    }

    /// Record provider request latency.
    pub fn observe_provider_latency(&self, operation: &str, duration_secs: f64) {
        self.provider_latency
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    /// Get Prometheus metrics in text exposition format.
    pub fn gather(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_are_independent() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();

        first.inc_analyses("Sandwich");
        first.inc_analysis_failures("upstream");
        first.observe_provider_latency("eth_getBlockByNumber", 0.25);

        let text = first.gather().unwrap();
        assert!(text.contains("mevscope_analyses_total{type=\"Sandwich\"} 1"));
        assert!(text.contains("mevscope_analysis_failures_total{kind=\"upstream\"} 1"));
        assert!(text.contains("mevscope_provider_latency_seconds_count{operation=\"eth_getBlockByNumber\"} 1"));

        assert!(!second.gather().unwrap().contains("Sandwich"));
    }
}
