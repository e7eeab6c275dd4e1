//! Error types for transaction analysis.
//!
//! Provider failures and analysis failures are kept apart: a provider reports
//! what went wrong on the wire, the analyzer reports what that means for the
//! caller (bad input, nothing to analyze, or an upstream outage worth retrying).

use serde::Serialize;
use std::time::Duration;

/// Error raised by a chain-data provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Whether a single retry of the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout(_) | ProviderError::Transport(_) => true,
            ProviderError::Status(status) => *status == 429 || *status >= 500,
            ProviderError::Rpc { .. } | ProviderError::Decode(_) => false,
        }
    }
}

/// Coarse error classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Upstream,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid-input",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Upstream => "upstream",
        }
    }
}

/// Error type for a single transaction analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },
    #[error("upstream unavailable: {0}")]
    Upstream(#[source] ProviderError),
    #[error("could not decode provider data: {0}")]
    Decode(String),
}

impl AnalysisError {
    pub fn not_found(what: &'static str, id: impl ToString) -> Self {
        AnalysisError::NotFound {
            what,
            id: id.to_string(),
        }
    }

    /// Classify the error for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::InvalidInput(_) => ErrorKind::InvalidInput,
            AnalysisError::NotFound { .. } => ErrorKind::NotFound,
            AnalysisError::Upstream(_) | AnalysisError::Decode(_) => ErrorKind::Upstream,
        }
    }

    /// Only upstream outages are worth retrying; bad input and missing data are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::Upstream(_))
    }
}

impl From<ProviderError> for AnalysisError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Decode(msg) => AnalysisError::Decode(msg),
            other => AnalysisError::Upstream(other),
        }
    }
}

/// Result type for analysis operations.
pub type AnalyzerResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_transience() {
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(ProviderError::Status(503).is_transient());
        assert!(ProviderError::Status(429).is_transient());
        assert!(!ProviderError::Status(400).is_transient());
        assert!(!ProviderError::Rpc {
            code: -32000,
            message: "execution reverted".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_error_kinds_are_distinguishable() {
        let input = AnalysisError::InvalidInput("bad hash".to_string());
        let missing = AnalysisError::not_found("receipt", "0xabc");
        let upstream: AnalysisError = ProviderError::Status(502).into();
        let decode: AnalysisError = ProviderError::Decode("no result".to_string()).into();

        assert_eq!(input.kind(), ErrorKind::InvalidInput);
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(upstream.kind(), ErrorKind::Upstream);
        assert_eq!(decode.kind(), ErrorKind::Upstream);

        assert!(upstream.is_retryable());
        assert!(!input.is_retryable());
        assert!(!missing.is_retryable());
    }
}
