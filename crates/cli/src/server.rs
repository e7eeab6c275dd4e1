//! HTTP API of the analyzer.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mevscope_heuristics::{AnalysisError, AnalysisOutput, AnalyzerResult, ErrorKind, TransactionAnalyzer};
use mevscope_telemetry::audit::{append_sample, AnalysisSample};
use mevscope_telemetry::Metrics;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

/// Everything a request handler needs.
pub struct AppState {
    pub analyzer: TransactionAnalyzer,
    pub metrics: Metrics,
    pub sample_output_path: Option<PathBuf>,
}

impl AppState {
    /// Analyze one transaction, recording metrics and the optional audit sample.
    pub async fn run_analysis(&self, chain_id: u64, tx_hash: &str) -> AnalyzerResult<AnalysisOutput> {
        match self.analyzer.analyze(chain_id, tx_hash).await {
            Ok(output) => {
                let analysis_type = output.analysis.analysis_type.as_str();
                self.metrics.inc_analyses(analysis_type);
                let sample = AnalysisSample::new(chain_id, tx_hash, analysis_type, &output);
                if let Err(e) = append_sample(self.sample_output_path.as_ref(), &sample) {
                    warn!("Failed to write analysis sample: {}", e);
                }
                Ok(output)
            }
            Err(e) => {
                self.metrics.inc_analysis_failures(e.kind().as_str());
                Err(e)
            }
        }
    }
}

/// Chain id as sent by clients: a JSON number or a decimal string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChainIdInput {
    Number(u64),
    Text(String),
}

impl ChainIdInput {
    fn resolve(&self) -> Result<u64, AnalysisError> {
        match self {
            ChainIdInput::Number(id) => Ok(*id),
            ChainIdInput::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| AnalysisError::InvalidInput(format!("invalid chain id: {}", text))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    chain_id: ChainIdInput,
    tx_hash: String,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: &AnalysisError) -> Response {
    let kind = err.kind();
    (
        status_for(kind),
        Json(json!({ "error": err.to_string(), "kind": kind })),
    )
        .into_response()
}

async fn analyze_transaction(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let err = AnalysisError::InvalidInput(rejection.body_text());
            state.metrics.inc_analysis_failures(err.kind().as_str());
            return error_response(&err);
        }
    };
    let chain_id = match request.chain_id.resolve() {
        Ok(id) => id,
        Err(err) => {
            state.metrics.inc_analysis_failures(err.kind().as_str());
            return error_response(&err);
        }
    };

    match state.run_analysis(chain_id, &request.tx_hash).await {
        Ok(output) => (StatusCode::OK, Json(output)).into_response(),
        Err(err) => {
            if err.kind() == ErrorKind::Upstream {
                error!("Analysis of {} on chain {} failed: {}", request.tx_hash, chain_id, err);
            } else {
                info!("Rejected analysis of {} on chain {}: {}", request.tx_hash, chain_id, err);
            }
            error_response(&err)
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, StatusCode> {
    match state.metrics.gather() {
        Ok(body) => Ok((StatusCode::OK, body)),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/analyze-transaction", post(analyze_transaction))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until Ctrl-C.
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Analyzer listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use mevscope_heuristics::{AnalyzerConfig, TokenRegistry};
    use mevscope_ingestion::{HttpChainProvider, ProviderConfig};
    use mevscope_narrative::TemplateNarrator;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state() -> Arc<AppState> {
        let metrics = Metrics::new().unwrap();
        // Nothing listens here; only requests rejected before any remote call are sent.
        let config = ProviderConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(200),
            ..ProviderConfig::default()
        };
        let provider = Arc::new(HttpChainProvider::new(config, metrics.clone()).unwrap());
        let registry = Arc::new(TokenRegistry::new(provider.clone()));
        let analyzer = TransactionAnalyzer::new(
            provider,
            registry,
            Arc::new(TemplateNarrator),
            AnalyzerConfig::default(),
        );
        Arc::new(AppState {
            analyzer,
            metrics,
            sample_output_path: None,
        })
    }

    async fn post_json(app: Router, body: Value) -> (StatusCode, Value) {
        let request = Request::post("/api/analyze-transaction")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_chain_id_accepts_number_or_string() {
        let numeric: AnalyzeRequest = serde_json::from_value(json!({"chainId": 8453, "txHash": "0x"})).unwrap();
        assert_eq!(numeric.chain_id.resolve().unwrap(), 8453);

        let text: AnalyzeRequest = serde_json::from_value(json!({"chainId": "137", "txHash": "0x"})).unwrap();
        assert_eq!(text.chain_id.resolve().unwrap(), 137);

        let bad: AnalyzeRequest = serde_json::from_value(json!({"chainId": "mainnet", "txHash": "0x"})).unwrap();
        assert!(matches!(bad.chain_id.resolve(), Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::InvalidInput), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Upstream), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_invalid_hash_is_bad_request() {
        let state = state();
        let (status, body) = post_json(router(state.clone()), json!({"chainId": 1, "txHash": "0x1234"})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid-input");

        let metrics = state.metrics.gather().unwrap();
        assert!(metrics.contains("mevscope_analysis_failures_total{kind=\"invalid-input\"} 1"));
    }

    #[tokio::test]
    async fn test_unsupported_chain_is_bad_request() {
        let hash = format!("0x{}", "ab".repeat(32));
        let (status, body) = post_json(router(state()), json!({"chainId": "999999", "txHash": hash})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("999999"));
    }

    #[tokio::test]
    async fn test_missing_fields_are_bad_request() {
        let (status, body) = post_json(router(state()), json!({"txHash": "0x"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid-input");
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
