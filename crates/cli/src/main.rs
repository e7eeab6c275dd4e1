//! CLI application for the MEVScope transaction analyzer.

mod server;

use clap::{Args, Parser, Subcommand};
use mevscope_heuristics::{AnalyzerConfig, TokenRegistry, TransactionAnalyzer};
use mevscope_ingestion::{HttpChainProvider, ProviderConfig};
use mevscope_narrative::{LlmConfig, LlmNarrator, NarrativeGenerator, TemplateNarrator};
use mevscope_telemetry::{init_logging, Metrics};
use server::AppState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "mevscope")]
#[command(about = "Classify EVM transactions as sandwich, arbitrage or swap")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single transaction and print the report as JSON
    Analyze {
        /// Chain id of the transaction
        chain_id: u64,

        /// 0x-prefixed transaction hash
        tx_hash: String,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Start the HTTP API
    Serve {
        /// API bind address
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind_address: String,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Chain-data gateway base URL
    #[arg(long, env = "MEVSCOPE_API_BASE_URL", default_value = mevscope_ingestion::rpc_client::DEFAULT_BASE_URL)]
    api_base_url: String,

    /// Chain-data gateway API key
    #[arg(long, env = "MEVSCOPE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible API key; the template narrator is used without it
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Chat model used for narratives
    #[arg(long, default_value = mevscope_narrative::llm::DEFAULT_MODEL)]
    llm_model: String,

    /// JSON file overriding analyzer thresholds
    #[arg(long)]
    config: Option<PathBuf>,

    /// Timeout of each gateway request in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Sample output path for audit logs
    #[arg(long)]
    sample_output_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            chain_id,
            tx_hash,
            common,
        } => {
            init_logging(common.log_level.as_deref())?;
            let state = build_state(common)?;
            let output = state.run_analysis(chain_id, &tx_hash).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Serve {
            bind_address,
            common,
        } => {
            init_logging(common.log_level.as_deref())?;
            let state = build_state(common)?;
            server::serve(&bind_address, Arc::new(state)).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AnalyzerConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let config = serde_json::from_str(&raw)?;
            info!("Loaded analyzer config from {:?}", path);
            Ok(config)
        }
        None => Ok(AnalyzerConfig::default()),
    }
}

fn build_narrator(api_key: Option<String>, model: String) -> anyhow::Result<Arc<dyn NarrativeGenerator>> {
    match api_key.filter(|key| !key.trim().is_empty()) {
        Some(key) => {
            let config = LlmConfig {
                model,
                ..LlmConfig::new(key)
            };
            Ok(Arc::new(LlmNarrator::new(config)?))
        }
        None => {
            warn!("No LLM API key configured, using template narratives");
            Ok(Arc::new(TemplateNarrator))
        }
    }
}

fn build_state(args: CommonArgs) -> anyhow::Result<AppState> {
    let config = load_config(args.config.as_deref())?;
    let metrics = Metrics::new()?;

    let provider_config = ProviderConfig {
        base_url: args.api_base_url,
        api_key: args.api_key.filter(|key| !key.trim().is_empty()),
        timeout: Duration::from_secs(args.timeout_secs),
        ..ProviderConfig::default()
    };
    let provider = Arc::new(HttpChainProvider::new(provider_config, metrics.clone())?);
    let registry = Arc::new(TokenRegistry::new(provider.clone()));
    let narrator = build_narrator(args.openai_api_key, args.llm_model)?;

    Ok(AppState {
        analyzer: TransactionAnalyzer::new(provider, registry, narrator, config),
        metrics,
        sample_output_path: args.sample_output_path,
    })
}
