//! reportcards - Gitcoin round report cards
//!
//! Aggregates a funding round's on-chain data, matching results and
//! project applications into a report card, served over HTTP or rendered
//! once to a file.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, bind failure, write failure, etc.)
//!   2 - A rendered round could not be fully aggregated

mod analysis;
mod chains;
mod cli;
mod config;
mod models;
mod report;
mod server;
mod sources;
mod tokens;
mod units;

use analysis::{CardStats, RoundReportAggregator, Sources};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use sources::{
    http::build_client, IndexerClient, IndexerMatchingSource, IndexerPriceOracle,
    RoundInfoClient, RpcClient,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("reportcards v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Fatal: {:#}", e);
            eprintln!("\nError: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .reportcards.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the Infura key, upstream URLs and extra RPC endpoints.");
    Ok(())
}

/// Initialize logging based on verbosity settings. `RUST_LOG` wins when set.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let aggregator = Arc::new(build_aggregator(&config)?);

    if let Some((chain_id, round_id)) = args.render_target() {
        let (chain_id, round_id) = server::parse_round_path(chain_id, round_id)?;
        return render_round(&aggregator, chain_id, &round_id, &args).await;
    }

    serve(aggregator, &config.server.bind).await?;
    Ok(0)
}

/// Wire the HTTP-backed sources into an aggregator.
fn build_aggregator(config: &Config) -> Result<RoundReportAggregator> {
    let client = build_client(config.indexer.timeout_seconds)
        .context("Failed to build HTTP client")?;

    let indexer = IndexerClient::new(client.clone(), config.indexer.url.clone());
    let rpc = RpcClient::new(Duration::from_secs(config.indexer.timeout_seconds));
    let indexer_source = Arc::new(indexer.clone());

    let sources = Sources {
        registry: indexer_source.clone(),
        prices: Arc::new(IndexerPriceOracle::new(indexer.clone(), rpc.clone())),
        matching: Arc::new(IndexerMatchingSource::new(indexer, rpc)),
        applications: indexer_source,
        round_info: Arc::new(RoundInfoClient::new(client, config.round_info.url.clone())),
    };

    if config.rpc.infura_api_key.is_none() {
        warn!("No Infura API key configured; only chains with a public RPC endpoint get live prices");
    }
    info!(indexer = %config.indexer.url, "Upstream sources configured");

    Ok(RoundReportAggregator::new(sources, config.endpoint_table()))
}

/// Render one round to stdout or `--output`. Returns exit code (0 or 2).
async fn render_round(
    aggregator: &RoundReportAggregator,
    chain_id: u64,
    round_id: &str,
    args: &Args,
) -> Result<i32> {
    let report = aggregator.aggregate(chain_id, round_id).await;

    let output = match args.format {
        OutputFormat::Markdown => {
            report::generate_markdown_report(&report, report::OtherRounds::Siblings)
        }
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Card => serde_json::to_string_pretty(&CardStats::from_report(&report))?,
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to {}", path.display());
        }
        None => println!("{}", output),
    }

    for failure in &report.failures {
        warn!(step = %failure.step, fatal = failure.is_fatal(), "{}", failure.error);
    }

    Ok(if report.has_fatal_failure() { 2 } else { 0 })
}

async fn serve(aggregator: Arc<RoundReportAggregator>, bind: &str) -> Result<()> {
    let app = server::router(server::AppState { aggregator });

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
