//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// reportcards - Gitcoin round report cards
///
/// Serves report card pages for Gitcoin grant rounds, or renders a single
/// round's report to a file.
///
/// Examples:
///   reportcards
///   reportcards --bind 0.0.0.0:8080 --infura-api-key <KEY>
///   reportcards --chain-id 424 --round 0xd95a1969c41112cee9a2c931e849bcef36a16f4c
///   reportcards --chain-id 10 --round 0x... --format json --output report.json
///   reportcards --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .reportcards.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address the HTTP server listens on
    #[arg(short, long, value_name = "ADDR", env = "REPORTCARDS_BIND")]
    pub bind: Option<String>,

    /// Base URL of the round indexer
    #[arg(long, value_name = "URL", env = "REPORTCARDS_INDEXER_URL")]
    pub indexer_url: Option<String>,

    /// Base URL of the round description store
    #[arg(long, value_name = "URL", env = "REPORTCARDS_ROUND_INFO_URL")]
    pub round_info_url: Option<String>,

    /// Infura API key for chains without a public RPC endpoint
    #[arg(long, value_name = "KEY", env = "INFURA_API_KEY", hide_env_values = true)]
    pub infura_api_key: Option<String>,

    /// Request timeout in seconds for every upstream call
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Render one round and exit instead of serving (requires --round)
    #[arg(long, value_name = "ID", requires = "round")]
    pub chain_id: Option<String>,

    /// Round contract address to render (requires --chain-id)
    #[arg(long, value_name = "ADDRESS", requires = "chain_id")]
    pub round: Option<String>,

    /// Output format of a rendered round
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the rendered round to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .reportcards.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format of a one-shot render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown report page (default)
    #[default]
    Markdown,
    /// Aggregated report as JSON
    Json,
    /// Card statistics as JSON
    Card,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The `(chain id, round id)` to render, when running one-shot.
    pub fn render_target(&self) -> Option<(&str, &str)> {
        self.chain_id.as_deref().zip(self.round.as_deref())
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        for (name, url) in [
            ("Indexer URL", &self.indexer_url),
            ("Round info URL", &self.round_info_url),
        ] {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(format!("{} must start with 'http://' or 'https://'", name));
                }
            }
        }

        if let Some(ref bind) = self.bind {
            if bind.parse::<SocketAddr>().is_err() {
                return Err(format!("Invalid bind address: {}", bind));
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some((chain_id, round_id)) = self.render_target() {
            crate::server::parse_round_path(chain_id, round_id).map_err(|e| e.to_string())?;
        } else if self.output.is_some() {
            return Err("--output only applies when rendering a round".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
