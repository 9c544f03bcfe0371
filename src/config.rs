//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.reportcards.toml` files.

use crate::chains::EndpointTable;
use crate::sources::indexer::DEFAULT_INDEXER_URL;
use crate::sources::round_info::DEFAULT_ROUND_INFO_URL;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = ".reportcards.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Round indexer settings.
    #[serde(default)]
    pub indexer: IndexerConfig,

    /// Round description store settings.
    #[serde(default)]
    pub round_info: RoundInfoConfig,

    /// Chain RPC settings.
    #[serde(default)]
    pub rpc: RpcConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    #[serde(default = "default_indexer_url")]
    pub url: String,

    /// Timeout applied to every upstream request, not only the indexer.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            url: default_indexer_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_indexer_url() -> String {
    DEFAULT_INDEXER_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundInfoConfig {
    #[serde(default = "default_round_info_url")]
    pub url: String,
}

impl Default for RoundInfoConfig {
    fn default() -> Self {
        Self {
            url: default_round_info_url(),
        }
    }
}

fn default_round_info_url() -> String {
    DEFAULT_ROUND_INFO_URL.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Infura API key; chains routed through Infura are unavailable without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infura_api_key: Option<String>,

    /// Extra public endpoints, overriding the built-in ones per chain.
    #[serde(default)]
    pub public_endpoints: Vec<PublicEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicEndpoint {
    pub chain_id: u64,
    pub url: String,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.reportcards.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their environment fallbacks) take precedence over
    /// config file settings, but only when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref bind) = args.bind {
            self.server.bind = bind.clone();
        }
        if let Some(ref url) = args.indexer_url {
            self.indexer.url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.indexer.timeout_seconds = timeout;
        }
        if let Some(ref url) = args.round_info_url {
            self.round_info.url = url.clone();
        }
        if let Some(ref key) = args.infura_api_key {
            self.rpc.infura_api_key = Some(key.clone());
        }
    }

    /// Build the chain endpoint table described by the `[rpc]` section.
    pub fn endpoint_table(&self) -> EndpointTable {
        EndpointTable::new(
            self.rpc
                .public_endpoints
                .iter()
                .map(|e| (e.chain_id, e.url.clone())),
            self.rpc.infura_api_key.clone(),
        )
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
