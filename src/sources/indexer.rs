//! Client for the Allo indexer's static JSON data.
//!
//! The indexer publishes per-chain files under `/data/{chain_id}/...`:
//! the round list, and per round the applications, the computed matches and
//! the payout transactions. Token prices are published per chain.

use super::http::{get_json, join_url};
use super::{ApplicationSource, FetchError, RoundLookup, RoundRegistry};
use crate::models::{optional_u64, string_or_number, ApplicationStatus, ProjectApplication, Round};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

pub const DEFAULT_INDEXER_URL: &str = "https://indexer-production.fly.dev";

/// One computed match as published by the indexer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerMatch {
    pub project_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub application_id: String,
    /// Raw matched amount in token base units.
    #[serde(deserialize_with = "string_or_number")]
    pub matched: String,
    #[serde(default)]
    pub contributions_count: u64,
    #[serde(default)]
    pub payout_address: Option<String>,
}

/// A token price observation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    pub token: String,
    pub price: f64,
    #[serde(default, deserialize_with = "optional_u64")]
    pub block: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexerPayout {
    transaction_hash: String,
}

#[derive(Debug, Clone)]
pub struct IndexerClient {
    client: Client,
    base_url: String,
}

impl IndexerClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub async fn matches(&self, chain_id: u64, round_id: &str) -> Result<Vec<IndexerMatch>, FetchError> {
        let url = self.url(&format!("data/{}/rounds/{}/matches.json", chain_id, round_id));
        get_json(&self.client, &url).await
    }

    pub async fn prices(&self, chain_id: u64) -> Result<Vec<TokenPrice>, FetchError> {
        let url = self.url(&format!("data/{}/prices.json", chain_id));
        get_json(&self.client, &url).await
    }

    /// First payout transaction hash of a round, `None` when the round has
    /// not been paid out yet.
    pub async fn payout_txn_hash(&self, chain_id: u64, round_id: &str) -> Result<Option<String>, FetchError> {
        let url = self.url(&format!("data/{}/rounds/{}/payouts.json", chain_id, round_id));
        match get_json::<Vec<IndexerPayout>>(&self.client, &url).await {
            Ok(payouts) => Ok(payouts.into_iter().next().map(|p| p.transaction_hash)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl RoundRegistry for IndexerClient {
    async fn round_by_id(&self, chain_id: u64, round_id: &str) -> Result<RoundLookup, FetchError> {
        let all_rounds = self.rounds_by_chain(chain_id).await?;

        let round = all_rounds
            .iter()
            .find(|r| r.id.eq_ignore_ascii_case(round_id))
            .cloned()
            .ok_or_else(|| FetchError::RoundNotFound {
                chain_id,
                round_id: round_id.to_string(),
            })?;

        Ok(RoundLookup { round, all_rounds })
    }

    async fn rounds_by_chain(&self, chain_id: u64) -> Result<Vec<Round>, FetchError> {
        let url = self.url(&format!("data/{}/rounds.json", chain_id));
        let mut rounds: Vec<Round> = get_json(&self.client, &url).await?;

        for round in &mut rounds {
            round.chain_id = chain_id;
        }
        debug!(chain_id = chain_id, count = rounds.len(), "Loaded rounds");

        Ok(rounds)
    }
}

#[async_trait]
impl ApplicationSource for IndexerClient {
    /// Approved applications only; pending and rejected ones never show up
    /// on a report card.
    async fn applications(&self, round_id: &str, chain_id: u64) -> Result<Vec<ProjectApplication>, FetchError> {
        let url = self.url(&format!("data/{}/rounds/{}/applications.json", chain_id, round_id));
        let applications: Vec<ProjectApplication> = get_json(&self.client, &url).await?;
        let total = applications.len();

        let approved: Vec<ProjectApplication> = applications
            .into_iter()
            .filter(|a| a.status == ApplicationStatus::Approved)
            .collect();

        info!(
            round_id = round_id,
            total = total,
            approved = approved.len(),
            "Loaded applications"
        );
        Ok(approved)
    }
}
