//! Client for the off-chain round description store.

use super::http::{get_json, join_url};
use super::{FetchError, RoundInfoStore};
use crate::models::RoundInfo;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const DEFAULT_ROUND_INFO_URL: &str = "https://reportcards.gitcoin.co/api/round-info";

/// Envelope the store wraps every answer in.
#[derive(Debug, Deserialize)]
struct RoundInfoEnvelope {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<RoundInfo>,
}

#[derive(Debug, Clone)]
pub struct RoundInfoClient {
    client: Client,
    base_url: String,
}

impl RoundInfoClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RoundInfoStore for RoundInfoClient {
    async fn round_info(&self, round_id: &str) -> Result<RoundInfo, FetchError> {
        let url = join_url(&self.base_url, round_id);
        let envelope: RoundInfoEnvelope = get_json(&self.client, &url).await?;

        if !envelope.success {
            return Err(FetchError::Store(
                envelope
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(envelope.data.unwrap_or_default())
    }
}
