//! Matching distribution built from the indexer's computed matches.

use super::indexer::{IndexerClient, IndexerMatch};
use super::rpc::RpcClient;
use super::{FetchError, MatchingDistributionSource};
use crate::chains::ChainEndpoint;
use crate::models::{MatchingDistribution, MatchingStatsData, PayoutToken};
use crate::units::{format_units, UnitsError};
use async_trait::async_trait;
use tracing::{debug, warn};

pub struct IndexerMatchingSource {
    indexer: IndexerClient,
    rpc: RpcClient,
}

impl IndexerMatchingSource {
    pub fn new(indexer: IndexerClient, rpc: RpcClient) -> Self {
        Self { indexer, rpc }
    }

    /// Keep the payout hash unless the chain says the transaction reverted.
    async fn confirm_payout(&self, endpoint: &ChainEndpoint, hash: String) -> Option<String> {
        match self.rpc.transaction_succeeded(endpoint, &hash).await {
            Ok(Some(false)) => {
                warn!(hash = %hash, "Payout transaction reverted, not linking it");
                None
            }
            Ok(_) => Some(hash),
            Err(e) => {
                warn!(hash = %hash, error = %e, "Could not confirm payout transaction");
                Some(hash)
            }
        }
    }
}

#[async_trait]
impl MatchingDistributionSource for IndexerMatchingSource {
    async fn matching_distribution(
        &self,
        round_id: &str,
        endpoint: &ChainEndpoint,
        token: &PayoutToken,
        matching_pool_usd: f64,
    ) -> Result<MatchingDistribution, FetchError> {
        let chain_id = endpoint.chain_id();
        let matches = self.indexer.matches(chain_id, round_id).await?;
        let matching_distribution = build_distribution(&matches, token, matching_pool_usd)?;

        let payout_txn_hash = match self.indexer.payout_txn_hash(chain_id, round_id).await {
            Ok(Some(hash)) => self.confirm_payout(endpoint, hash).await,
            Ok(None) => None,
            Err(e) => {
                warn!(round_id = round_id, error = %e, "Payout lookup failed");
                None
            }
        };

        debug!(
            round_id = round_id,
            projects = matching_distribution.len(),
            paid_out = payout_txn_hash.is_some(),
            "Loaded matching distribution"
        );

        Ok(MatchingDistribution {
            matching_distribution,
            payout_txn_hash,
        })
    }
}

/// Convert raw matches into per-project stats.
///
/// A project's pool share is its matched amount over the total matched, and
/// its USD value is that share of `matching_pool_usd`.
pub fn build_distribution(
    matches: &[IndexerMatch],
    token: &PayoutToken,
    matching_pool_usd: f64,
) -> Result<Vec<MatchingStatsData>, UnitsError> {
    let amounts = matches
        .iter()
        .map(|m| format_units(&m.matched, token.decimal))
        .collect::<Result<Vec<f64>, UnitsError>>()?;
    let total: f64 = amounts.iter().sum();

    Ok(matches
        .iter()
        .zip(amounts)
        .map(|(m, match_amount)| {
            let match_pool_percentage = if total > 0.0 { match_amount / total } else { 0.0 };
            MatchingStatsData {
                project_id: m.project_id.clone(),
                application_id: Some(m.application_id.clone()).filter(|id| !id.is_empty()),
                project_payout_address: m.payout_address.clone(),
                contributions_count: m.contributions_count,
                match_amount_in_token: m.matched.clone(),
                match_amount,
                match_amount_usd: match_pool_percentage * matching_pool_usd,
                match_pool_percentage,
            }
        })
        .collect())
}
