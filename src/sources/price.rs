//! Payout token pricing from the indexer's price feed.

use super::indexer::{IndexerClient, TokenPrice};
use super::rpc::RpcClient;
use super::{FetchError, PriceOracle};
use crate::chains::ChainEndpoint;
use crate::models::PayoutToken;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Prices a token at a block: the indexer observation with the highest
/// block not after the target. Without an explicit block the chain head is
/// asked for over JSON-RPC.
pub struct IndexerPriceOracle {
    indexer: IndexerClient,
    rpc: RpcClient,
}

impl IndexerPriceOracle {
    pub fn new(indexer: IndexerClient, rpc: RpcClient) -> Self {
        Self { indexer, rpc }
    }
}

#[async_trait]
impl PriceOracle for IndexerPriceOracle {
    async fn payout_token_price(
        &self,
        round_id: &str,
        endpoint: &ChainEndpoint,
        token: &PayoutToken,
        block: Option<u64>,
    ) -> Result<Option<f64>, FetchError> {
        let target_block = match block {
            Some(block) => block,
            None => match self.rpc.block_number(endpoint).await {
                Ok(head) => head,
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "Chain head unavailable, using latest price");
                    u64::MAX
                }
            },
        };

        let prices = self.indexer.prices(endpoint.chain_id()).await?;
        let price = select_price(&prices, &token.address, target_block);

        debug!(
            round_id = round_id,
            token = %token.name,
            block = target_block,
            price = ?price,
            "Resolved payout token price"
        );
        Ok(price)
    }
}

/// Latest usable price for `token` at or before `block`.
///
/// Observations without a block number count as block 0. Non-positive or
/// non-finite prices are skipped.
pub fn select_price(prices: &[TokenPrice], token: &str, block: u64) -> Option<f64> {
    prices
        .iter()
        .filter(|p| p.token.eq_ignore_ascii_case(token))
        .filter(|p| p.price.is_finite() && p.price > 0.0)
        .filter(|p| p.block.unwrap_or(0) <= block)
        .max_by_key(|p| p.block.unwrap_or(0))
        .map(|p| p.price)
}
