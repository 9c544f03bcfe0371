//! Chain access over JSON-RPC through alloy providers.

use super::FetchError;
use crate::chains::ChainEndpoint;
use alloy::network::ReceiptResponse;
use alloy::primitives::TxHash;
use alloy::providers::{Provider, ProviderBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RpcClient {
    timeout: Duration,
}

impl RpcClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn provider(&self, endpoint: &ChainEndpoint) -> Result<impl Provider, FetchError> {
        let url = endpoint
            .rpc_url()
            .parse()
            .map_err(|_| FetchError::InvalidRpcUrl(endpoint.to_string()))?;
        Ok(ProviderBuilder::new().connect_http(url))
    }

    /// Bound a provider call by the configured timeout.
    async fn timed<T, F>(&self, endpoint: &ChainEndpoint, call: F) -> Result<T, FetchError>
    where
        F: Future<Output = alloy::transports::TransportResult<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|source| FetchError::Rpc {
                endpoint: endpoint.to_string(),
                source,
            }),
            Err(_) => Err(FetchError::Timeout(endpoint.to_string())),
        }
    }

    /// Latest block number of the chain.
    pub async fn block_number(&self, endpoint: &ChainEndpoint) -> Result<u64, FetchError> {
        let provider = self.provider(endpoint)?;
        let block = self.timed(endpoint, provider.get_block_number()).await?;
        debug!(endpoint = %endpoint, block = block, "Fetched chain head");
        Ok(block)
    }

    /// Whether a mined transaction succeeded; `None` when the node doesn't
    /// know the transaction.
    pub async fn transaction_succeeded(
        &self,
        endpoint: &ChainEndpoint,
        hash: &str,
    ) -> Result<Option<bool>, FetchError> {
        let tx_hash: TxHash = hash
            .parse()
            .map_err(|_| FetchError::InvalidTxHash(hash.to_string()))?;

        let provider = self.provider(endpoint)?;
        let receipt = self
            .timed(endpoint, provider.get_transaction_receipt(tx_hash))
            .await?;

        Ok(receipt.map(|r| r.status()))
    }
}
