//! External collaborators the report aggregator talks to.
//!
//! Each collaborator sits behind an `async_trait` so the aggregator can be
//! exercised against in-memory fakes. The HTTP implementations live in the
//! submodules.

pub mod http;
pub mod indexer;
pub mod matching;
pub mod price;
pub mod round_info;
pub mod rpc;

use crate::chains::ChainEndpoint;
use crate::models::{MatchingDistribution, PayoutToken, ProjectApplication, Round, RoundInfo};
use crate::units::UnitsError;
use alloy::transports::TransportError;
use async_trait::async_trait;
use thiserror::Error;

pub use indexer::IndexerClient;
pub use matching::IndexerMatchingSource;
pub use price::IndexerPriceOracle;
pub use round_info::RoundInfoClient;
pub use rpc::RpcClient;

/// Failure of a single external call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON-RPC call to {endpoint} failed: {source}")]
    Rpc {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    #[error("JSON-RPC call to {0} timed out")]
    Timeout(String),

    #[error("invalid RPC URL for {0}")]
    InvalidRpcUrl(String),

    #[error("invalid transaction hash: {0}")]
    InvalidTxHash(String),

    #[error("round {round_id} not found on chain {chain_id}")]
    RoundNotFound { chain_id: u64, round_id: String },

    #[error("round info store failure: {0}")]
    Store(String),

    #[error("invalid token amount: {0}")]
    Units(#[from] UnitsError),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status: 404, .. })
            || matches!(self, FetchError::RoundNotFound { .. })
    }
}

/// A round together with the other rounds on its chain.
#[derive(Debug, Clone)]
pub struct RoundLookup {
    pub round: Round,
    pub all_rounds: Vec<Round>,
}

#[async_trait]
pub trait RoundRegistry: Send + Sync {
    /// Find a round by contract address; the comparison ignores case.
    async fn round_by_id(&self, chain_id: u64, round_id: &str) -> Result<RoundLookup, FetchError>;

    async fn rounds_by_chain(&self, chain_id: u64) -> Result<Vec<Round>, FetchError>;
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// USD price of the payout token, `None` when no price is known.
    async fn payout_token_price(
        &self,
        round_id: &str,
        endpoint: &ChainEndpoint,
        token: &PayoutToken,
        block: Option<u64>,
    ) -> Result<Option<f64>, FetchError>;
}

#[async_trait]
pub trait MatchingDistributionSource: Send + Sync {
    async fn matching_distribution(
        &self,
        round_id: &str,
        endpoint: &ChainEndpoint,
        token: &PayoutToken,
        matching_pool_usd: f64,
    ) -> Result<MatchingDistribution, FetchError>;
}

#[async_trait]
pub trait ApplicationSource: Send + Sync {
    async fn applications(
        &self,
        round_id: &str,
        chain_id: u64,
    ) -> Result<Vec<ProjectApplication>, FetchError>;
}

#[async_trait]
pub trait RoundInfoStore: Send + Sync {
    async fn round_info(&self, round_id: &str) -> Result<RoundInfo, FetchError>;
}
