//! Chain id to RPC endpoint routing.
//!
//! A handful of chains are served by dedicated public RPC URLs; every other
//! supported chain goes through Infura. Both lists are plain data, so adding
//! a chain never touches the routing code.

use alloy_chains::NamedChain;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Public Goods Network mainnet.
pub const PGN_CHAIN_ID: u64 = 424;

/// Chains with a dedicated public RPC endpoint.
pub const PUBLIC_RPC_ENDPOINTS: &[(u64, &str)] = &[
    (PGN_CHAIN_ID, "https://rpc.publicgoods.network"),
    (NamedChain::Fantom as u64, "https://rpcapi.fantom.network/"),
    (NamedChain::Base as u64, "https://1rpc.io/base"),
    (NamedChain::ZkSync as u64, "https://mainnet.era.zksync.io"),
];

/// Infura network names.
pub const INFURA_NETWORKS: &[(NamedChain, &str)] = &[
    (NamedChain::Mainnet, "mainnet"),
    (NamedChain::Goerli, "goerli"),
    (NamedChain::Optimism, "optimism-mainnet"),
    (NamedChain::Polygon, "polygon-mainnet"),
    (NamedChain::PolygonMumbai, "polygon-mumbai"),
    (NamedChain::Arbitrum, "arbitrum-mainnet"),
    (NamedChain::ArbitrumGoerli, "arbitrum-goerli"),
    (NamedChain::Avalanche, "avalanche-mainnet"),
    (NamedChain::AvalancheFuji, "avalanche-fuji"),
    (NamedChain::Sepolia, "sepolia"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("chain {0} has no RPC endpoint")]
    UnsupportedChain(u64),
    #[error("chain {0} requires an Infura API key")]
    MissingApiKey(u64),
}

/// Where to reach a chain's JSON-RPC interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEndpoint {
    PublicRpc { chain_id: u64, url: String },
    Infura {
        chain_id: u64,
        network: String,
        api_key: String,
    },
}

impl ChainEndpoint {
    pub fn chain_id(&self) -> u64 {
        match self {
            ChainEndpoint::PublicRpc { chain_id, .. } | ChainEndpoint::Infura { chain_id, .. } => {
                *chain_id
            }
        }
    }

    /// The HTTP URL JSON-RPC requests are posted to.
    pub fn rpc_url(&self) -> String {
        match self {
            ChainEndpoint::PublicRpc { url, .. } => url.clone(),
            ChainEndpoint::Infura {
                network, api_key, ..
            } => format!("https://{}.infura.io/v3/{}", network, api_key),
        }
    }
}

impl fmt::Display for ChainEndpoint {
    // Never prints the API key.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainEndpoint::PublicRpc { url, .. } => write!(f, "{}", url),
            ChainEndpoint::Infura { network, .. } => write!(f, "infura:{}", network),
        }
    }
}

/// Immutable `chain id -> endpoint` table.
#[derive(Debug, Clone)]
pub struct EndpointTable {
    public: HashMap<u64, String>,
    infura: HashMap<NamedChain, String>,
    infura_api_key: Option<String>,
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self::new(std::iter::empty(), None)
    }
}

impl EndpointTable {
    /// Build the table from the built-in lists plus `extra_public`
    /// entries, which override built-in routes for the same chain.
    pub fn new(
        extra_public: impl IntoIterator<Item = (u64, String)>,
        infura_api_key: Option<String>,
    ) -> Self {
        let mut public: HashMap<u64, String> = PUBLIC_RPC_ENDPOINTS
            .iter()
            .map(|(id, url)| (*id, url.to_string()))
            .collect();
        public.extend(extra_public);

        let infura = INFURA_NETWORKS
            .iter()
            .map(|(chain, network)| (*chain, network.to_string()))
            .collect();

        Self {
            public,
            infura,
            infura_api_key: infura_api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn endpoint_for(&self, chain_id: u64) -> Result<ChainEndpoint, EndpointError> {
        if let Some(url) = self.public.get(&chain_id) {
            return Ok(ChainEndpoint::PublicRpc {
                chain_id,
                url: url.clone(),
            });
        }

        let network = NamedChain::try_from(chain_id)
            .ok()
            .and_then(|chain| self.infura.get(&chain))
            .ok_or(EndpointError::UnsupportedChain(chain_id))?;
        let api_key = self
            .infura_api_key
            .clone()
            .ok_or(EndpointError::MissingApiKey(chain_id))?;

        Ok(ChainEndpoint::Infura {
            chain_id,
            network: network.clone(),
            api_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_chains_use_dedicated_rpc() {
        let table = EndpointTable::new(std::iter::empty(), Some("key".to_string()));

        for (id, url) in PUBLIC_RPC_ENDPOINTS {
            let endpoint = table.endpoint_for(*id).unwrap();
            assert_eq!(endpoint.rpc_url(), *url);
            assert_eq!(endpoint.chain_id(), *id);
        }
    }

    #[test]
    fn test_other_chains_use_infura() {
        let table = EndpointTable::new(std::iter::empty(), Some("secret".to_string()));

        let endpoint = table.endpoint_for(NamedChain::Optimism as u64).unwrap();
        assert_eq!(
            endpoint.rpc_url(),
            "https://optimism-mainnet.infura.io/v3/secret"
        );
        assert_eq!(endpoint.to_string(), "infura:optimism-mainnet");
    }

    #[test]
    fn test_missing_key_and_unknown_chain() {
        let table = EndpointTable::new(std::iter::empty(), Some(String::new()));
        assert_eq!(
            table.endpoint_for(NamedChain::Mainnet as u64),
            Err(EndpointError::MissingApiKey(1))
        );
        assert_eq!(
            table.endpoint_for(77),
            Err(EndpointError::UnsupportedChain(77))
        );
        // Known to alloy but not routed anywhere
        assert_eq!(
            table.endpoint_for(NamedChain::FantomTestnet as u64),
            Err(EndpointError::UnsupportedChain(4002))
        );
        // Public chains never need the key
        assert!(table.endpoint_for(PGN_CHAIN_ID).is_ok());
    }

    #[test]
    fn test_extra_public_endpoints_override() {
        let table = EndpointTable::new(
            vec![
                (NamedChain::Mainnet as u64, "http://localhost:8545".to_string()),
                (31337, "http://localhost:8546".to_string()),
            ],
            None,
        );

        assert_eq!(
            table.endpoint_for(NamedChain::Mainnet as u64).unwrap().rpc_url(),
            "http://localhost:8545"
        );
        assert_eq!(
            table.endpoint_for(31337).unwrap().rpc_url(),
            "http://localhost:8546"
        );
    }
}
