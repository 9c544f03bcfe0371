//! Payout token reference table.
//!
//! The table is turned into a map keyed by `(chain id, lowercased address)`
//! once per process and never mutated afterwards.

use crate::models::PayoutToken;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::{debug, warn};

const NATIVE: &str = "0x0000000000000000000000000000000000000000";

/// `(symbol, chain id, address, decimals)`
const PAYOUT_TOKENS: &[(&str, u64, &str, u8)] = &[
    // Ethereum mainnet
    ("DAI", 1, "0x6B175474E89094C44Da98b954EedeAC495271d0F", 18),
    ("ETH", 1, NATIVE, 18),
    ("USDC", 1, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 6),
    // Goerli
    ("DAI", 5, "0x11fE4B6AE13d2a6055C8D9cF65c55bac32B5d844", 18),
    ("ETH", 5, NATIVE, 18),
    // Optimism
    ("DAI", 10, "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1", 18),
    ("ETH", 10, NATIVE, 18),
    ("USDC", 10, "0x7F5c764cBc14f9669B88837ca1490cCa17c31607", 6),
    // Polygon
    ("MATIC", 137, NATIVE, 18),
    ("USDC", 137, "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174", 6),
    // Fantom
    ("WFTM", 250, "0x21be370D5312f44cB42ce377BC9b8a0cEF1A4C83", 18),
    ("FTM", 250, NATIVE, 18),
    ("BUSD", 250, "0xC931f61B1534EB21D8c11B24f3f5Ab2471d4aB50", 18),
    ("DAI", 250, "0x8D11eC38a3EB5E956B052f67Da8Bdc9bef8Abf3E", 18),
    ("GcV", 250, "0x83791638da5EB2fAa432aff1c65fbA47c5D29510", 18),
    // zkSync Era
    ("ETH", 324, NATIVE, 18),
    ("DAI", 324, "0x4B9eb6c0b6ea15176BBF62841C6B2A8a398cb656", 18),
    // Public Goods Network
    ("ETH", 424, NATIVE, 18),
    ("DAI", 424, "0x6C121674ba6736644A7e73A8741407fE8a5eE5BA", 18),
    // Fantom testnet
    ("DAI", 4002, "0xEdE59D58d9B8061Ff7D22E629AB2afa01af496f4", 18),
    ("FTM", 4002, NATIVE, 18),
    // Base
    ("ETH", 8453, NATIVE, 18),
    ("USDC", 8453, "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", 6),
    // Arbitrum One
    ("ETH", 42161, NATIVE, 18),
    ("USDC", 42161, "0xaf88d065e77c8cC2239327C5EDb3A432268e5831", 6),
    ("ARB", 42161, "0x912CE59144191C1204E64559FE8253a0e49E6548", 18),
    // Avalanche
    ("AVAX", 43114, NATIVE, 18),
    ("USDC", 43114, "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E", 6),
    // PGN testnet
    ("ETH", 58008, NATIVE, 18),
    // Sepolia
    ("ETH", 11155111, NATIVE, 18),
];

/// Process-wide payout token registry.
pub static PAYOUT_TOKEN_REGISTRY: Lazy<PayoutTokenRegistry> = Lazy::new(|| {
    PayoutTokenRegistry::from_tokens(PAYOUT_TOKENS.iter().map(
        |(name, chain_id, address, decimal)| PayoutToken {
            name: name.to_string(),
            chain_id: *chain_id,
            address: address.to_string(),
            decimal: *decimal,
        },
    ))
});

/// Payout tokens keyed by `(chain id, lowercased address)`.
#[derive(Debug, Default)]
pub struct PayoutTokenRegistry {
    tokens: HashMap<(u64, String), PayoutToken>,
}

impl PayoutTokenRegistry {
    /// Build a registry. When two entries share a chain and address the
    /// first one is kept.
    pub fn from_tokens(tokens: impl IntoIterator<Item = PayoutToken>) -> Self {
        let mut map: HashMap<(u64, String), PayoutToken> = HashMap::new();

        for token in tokens {
            let key = (token.chain_id, token.address.to_lowercase());
            if let Some(existing) = map.get(&key) {
                warn!(
                    chain_id = token.chain_id,
                    address = %token.address,
                    kept = %existing.name,
                    ignored = %token.name,
                    "Duplicate payout token entry"
                );
                continue;
            }
            map.insert(key, token);
        }

        debug!(count = map.len(), "Payout token registry built");
        Self { tokens: map }
    }

    /// Look up a payout token; address comparison ignores letter case.
    pub fn lookup(&self, chain_id: u64, address: &str) -> Option<&PayoutToken> {
        self.tokens.get(&(chain_id, address.to_lowercase()))
    }
}
