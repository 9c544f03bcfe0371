//! Data models for round report cards.
//!
//! This module contains the round, application and matching records as
//! served by the indexer, plus the enriched view models the aggregator
//! produces for the report page.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Static reference data for a token a round can pay out in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutToken {
    /// Display symbol.
    pub name: String,
    /// Chain the token lives on.
    pub chain_id: u64,
    /// Token contract address (zero address for the native coin).
    pub address: String,
    /// Decimal precision of the raw amounts.
    pub decimal: u8,
}

/// Quadratic funding settings of a round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuadraticFundingConfig {
    /// Matching pool size, in human-scaled token units.
    #[serde(default)]
    pub matching_funds_available: Option<f64>,
    /// Whether a per-project matching cap applies.
    #[serde(default)]
    pub matching_cap: bool,
    /// Matching cap as a percentage of the pool.
    #[serde(default)]
    pub matching_cap_amount: Option<f64>,
    /// Minimum donation (USD) counted for matching.
    #[serde(default)]
    pub min_donation_threshold_amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    #[serde(default)]
    pub description: Option<String>,
}

/// Round metadata blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quadratic_funding_config: Option<QuadraticFundingConfig>,
    #[serde(default)]
    pub eligibility: Option<Eligibility>,
}

/// A funding round as listed by the indexer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// Round contract address.
    pub id: String,
    #[serde(default)]
    pub chain_id: u64,
    /// Payout token address.
    pub token: String,
    /// Raw match amount as a decimal integer string.
    #[serde(default, deserialize_with = "string_or_number")]
    pub match_amount: String,
    #[serde(default, rename = "matchAmountUSD")]
    pub match_amount_usd: f64,
    /// Total crowdfunded value.
    #[serde(default, rename = "amountUSD")]
    pub amount_usd: f64,
    #[serde(default)]
    pub votes: u64,
    #[serde(default)]
    pub unique_contributors: u64,
    /// Unix seconds.
    #[serde(default, deserialize_with = "optional_u64")]
    pub round_end_time: Option<u64>,
    #[serde(default, deserialize_with = "optional_u64")]
    pub updated_at_block: Option<u64>,
    #[serde(default)]
    pub metadata: Option<RoundMetadata>,
}

impl Round {
    /// The matching pool size, if the round is quadratic-funding configured.
    /// An empty pool counts as unconfigured.
    pub fn matching_funds_available(&self) -> Option<f64> {
        self.metadata
            .as_ref()
            .and_then(|m| m.quadratic_funding_config.as_ref())
            .and_then(|qf| qf.matching_funds_available)
            .filter(|funds| *funds > 0.0)
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.name.as_deref())
    }
}

/// A round enriched with its payout token and USD conversions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRound {
    #[serde(flatten)]
    pub round: Round,
    pub matching_fund_payout_token: PayoutToken,
    /// Match amount scaled by the token's decimals.
    pub token_amount: f64,
    /// USD per token used for conversions.
    pub rate: f64,
    #[serde(rename = "matchingPoolUSD")]
    pub matching_pool_usd: f64,
}

/// Matching result for a single project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingStatsData {
    pub project_id: String,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub project_payout_address: Option<String>,
    #[serde(default)]
    pub contributions_count: u64,
    /// Raw matched amount in token base units.
    #[serde(default)]
    pub match_amount_in_token: String,
    /// Matched amount in human-scaled token units.
    pub match_amount: f64,
    #[serde(default, rename = "matchAmountUSD")]
    pub match_amount_usd: f64,
    #[serde(default)]
    pub match_pool_percentage: f64,
}

/// Matching distribution of a round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingDistribution {
    pub matching_distribution: Vec<MatchingStatsData>,
    #[serde(default)]
    pub payout_txn_hash: Option<String>,
}

/// Review status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationStatus::Pending => write!(f, "Pending"),
            ApplicationStatus::Approved => write!(f, "Approved"),
            ApplicationStatus::Rejected => write!(f, "Rejected"),
            ApplicationStatus::Cancelled => write!(f, "Cancelled"),
            ApplicationStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_img: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationBody {
    #[serde(default)]
    pub project: Option<ProjectDetails>,
    #[serde(default)]
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationMetadata {
    #[serde(default)]
    pub application: Option<ApplicationBody>,
}

/// One project's submission to a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectApplication {
    pub id: String,
    pub project_id: String,
    pub status: ApplicationStatus,
    #[serde(default, rename = "amountUSD")]
    pub amount_usd: f64,
    #[serde(default)]
    pub votes: u64,
    #[serde(default)]
    pub unique_contributors: u64,
    #[serde(default)]
    pub metadata: Option<ApplicationMetadata>,
    /// Joined from the matching distribution by project id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_data: Option<MatchingStatsData>,
}

impl ProjectApplication {
    fn project(&self) -> Option<&ProjectDetails> {
        self.metadata
            .as_ref()
            .and_then(|m| m.application.as_ref())
            .and_then(|a| a.project.as_ref())
    }

    /// Project title, falling back to the project id.
    pub fn title(&self) -> &str {
        self.project()
            .and_then(|p| p.title.as_deref())
            .unwrap_or(&self.project_id)
    }

    pub fn description(&self) -> Option<&str> {
        self.project().and_then(|p| p.description.as_deref())
    }

    pub fn website(&self) -> Option<&str> {
        self.project().and_then(|p| p.website.as_deref())
    }

    /// Matched amount in token units, zero when unmatched.
    pub fn match_amount(&self) -> f64 {
        self.matching_data
            .as_ref()
            .map(|m| m.match_amount)
            .unwrap_or(0.0)
    }
}

/// Descriptive text of a round from the off-chain store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundInfo {
    #[serde(default)]
    pub preamble: Option<String>,
}

pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

pub(crate) fn optional_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => Ok(n.as_u64()),
        serde_json::Value::String(s) if s.is_empty() => Ok(None),
        serde_json::Value::String(s) => s
            .parse::<u64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!(
            "expected unsigned integer, got {}",
            other
        ))),
    }
}
