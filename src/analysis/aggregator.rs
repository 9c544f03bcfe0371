//! Round report aggregation.
//!
//! This module fetches everything a report card needs for one round and
//! merges it into a single [`RoundReport`]. Every step yields a
//! [`StepResult`]: a fatal failure ends the aggregation, a soft failure is
//! recorded and the step's fallback is used. The caller always gets a report
//! back, with `None` in place of whatever could not be gathered.

use crate::chains::{ChainEndpoint, EndpointError, EndpointTable};
use crate::models::{
    EnrichedRound, MatchingDistribution, MatchingStatsData, PayoutToken, ProjectApplication,
    Round, RoundInfo,
};
use crate::sources::{
    ApplicationSource, FetchError, MatchingDistributionSource, PriceOracle, RoundInfoStore,
    RoundLookup, RoundRegistry,
};
use crate::tokens::{PayoutTokenRegistry, PAYOUT_TOKEN_REGISTRY};
use crate::units::{format_units, UnitsError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

static PARAGRAPH_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?p(\s[^>]*)?>").expect("paragraph tag pattern"));
static LINE_BREAK_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("line break pattern"));

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("round lookup failed: {0}")]
    RoundLookup(#[source] FetchError),

    #[error("round {0} has no matching funds configured")]
    MissingMatchingConfig(String),

    #[error("no payout token {address} on chain {chain_id}")]
    UnknownPayoutToken { chain_id: u64, address: String },

    #[error("invalid match amount: {0}")]
    InvalidMatchAmount(#[from] UnitsError),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("price lookup failed: {0}")]
    Price(#[source] FetchError),

    #[error("no price known for {0}")]
    PriceUnavailable(String),

    #[error("matching distribution unavailable: {0}")]
    MatchingDistribution(#[source] FetchError),

    #[error("application lookup failed: {0}")]
    Applications(#[source] FetchError),

    #[error("round has no applications")]
    NoApplications,

    #[error("round info unavailable: {0}")]
    RoundInfo(#[source] FetchError),
}

/// The aggregation steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    RoundLookup,
    PayoutToken,
    TokenAmount,
    Endpoint,
    Price,
    MatchingDistribution,
    Applications,
    RoundInfo,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::RoundLookup => "round_lookup",
            Step::PayoutToken => "payout_token",
            Step::TokenAmount => "token_amount",
            Step::Endpoint => "endpoint",
            Step::Price => "price",
            Step::MatchingDistribution => "matching_distribution",
            Step::Applications => "applications",
            Step::RoundInfo => "round_info",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Ends the aggregation.
    Fatal,
    /// Recorded; the step's section is left out or a fallback is used.
    Soft,
}

#[derive(Debug)]
pub struct StepFailure {
    pub step: Step,
    pub severity: Severity,
    pub error: AggregationError,
}

impl StepFailure {
    pub fn fatal(step: Step, error: impl Into<AggregationError>) -> Self {
        Self {
            step,
            severity: Severity::Fatal,
            error: error.into(),
        }
    }

    pub fn soft(step: Step, error: impl Into<AggregationError>) -> Self {
        Self {
            step,
            severity: Severity::Soft,
            error: error.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

pub type StepResult<T> = Result<T, StepFailure>;

/// Everything a report card shows for one round.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReport {
    #[serde(rename = "roundData")]
    pub round: Option<EnrichedRound>,
    pub round_info: Option<RoundInfo>,
    pub applications: Option<Vec<ProjectApplication>>,
    pub all_rounds: Option<Vec<Round>>,
    pub payout_txn_hash: Option<String>,
    /// Diagnostics only, never shown to visitors.
    #[serde(skip)]
    pub failures: Vec<StepFailure>,
}

impl RoundReport {
    /// Keep the value of a successful step, or log and record its failure.
    fn record<T>(&mut self, result: StepResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(failure) => {
                warn!(step = %failure.step, error = %failure.error, "Continuing without step result");
                self.failures.push(failure);
                None
            }
        }
    }

    pub fn has_fatal_failure(&self) -> bool {
        self.failures.iter().any(StepFailure::is_fatal)
    }
}

/// The external collaborators an aggregator needs.
#[derive(Clone)]
pub struct Sources {
    pub registry: Arc<dyn RoundRegistry>,
    pub prices: Arc<dyn PriceOracle>,
    pub matching: Arc<dyn MatchingDistributionSource>,
    pub applications: Arc<dyn ApplicationSource>,
    pub round_info: Arc<dyn RoundInfoStore>,
}

pub struct RoundReportAggregator {
    sources: Sources,
    endpoints: EndpointTable,
    tokens: &'static PayoutTokenRegistry,
}

impl RoundReportAggregator {
    pub fn new(sources: Sources, endpoints: EndpointTable) -> Self {
        Self {
            sources,
            endpoints,
            tokens: &PAYOUT_TOKEN_REGISTRY,
        }
    }

    /// All rounds on a chain, for the round switcher.
    pub async fn rounds_by_chain(&self, chain_id: u64) -> Result<Vec<Round>, FetchError> {
        self.sources.registry.rounds_by_chain(chain_id).await
    }

    /// Build the report for a round. Never fails; see [`RoundReport::failures`].
    #[instrument(skip(self))]
    pub async fn aggregate(&self, chain_id: u64, round_id: &str) -> RoundReport {
        let mut report = RoundReport::default();

        if let Err(failure) = self.run(chain_id, round_id, &mut report).await {
            warn!(step = %failure.step, error = %failure.error, "Round report aborted");
            report.failures.push(failure);
        } else {
            info!(
                applications = report.applications.as_ref().map_or(0, Vec::len),
                soft_failures = report.failures.len(),
                "Round report ready"
            );
        }

        report
    }

    async fn run(&self, chain_id: u64, round_id: &str, report: &mut RoundReport) -> StepResult<()> {
        let RoundLookup { round, all_rounds } = self.lookup_round(chain_id, round_id).await?;
        let matching_funds = round.matching_funds_available().ok_or_else(|| {
            StepFailure::fatal(
                Step::RoundLookup,
                AggregationError::MissingMatchingConfig(round.id.clone()),
            )
        })?;
        let token = self.resolve_token(chain_id, &round)?;
        let token_amount = format_units(&round.match_amount, token.decimal)
            .map_err(|e| StepFailure::fatal(Step::TokenAmount, e))?;

        let endpoint = report.record(self.endpoint(chain_id));

        let price = match &endpoint {
            Some(endpoint) => report
                .record(self.price(&round, endpoint, &token).await)
                .flatten(),
            None => None,
        };
        let rate = effective_rate(price, round.match_amount_usd, token_amount);
        let matching_pool_usd = matching_pool_usd(matching_funds, rate);

        let canonical_id = round.id.clone();
        report.all_rounds = Some(all_rounds);
        report.round = Some(EnrichedRound {
            round,
            matching_fund_payout_token: token.clone(),
            token_amount,
            rate,
            matching_pool_usd,
        });

        let distribution = match &endpoint {
            Some(endpoint) => report.record(
                self.distribution(&canonical_id, endpoint, &token, matching_pool_usd)
                    .await,
            ),
            None => None,
        };
        report.payout_txn_hash = distribution
            .as_ref()
            .and_then(|d| d.payout_txn_hash.clone());

        let applications = self.applications(&canonical_id, chain_id).await?;
        let mut applications = join_matching(
            applications,
            distribution
                .map(|d| d.matching_distribution)
                .unwrap_or_default(),
        );
        sort_by_match_amount(&mut applications);
        report.applications = Some(applications);

        report.round_info = report
            .record(self.round_info(&canonical_id).await)
            .map(clean_round_info);

        Ok(())
    }

    async fn lookup_round(&self, chain_id: u64, round_id: &str) -> StepResult<RoundLookup> {
        self.sources
            .registry
            .round_by_id(chain_id, round_id)
            .await
            .map_err(|e| StepFailure::fatal(Step::RoundLookup, AggregationError::RoundLookup(e)))
    }

    fn resolve_token(&self, chain_id: u64, round: &Round) -> StepResult<PayoutToken> {
        self.tokens
            .lookup(chain_id, &round.token)
            .cloned()
            .ok_or_else(|| {
                StepFailure::fatal(
                    Step::PayoutToken,
                    AggregationError::UnknownPayoutToken {
                        chain_id,
                        address: round.token.clone(),
                    },
                )
            })
    }

    fn endpoint(&self, chain_id: u64) -> StepResult<ChainEndpoint> {
        self.endpoints
            .endpoint_for(chain_id)
            .map_err(|e| StepFailure::soft(Step::Endpoint, e))
    }

    /// `Ok(None)` is never returned: a missing price is reported as a soft
    /// failure so the fallback rate shows up in the diagnostics.
    async fn price(
        &self,
        round: &Round,
        endpoint: &ChainEndpoint,
        token: &PayoutToken,
    ) -> StepResult<Option<f64>> {
        match self
            .sources
            .prices
            .payout_token_price(&round.id, endpoint, token, round.updated_at_block)
            .await
        {
            Ok(Some(price)) => Ok(Some(price)),
            Ok(None) => Err(StepFailure::soft(
                Step::Price,
                AggregationError::PriceUnavailable(token.name.clone()),
            )),
            Err(e) => Err(StepFailure::soft(Step::Price, AggregationError::Price(e))),
        }
    }

    async fn distribution(
        &self,
        round_id: &str,
        endpoint: &ChainEndpoint,
        token: &PayoutToken,
        matching_pool_usd: f64,
    ) -> StepResult<MatchingDistribution> {
        self.sources
            .matching
            .matching_distribution(round_id, endpoint, token, matching_pool_usd)
            .await
            .map_err(|e| {
                StepFailure::soft(
                    Step::MatchingDistribution,
                    AggregationError::MatchingDistribution(e),
                )
            })
    }

    async fn applications(&self, round_id: &str, chain_id: u64) -> StepResult<Vec<ProjectApplication>> {
        let applications = self
            .sources
            .applications
            .applications(round_id, chain_id)
            .await
            .map_err(|e| StepFailure::fatal(Step::Applications, AggregationError::Applications(e)))?;

        if applications.is_empty() {
            return Err(StepFailure::fatal(
                Step::Applications,
                AggregationError::NoApplications,
            ));
        }
        Ok(applications)
    }

    async fn round_info(&self, round_id: &str) -> StepResult<RoundInfo> {
        self.sources
            .round_info
            .round_info(round_id)
            .await
            .map_err(|e| StepFailure::soft(Step::RoundInfo, AggregationError::RoundInfo(e)))
    }
}

/// USD per payout token: the oracle price when there is one, otherwise the
/// round's own `matchAmountUSD / tokenAmount`. Zero when the round has no
/// token amount to divide by.
pub fn effective_rate(price: Option<f64>, match_amount_usd: f64, token_amount: f64) -> f64 {
    match price {
        Some(price) => price,
        None if token_amount == 0.0 => 0.0,
        None => match_amount_usd / token_amount,
    }
}

pub fn matching_pool_usd(matching_funds_available: f64, rate: f64) -> f64 {
    matching_funds_available * rate
}

/// Attach each application's matching entry by project id. The first entry
/// for a project wins; applications without an entry keep `None`.
pub fn join_matching(
    applications: Vec<ProjectApplication>,
    distribution: Vec<MatchingStatsData>,
) -> Vec<ProjectApplication> {
    let mut by_project: HashMap<String, MatchingStatsData> = HashMap::new();
    for entry in distribution {
        by_project.entry(entry.project_id.clone()).or_insert(entry);
    }

    applications
        .into_iter()
        .map(|mut application| {
            application.matching_data = by_project.get(&application.project_id).cloned();
            application
        })
        .collect()
}

/// Sort applications by matched amount, most matched first.
pub fn sort_by_match_amount(applications: &mut [ProjectApplication]) {
    applications.sort_by(|a, b| {
        b.match_amount()
            .partial_cmp(&a.match_amount())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Strip `<p>` tags and turn `<br>` into newlines.
pub fn clean_preamble(preamble: &str) -> String {
    let without_paragraphs = PARAGRAPH_TAG.replace_all(preamble, "");
    LINE_BREAK_TAG
        .replace_all(&without_paragraphs, "\n")
        .into_owned()
}

fn clean_round_info(info: RoundInfo) -> RoundInfo {
    RoundInfo {
        preamble: info.preamble.as_deref().map(clean_preamble),
    }
}
