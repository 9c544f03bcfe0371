//! HTTP front end for report cards.

use crate::analysis::{CardStats, RoundReport, RoundReportAggregator};
use crate::models::Round;
use crate::report::{generate_markdown_report, OtherRounds};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

static ROUND_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("round address pattern"));

const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<RoundReportAggregator>,
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid chain id: {0}")]
    InvalidChainId(String),
    #[error("invalid round id: {0}")]
    InvalidRoundId(String),
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Chain whose rounds replace the round switcher list.
    pub search: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/{chain_id}/{round_id}", get(report_page))
        .route("/{chain_id}/{round_id}/report.json", get(report_json))
        .route("/{chain_id}/{round_id}/card.json", get(card_json))
        .with_state(state)
}

/// Validate the `chain_id`/`round_id` path pair.
pub fn parse_round_path(chain_id: &str, round_id: &str) -> Result<(u64, String), RequestError> {
    let chain_id = chain_id
        .parse::<u64>()
        .map_err(|_| RequestError::InvalidChainId(chain_id.to_string()))?;

    if !ROUND_ADDRESS.is_match(round_id) {
        return Err(RequestError::InvalidRoundId(round_id.to_string()));
    }

    Ok((chain_id, round_id.to_lowercase()))
}

async fn report_page(
    State(state): State<AppState>,
    Path((chain_id, round_id)): Path<(String, String)>,
    Query(params): Query<SearchParams>,
) -> Result<Response, RequestError> {
    let (chain_id, round_id) = parse_round_path(&chain_id, &round_id)?;
    let report = state.aggregator.aggregate(chain_id, &round_id).await;
    let searched = searched_rounds(&state, params.search.as_deref()).await;

    let other_rounds = match &searched {
        Some(rounds) => OtherRounds::Searched(rounds),
        None => OtherRounds::Siblings,
    };
    let page = generate_markdown_report(&report, other_rounds);

    log_served(chain_id, &round_id, &report);
    Ok(([(header::CONTENT_TYPE, MARKDOWN_CONTENT_TYPE)], page).into_response())
}

async fn report_json(
    State(state): State<AppState>,
    Path((chain_id, round_id)): Path<(String, String)>,
    Query(params): Query<SearchParams>,
) -> Result<Json<RoundReport>, RequestError> {
    let (chain_id, round_id) = parse_round_path(&chain_id, &round_id)?;
    let mut report = state.aggregator.aggregate(chain_id, &round_id).await;

    if let Some(rounds) = searched_rounds(&state, params.search.as_deref()).await {
        report.all_rounds = Some(rounds);
    }

    log_served(chain_id, &round_id, &report);
    Ok(Json(report))
}

async fn card_json(
    State(state): State<AppState>,
    Path((chain_id, round_id)): Path<(String, String)>,
) -> Result<Json<CardStats>, RequestError> {
    let (chain_id, round_id) = parse_round_path(&chain_id, &round_id)?;
    let report = state.aggregator.aggregate(chain_id, &round_id).await;

    log_served(chain_id, &round_id, &report);
    Ok(Json(CardStats::from_report(&report)))
}

/// Rounds of the `search` chain. `None` when no usable search was given or
/// the lookup failed, in which case the report's own siblings are shown.
async fn searched_rounds(state: &AppState, search: Option<&str>) -> Option<Vec<Round>> {
    let search = search.map(str::trim).filter(|s| !s.is_empty())?;

    let chain_id = match search.parse::<u64>() {
        Ok(chain_id) => chain_id,
        Err(_) => {
            warn!(search = search, "Ignoring unparsable search chain");
            return None;
        }
    };

    match state.aggregator.rounds_by_chain(chain_id).await {
        Ok(rounds) => Some(rounds),
        Err(e) => {
            warn!(chain_id = chain_id, error = %e, "Searched rounds unavailable");
            None
        }
    }
}

fn log_served(chain_id: u64, round_id: &str, report: &RoundReport) {
    info!(
        chain_id = chain_id,
        round_id = round_id,
        complete = report.failures.is_empty(),
        "Served report card"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Sources;
    use crate::chains::{ChainEndpoint, EndpointTable};
    use crate::models::{
        ApplicationStatus, MatchingDistribution, PayoutToken, ProjectApplication,
        QuadraticFundingConfig, RoundInfo, RoundMetadata,
    };
    use crate::sources::{
        ApplicationSource, FetchError, MatchingDistributionSource, PriceOracle, RoundInfoStore,
        RoundLookup, RoundRegistry,
    };
    use async_trait::async_trait;

    const ROUND_ID: &str = "0xd95a1969c41112cee9a2c931e849bcef36a16f4c";

    /// Serves one PGN round with a single unmatched application.
    struct StaticSources;

    fn round(id: &str, chain_id: u64, name: &str) -> Round {
        Round {
            id: id.to_string(),
            chain_id,
            token: "0x0000000000000000000000000000000000000000".to_string(),
            match_amount: "2000000000000000000".to_string(),
            match_amount_usd: 3600.0,
            metadata: Some(RoundMetadata {
                name: Some(name.to_string()),
                quadratic_funding_config: Some(QuadraticFundingConfig {
                    matching_funds_available: Some(2.0),
                    ..Default::default()
                }),
                eligibility: None,
            }),
            ..Default::default()
        }
    }

    #[async_trait]
    impl RoundRegistry for StaticSources {
        async fn round_by_id(&self, chain_id: u64, round_id: &str) -> Result<RoundLookup, FetchError> {
            if round_id != ROUND_ID {
                return Err(FetchError::RoundNotFound {
                    chain_id,
                    round_id: round_id.to_string(),
                });
            }
            let current = round(ROUND_ID, chain_id, "PGN Round");
            Ok(RoundLookup {
                all_rounds: vec![current.clone(), round("0x01", chain_id, "Sibling Round")],
                round: current,
            })
        }

        async fn rounds_by_chain(&self, chain_id: u64) -> Result<Vec<Round>, FetchError> {
            match chain_id {
                250 => Ok(vec![round("0x02", 250, "Fantom Round")]),
                _ => Err(FetchError::Store("unknown chain".to_string())),
            }
        }
    }

    #[async_trait]
    impl PriceOracle for StaticSources {
        async fn payout_token_price(
            &self,
            _round_id: &str,
            _endpoint: &ChainEndpoint,
            _token: &PayoutToken,
            _block: Option<u64>,
        ) -> Result<Option<f64>, FetchError> {
            Ok(Some(1800.0))
        }
    }

    #[async_trait]
    impl MatchingDistributionSource for StaticSources {
        async fn matching_distribution(
            &self,
            _round_id: &str,
            _endpoint: &ChainEndpoint,
            _token: &PayoutToken,
            _matching_pool_usd: f64,
        ) -> Result<MatchingDistribution, FetchError> {
            Ok(MatchingDistribution::default())
        }
    }

    #[async_trait]
    impl ApplicationSource for StaticSources {
        async fn applications(&self, _round_id: &str, _chain_id: u64) -> Result<Vec<ProjectApplication>, FetchError> {
            Ok(vec![ProjectApplication {
                id: "0".to_string(),
                project_id: "0xproject".to_string(),
                status: ApplicationStatus::Approved,
                amount_usd: 10.0,
                votes: 2,
                unique_contributors: 2,
                metadata: None,
                matching_data: None,
            }])
        }
    }

    #[async_trait]
    impl RoundInfoStore for StaticSources {
        async fn round_info(&self, _round_id: &str) -> Result<RoundInfo, FetchError> {
            Ok(RoundInfo {
                preamble: Some("<p>Hello</p>".to_string()),
            })
        }
    }

    async fn spawn_server() -> String {
        let fake = Arc::new(StaticSources);
        let sources = Sources {
            registry: fake.clone(),
            prices: fake.clone(),
            matching: fake.clone(),
            applications: fake.clone(),
            round_info: fake,
        };
        let state = AppState {
            aggregator: Arc::new(RoundReportAggregator::new(sources, EndpointTable::default())),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_parse_round_path() {
        assert_eq!(
            parse_round_path("424", "0xD95A1969C41112CEE9A2C931E849BCEF36A16F4C").unwrap(),
            (424, ROUND_ID.to_string())
        );
        assert!(matches!(
            parse_round_path("pgn", ROUND_ID),
            Err(RequestError::InvalidChainId(_))
        ));
        assert!(matches!(
            parse_round_path("424", "0x1234"),
            Err(RequestError::InvalidRoundId(_))
        ));
        assert!(parse_round_path("-1", ROUND_ID).is_err());
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn_server().await;
        let body = reqwest::get(format!("{}/health", base)).await.unwrap().text().await.unwrap();
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_report_page() {
        let base = spawn_server().await;
        let response = reqwest::get(format!("{}/424/{}", base, ROUND_ID)).await.unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response.headers()[reqwest::header::CONTENT_TYPE],
            MARKDOWN_CONTENT_TYPE
        );
        let page = response.text().await.unwrap();
        assert!(page.starts_with("# PGN Round"));
        assert!(page.contains("Hello"));
        assert!(page.contains("Sibling Round"));
    }

    #[tokio::test]
    async fn test_report_page_with_search() {
        let base = spawn_server().await;

        let page = reqwest::get(format!("{}/424/{}?search=250", base, ROUND_ID))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(page.contains("[Fantom Round](/250/0x02)"));
        assert!(!page.contains("Sibling Round"));

        // A failing or unparsable search keeps the round's own siblings
        for search in ["1", "fantom"] {
            let page = reqwest::get(format!("{}/424/{}?search={}", base, ROUND_ID, search))
                .await
                .unwrap()
                .text()
                .await
                .unwrap();
            assert!(page.contains("Sibling Round"));
        }
    }

    #[tokio::test]
    async fn test_report_json() {
        let base = spawn_server().await;
        let report: serde_json::Value = reqwest::get(format!("{}/424/{}/report.json?search=250", base, ROUND_ID))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(report["roundData"]["rate"], 1800.0);
        assert_eq!(report["roundData"]["matchingPoolUSD"], 3600.0);
        assert_eq!(report["roundInfo"]["preamble"], "Hello");
        assert_eq!(report["allRounds"][0]["id"], "0x02");
        assert_eq!(report["applications"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_card_json() {
        let base = spawn_server().await;
        let card: serde_json::Value = reqwest::get(format!("{}/424/{}/card.json", base, ROUND_ID))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(card["tokenAmount"], 2.0);
        assert_eq!(card["tokenSymbol"], "ETH");
        assert_eq!(card["projectCount"], 1);
    }

    #[tokio::test]
    async fn test_unknown_round_still_renders() {
        let base = spawn_server().await;
        let other = "0x0000000000000000000000000000000000000001";
        let response = reqwest::get(format!("{}/424/{}", base, other)).await.unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let page = response.text().await.unwrap();
        assert!(page.starts_with("# Gitcoin Round Report Card"));
    }

    #[tokio::test]
    async fn test_bad_path_is_rejected() {
        let base = spawn_server().await;

        let response = reqwest::get(format!("{}/pgn/{}", base, ROUND_ID)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let response = reqwest::get(format!("{}/424/not-a-round/card.json", base)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "invalid round id: not-a-round");
    }
}
