//! Headline numbers of a round, as shown on its preview card.

use super::aggregator::RoundReport;
use crate::models::ProjectApplication;
use crate::units::format_amount;
use chrono::DateTime;
use serde::Serialize;

/// Summary statistics of an aggregated round.
///
/// Every field has a neutral default so a partial report still yields a
/// card; an aborted report simply produces zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStats {
    pub round_name: Option<String>,
    pub token_amount: f64,
    pub token_symbol: Option<String>,
    #[serde(rename = "matchingPoolUSD")]
    pub matching_pool_usd: f64,
    #[serde(rename = "crowdfundedUSD")]
    pub crowdfunded_usd: f64,
    /// Present only when the round caps per-project matching.
    pub matching_cap_percent: Option<f64>,
    pub matching_cap_token_value: Option<f64>,
    pub projects_reached_matching_cap: Option<usize>,
    pub project_count: usize,
    pub votes: u64,
    pub unique_contributors: u64,
    pub round_end_date: Option<String>,
}

impl CardStats {
    pub fn from_report(report: &RoundReport) -> Self {
        let applications = report.applications.as_deref().unwrap_or_default();
        let mut stats = CardStats {
            project_count: applications.len(),
            ..Default::default()
        };

        let Some(enriched) = report.round.as_ref() else {
            return stats;
        };
        let round = &enriched.round;

        stats.round_name = round.name().map(str::to_string);
        stats.token_amount = enriched.token_amount;
        stats.token_symbol = Some(enriched.matching_fund_payout_token.name.clone());
        stats.matching_pool_usd = enriched.matching_pool_usd;
        stats.crowdfunded_usd = round.amount_usd;
        stats.votes = round.votes;
        stats.unique_contributors = round.unique_contributors;
        stats.round_end_date = round.round_end_time.and_then(format_end_date);

        let cap_percent = round
            .metadata
            .as_ref()
            .and_then(|m| m.quadratic_funding_config.as_ref())
            .filter(|qf| qf.matching_cap)
            .and_then(|qf| qf.matching_cap_amount)
            .filter(|pct| *pct > 0.0);

        if let Some(percent) = cap_percent {
            let cap_value = matching_cap_token_value(enriched.token_amount, percent);
            stats.matching_cap_percent = Some(percent);
            stats.matching_cap_token_value = Some(cap_value);
            stats.projects_reached_matching_cap =
                Some(projects_reaching_cap(applications, cap_value));
        }

        stats
    }

    /// The card's stat lines as `(label, value)` pairs.
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        let symbol = self.token_symbol.as_deref().unwrap_or_default();
        let mut lines = vec![
            (
                "Matching Pool",
                format!(
                    "{} {} (${})",
                    format_amount(self.token_amount, true),
                    symbol,
                    format_amount(self.matching_pool_usd, false)
                )
                .replace("  ", " "),
            ),
            (
                "Total USD Crowdfunded",
                format!("${}", format_amount(self.crowdfunded_usd, false)),
            ),
        ];

        if let (Some(percent), Some(value)) =
            (self.matching_cap_percent, self.matching_cap_token_value)
        {
            lines.push((
                "Matching Cap",
                format!("{:.0}% ({} {})", percent, format_amount(value, true), symbol)
                    .trim_end()
                    .to_string(),
            ));
        }

        lines.push(("Total Projects", self.project_count.to_string()));
        lines.push(("Total Donations", format_amount(self.votes as f64, true)));
        lines.push((
            "Total Donors",
            format_amount(self.unique_contributors as f64, true),
        ));

        if let Some(reached) = self.projects_reached_matching_cap {
            lines.push(("Projects Reaching Matching Cap", reached.to_string()));
        }
        if let Some(date) = &self.round_end_date {
            lines.push(("Round Ended On", date.clone()));
        }

        lines
    }
}

/// Token value of a matching cap given as a percentage of the pool.
pub fn matching_cap_token_value(token_amount: f64, cap_percent: f64) -> f64 {
    token_amount * cap_percent / 100.0
}

/// Applications matched at or above the cap value.
pub fn projects_reaching_cap(applications: &[ProjectApplication], cap_value: f64) -> usize {
    applications
        .iter()
        .filter(|a| a.matching_data.is_some() && a.match_amount() >= cap_value)
        .count()
}

/// `1691971200` -> `"August 14, 2023"` (UTC).
pub fn format_end_date(unix_seconds: u64) -> Option<String> {
    let seconds = i64::try_from(unix_seconds).ok()?;
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.format("%B %-d, %Y").to_string())
}
