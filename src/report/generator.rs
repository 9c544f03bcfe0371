//! Markdown report card generation.
//!
//! Renders a [`RoundReport`] as a single Markdown page. Missing sections
//! turn into placeholders; a partially aggregated report never produces an
//! error page.

use crate::analysis::{CardStats, RoundReport};
use crate::models::{ProjectApplication, Round};
use crate::units::format_amount;
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_TITLE: &str = "Gitcoin Round Report Card";

/// Shown when a round has no description of its own.
pub const DEFAULT_INTRO: &str = "Celebrate the impact of recent Gitcoin rounds through data, \
insights, and stories of participating grant projects and individuals. Report cards highlight \
achievements, foster transparency, and track engagement in the open-source community.";

const PLACEHOLDER: &str = "—";

static MARKDOWN_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[(.*?)\]\((.*?)\)").expect("markdown image pattern"));

/// Where the round switcher gets its list from.
pub enum OtherRounds<'a> {
    /// The siblings found with the round itself.
    Siblings,
    /// Rounds of an explicitly searched chain.
    Searched(&'a [Round]),
}

/// Generate the complete report page.
pub fn generate_markdown_report(report: &RoundReport, other_rounds: OtherRounds<'_>) -> String {
    let mut output = String::new();

    let title = report
        .round
        .as_ref()
        .and_then(|r| r.round.name())
        .unwrap_or(DEFAULT_TITLE);
    output.push_str(&format!("# {}\n\n", title));

    output.push_str(&generate_intro_section(report));
    output.push_str(&generate_stats_section(report));
    output.push_str(&generate_payout_section(report));
    output.push_str(&generate_projects_section(report));

    let rounds = match other_rounds {
        OtherRounds::Siblings => report.all_rounds.as_deref(),
        OtherRounds::Searched(rounds) => Some(rounds),
    };
    output.push_str(&generate_rounds_section(rounds, report));

    output.push_str(&generate_footer());

    output
}

fn generate_intro_section(report: &RoundReport) -> String {
    let preamble = report
        .round_info
        .as_ref()
        .and_then(|info| info.preamble.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_INTRO);

    format!("{}\n\n", preamble)
}

fn generate_stats_section(report: &RoundReport) -> String {
    let mut section = String::new();

    section.push_str("## Round Stats\n\n");
    if report.round.is_none() {
        section.push_str(&format!("{}\n\n", PLACEHOLDER));
        return section;
    }

    section.push_str("| Stat | Value |\n");
    section.push_str("|:---|---:|\n");
    for (label, value) in CardStats::from_report(report).lines() {
        section.push_str(&format!("| {} | {} |\n", label, value));
    }

    if let Some(description) = report
        .round
        .as_ref()
        .and_then(|r| r.round.metadata.as_ref())
        .and_then(|m| m.eligibility.as_ref())
        .and_then(|e| e.description.as_deref())
        .filter(|d| !d.trim().is_empty())
    {
        section.push_str(&format!("\n**Eligibility:** {}\n", description.trim()));
    }
    section.push('\n');

    section
}

fn generate_payout_section(report: &RoundReport) -> String {
    let Some(hash) = report.payout_txn_hash.as_deref() else {
        return String::new();
    };

    match report
        .round
        .as_ref()
        .and_then(|r| explorer_tx_url(r.round.chain_id, hash))
    {
        Some(url) => format!("**Matching payout:** [{}]({})\n\n", hash, url),
        None => format!("**Matching payout:** `{}`\n\n", hash),
    }
}

fn generate_projects_section(report: &RoundReport) -> String {
    let mut section = String::new();

    section.push_str("## Projects\n\n");

    let applications = match report.applications.as_deref() {
        Some(apps) if !apps.is_empty() => apps,
        _ => {
            section.push_str(&format!("{}\n\n", PLACEHOLDER));
            return section;
        }
    };

    let symbol = report
        .round
        .as_ref()
        .map(|r| r.matching_fund_payout_token.name.as_str())
        .unwrap_or_default();

    section.push_str("| # | Project | Contributors | Crowdfunded | Matching |\n");
    section.push_str("|:---:|:---|---:|---:|---:|\n");
    for (rank, application) in applications.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | ${} | {} |\n",
            rank + 1,
            project_link(application),
            format_amount(application.unique_contributors as f64, true),
            format_amount(application.amount_usd, false),
            matching_cell(application, symbol),
        ));
    }
    section.push('\n');

    for application in applications {
        if let Some(description) = application.description() {
            let description = strip_markdown_images(description);
            let description = description.trim();
            if !description.is_empty() {
                section.push_str(&format!(
                    "### {}\n\n{}\n\n",
                    application.title(),
                    description
                ));
            }
        }
    }

    section
}

fn generate_rounds_section(rounds: Option<&[Round]>, report: &RoundReport) -> String {
    let mut section = String::new();

    section.push_str("## Other Rounds\n\n");

    let current = report.round.as_ref().map(|r| r.round.id.as_str());
    let rounds: Vec<&Round> = rounds
        .unwrap_or_default()
        .iter()
        .filter(|r| Some(r.id.as_str()) != current)
        .filter(|r| r.name().is_some())
        .collect();

    if rounds.is_empty() {
        section.push_str(&format!("{}\n\n", PLACEHOLDER));
        return section;
    }

    for round in rounds {
        section.push_str(&format!(
            "- [{}](/{}/{})\n",
            round.name().unwrap_or(&round.id),
            round.chain_id,
            round.id
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    "---\n\n*Data from the Allo protocol indexer.*\n".to_string()
}

fn project_link(application: &ProjectApplication) -> String {
    let title = application.title().replace('|', "\\|");
    match application.website() {
        Some(site) if !site.is_empty() => format!("[{}]({})", title, site),
        _ => title,
    }
}

fn matching_cell(application: &ProjectApplication, symbol: &str) -> String {
    match &application.matching_data {
        Some(data) => format!(
            "{} {} (${})",
            format_amount(data.match_amount, true),
            symbol,
            format_amount(data.match_amount_usd, false)
        ),
        None => PLACEHOLDER.to_string(),
    }
}

/// Remove `![alt](src)` images from project descriptions.
pub fn strip_markdown_images(text: &str) -> String {
    MARKDOWN_IMAGE.replace_all(text, "").into_owned()
}

/// Block explorer link for a transaction, for chains with a known explorer.
pub fn explorer_tx_url(chain_id: u64, hash: &str) -> Option<String> {
    let base = match chain_id {
        1 => "https://etherscan.io",
        5 => "https://goerli.etherscan.io",
        10 => "https://optimistic.etherscan.io",
        137 => "https://polygonscan.com",
        250 => "https://ftmscan.com",
        324 => "https://explorer.zksync.io",
        424 => "https://explorer.publicgoods.network",
        8453 => "https://basescan.org",
        42161 => "https://arbiscan.io",
        43114 => "https://snowtrace.io",
        11155111 => "https://sepolia.etherscan.io",
        _ => return None,
    };
    Some(format!("{}/tx/{}", base, hash))
}

/// Generate the JSON rendition of a report.
pub fn generate_json_report(report: &RoundReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ApplicationBody, ApplicationMetadata, ApplicationStatus, EnrichedRound, MatchingStatsData,
        PayoutToken, ProjectDetails, QuadraticFundingConfig, RoundInfo, RoundMetadata,
    };

    fn round(id: &str, name: &str) -> Round {
        Round {
            id: id.to_string(),
            chain_id: 10,
            metadata: Some(RoundMetadata {
                name: Some(name.to_string()),
                quadratic_funding_config: Some(QuadraticFundingConfig {
                    matching_funds_available: Some(1000.0),
                    ..Default::default()
                }),
                eligibility: None,
            }),
            ..Default::default()
        }
    }

    fn application(project_id: &str, title: &str, description: &str, matched: Option<f64>) -> ProjectApplication {
        ProjectApplication {
            id: project_id.to_string(),
            project_id: project_id.to_string(),
            status: ApplicationStatus::Approved,
            amount_usd: 1520.0,
            votes: 40,
            unique_contributors: 1200,
            metadata: Some(ApplicationMetadata {
                application: Some(ApplicationBody {
                    project: Some(ProjectDetails {
                        title: Some(title.to_string()),
                        website: Some("https://example.org".to_string()),
                        description: Some(description.to_string()),
                        logo_img: None,
                    }),
                    recipient: None,
                }),
            }),
            matching_data: matched.map(|amount| MatchingStatsData {
                project_id: project_id.to_string(),
                match_amount: amount,
                match_amount_usd: amount * 2.0,
                ..Default::default()
            }),
        }
    }

    fn create_test_report() -> RoundReport {
        RoundReport {
            round: Some(EnrichedRound {
                round: round("0xaaa", "Climate Round"),
                matching_fund_payout_token: PayoutToken {
                    name: "DAI".to_string(),
                    chain_id: 10,
                    address: "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1".to_string(),
                    decimal: 18,
                },
                token_amount: 1000.0,
                rate: 2.0,
                matching_pool_usd: 2000.0,
            }),
            round_info: Some(RoundInfo {
                preamble: Some("Funding climate work.".to_string()),
            }),
            applications: Some(vec![
                application("b", "Solar Co-op", "We build ![panel](https://img/p.png)panels.", Some(5.0)),
                application("a", "Tree | Planters", "Trees.", None),
            ]),
            all_rounds: Some(vec![round("0xaaa", "Climate Round"), round("0xbbb", "Web3 Round")]),
            payout_txn_hash: Some("0xpaid".to_string()),
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_report(), OtherRounds::Siblings);

        assert!(markdown.starts_with("# Climate Round\n"));
        assert!(markdown.contains("Funding climate work."));
        assert!(markdown.contains("| Matching Pool | 1,000 DAI ($2,000.00) |"));
        assert!(markdown.contains("https://optimistic.etherscan.io/tx/0xpaid"));
        assert!(markdown.contains("| 1 | [Solar Co-op](https://example.org) | 1,200 | $1,520.00 | 5 DAI ($10.00) |"));
        assert!(markdown.contains("Tree \\| Planters"));
        assert!(markdown.contains("- [Web3 Round](/10/0xbbb)"));
        assert!(!markdown.contains("- [Climate Round]"));
        assert!(markdown.contains("We build panels."));
    }

    #[test]
    fn test_empty_report_uses_placeholders() {
        let markdown = generate_markdown_report(&RoundReport::default(), OtherRounds::Siblings);

        assert!(markdown.starts_with(&format!("# {}\n", DEFAULT_TITLE)));
        assert!(markdown.contains(DEFAULT_INTRO));
        assert!(markdown.contains("## Round Stats\n\n—"));
        assert!(markdown.contains("## Projects\n\n—"));
        assert!(markdown.contains("## Other Rounds\n\n—"));
        assert!(!markdown.contains("Matching payout"));
    }

    #[test]
    fn test_searched_rounds_replace_siblings() {
        let searched = vec![round("0xccc", "Fantom Round")];
        let markdown = generate_markdown_report(&create_test_report(), OtherRounds::Searched(&searched));

        assert!(markdown.contains("- [Fantom Round](/10/0xccc)"));
        assert!(!markdown.contains("Web3 Round"));
    }

    #[test]
    fn test_strip_markdown_images() {
        assert_eq!(
            strip_markdown_images("Intro ![logo](a.png) text ![](b.gif)"),
            "Intro  text "
        );
        assert_eq!(strip_markdown_images("[link](x)"), "[link](x)");
    }

    #[test]
    fn test_explorer_tx_url() {
        assert_eq!(
            explorer_tx_url(424, "0x1").as_deref(),
            Some("https://explorer.publicgoods.network/tx/0x1")
        );
        assert_eq!(explorer_tx_url(999, "0x1"), None);
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_report()).unwrap();

        assert!(json.contains("\"roundData\""));
        assert!(json.contains("\"matchingPoolUSD\""));
        assert!(json.contains("\"payoutTxnHash\""));
        assert!(!json.contains("\"failures\""));
    }
}
