//! Round aggregation and derived statistics.

pub mod aggregator;
pub mod stats;

pub use aggregator::{RoundReport, RoundReportAggregator, Sources};
pub use stats::CardStats;
