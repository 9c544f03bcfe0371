//! Token unit conversion and display formatting.
//!
//! Raw on-chain amounts arrive as integer strings that can exceed `u128`,
//! so they are parsed as `U256` and scaled with alloy's unit helpers.

use alloy::primitives::utils as eth_units;
use alloy::primitives::U256;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while scaling a raw token amount.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
    #[error("empty amount")]
    Empty,
    #[error("invalid digit in amount: {0}")]
    InvalidDigit(String),
    #[error("cannot scale by {0} decimals")]
    Scale(u8),
}

/// Scale a raw integer amount down by `decimals` places.
///
/// `format_units("1000", 2)` is `10.0`.
pub fn format_units(raw: &str, decimals: u8) -> Result<f64, UnitsError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UnitsError::Empty);
    }

    let value =
        U256::from_str(raw).map_err(|_| UnitsError::InvalidDigit(raw.to_string()))?;
    let text = eth_units::format_units(value, decimals).map_err(|_| UnitsError::Scale(decimals))?;

    text.parse::<f64>()
        .map_err(|_| UnitsError::InvalidDigit(raw.to_string()))
}

/// Format a number for display with thousands separators.
///
/// Token quantities keep up to two decimals with trailing zeros trimmed;
/// USD values always show two decimals.
pub fn format_amount(value: f64, is_token: bool) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let fraction = if is_token {
        fraction.trim_end_matches('0')
    } else {
        fraction
    };

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    if fraction.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, fraction)
    }
}
