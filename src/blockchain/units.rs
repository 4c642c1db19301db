//! Exact decimal <-> base unit conversion.
//!
//! Amounts arrive as human strings ("0.01") and leave as integer base units.
//! No floating point is involved on the way in.

use thiserror::Error;

/// Lamports per SOL.
pub const SOL_DECIMALS: u8 = 9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("invalid amount '{0}'")]
    Invalid(String),

    #[error("amount '{amount}' has more than {decimals} decimal places")]
    TooPrecise { amount: String, decimals: u8 },

    #[error("amount '{0}' overflows u64 base units")]
    Overflow(String),
}

/// Parse a decimal string into base units with `decimals` fractional digits.
pub fn parse_units(amount: &str, decimals: u8) -> Result<u64, UnitsError> {
    let trimmed = amount.trim();
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(UnitsError::Invalid(amount.to_string()));
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(UnitsError::TooPrecise {
            amount: amount.to_string(),
            decimals,
        });
    }

    let overflow = || UnitsError::Overflow(amount.to_string());
    let scale = 10u64.checked_pow(decimals as u32).ok_or_else(overflow)?;
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().map_err(|_| overflow())?
    };

    let fraction_units = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = decimals as usize);
        padded.parse::<u64>().map_err(|_| overflow())?
    };

    whole_units
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_units))
        .ok_or_else(overflow)
}

/// Format base units as a decimal string without trailing zeros.
pub fn format_units(units: u64, decimals: u8) -> String {
    if decimals == 0 {
        return units.to_string();
    }
    let scale = 10u128.pow(decimals as u32);
    let whole = units as u128 / scale;
    let fraction = units as u128 % scale;
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{:0>width$}", fraction, width = decimals as usize);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

/// Base units as a float, for display and bookkeeping only.
pub fn units_to_f64(units: u64, decimals: u8) -> f64 {
    units as f64 / 10f64.powi(decimals as i32)
}
