//! Percentage change between consecutive prices

use rust_decimal::Decimal;
use std::fmt;

use super::Observation;
use crate::shared::errors::DeltaError;
use crate::shared::utils::round_2dp;

/// (new - old) / old * 100, rounded to 2 decimal places
pub fn percentage_change(old: Decimal, new: Decimal) -> Result<Decimal, DeltaError> {
    if old.is_zero() {
        return Err(DeltaError::DivisionByZero);
    }
    let change = new
        .checked_sub(old)
        .and_then(|diff| diff.checked_div(old))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or(DeltaError::Overflow)?;
    Ok(round_2dp(change))
}

/// Signed percentage string, e.g. "+2.00%" or "-10.00%".
///
/// A price that did not move is reported as "+0.00%".
pub fn format_delta(old: Decimal, new: Decimal) -> Result<String, DeltaError> {
    let change = percentage_change(old, new)?;
    let sign = if new >= old { '+' } else { '-' };
    Ok(format!("{}{:.2}%", sign, change.abs()))
}

/// What goes between the brackets of a notification field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaDisplay {
    /// First price seen for this symbol
    Baseline,
    Change(String),
    /// Previous price was zero, or the change does not fit a decimal
    Undefined,
}

impl DeltaDisplay {
    pub fn from_observation(observation: &Observation, new: Decimal) -> Self {
        match observation {
            Observation::Baseline => DeltaDisplay::Baseline,
            Observation::Previous(old) => match format_delta(*old, new) {
                Ok(change) => DeltaDisplay::Change(change),
                Err(_) => DeltaDisplay::Undefined,
            },
        }
    }
}

impl fmt::Display for DeltaDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaDisplay::Baseline => write!(f, "baseline"),
            DeltaDisplay::Change(change) => write!(f, "{}", change),
            DeltaDisplay::Undefined => write!(f, "n/a"),
        }
    }
}
