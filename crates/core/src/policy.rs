//! How a market-data fetch result is folded into an option.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::{ClosePrice, OptionContract};
use crate::recompute::recompute;

/// Result of one provider call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FetchOutcome {
    Resolved(f64),
    Unavailable,
}

impl From<Option<f64>> for FetchOutcome {
    /// A non-finite price counts as unavailable.
    fn from(price: Option<f64>) -> Self {
        price
            .filter(|p| p.is_finite())
            .map_or(Self::Unavailable, Self::Resolved)
    }
}

/// What [`apply_fetch`] did to the option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchEffect {
    /// A resolved price was stored.
    Stored,
    /// The date is in the past and was marked [`ClosePrice::Missing`].
    MarkedMissing,
    /// The date is today or later; the entry was left as it was so the date
    /// is retried on a later run.
    LeftPending,
}

/// Applies a fetch outcome for `date` and recomputes from that date.
///
/// `today` is the current wall-clock date. Only dates strictly before it are
/// marked missing when no price is available. A resolved price that is not
/// finite is treated as unavailable.
///
/// # Errors
/// Returns [`crate::LedgerError::DateNotFound`] if `date` is not a trade date.
pub fn apply_fetch(
    option: &mut OptionContract,
    date: NaiveDate,
    outcome: FetchOutcome,
    today: NaiveDate,
) -> Result<FetchEffect> {
    option.require_date(date)?;

    let outcome = match outcome {
        FetchOutcome::Resolved(price) if !price.is_finite() => {
            warn!(option = %option.name, %date, price, "Ignoring non-finite close price");
            FetchOutcome::Unavailable
        }
        other => other,
    };

    let effect = match outcome {
        FetchOutcome::Resolved(price) => {
            option.close_prices.insert(date, ClosePrice::Resolved(price));
            FetchEffect::Stored
        }
        FetchOutcome::Unavailable if date < today => {
            option.close_prices.insert(date, ClosePrice::Missing);
            FetchEffect::MarkedMissing
        }
        FetchOutcome::Unavailable => FetchEffect::LeftPending,
    };

    debug!(option = %option.name, %date, ?effect, "Applied fetch result");
    recompute(option, date)?;
    Ok(effect)
}
