//! Query result snapshots handed to the presentation layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{ClosePrice, OptionContract};

/// One rendered line: an option's state on one trade date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRow {
    pub date: NaiveDate,
    pub option_name: String,
    pub strike_price: f64,
    pub daily_reversal: f64,
    /// `None` when the date was never attempted.
    pub close_price: Option<ClosePrice>,
    pub actual_volume: f64,
    pub close_amount: f64,
    /// 0 when no position has been computed for the date.
    pub position: f64,
}

impl QueryRow {
    /// Copies the option's values for `date`.
    #[must_use]
    pub fn capture(option: &OptionContract, date: NaiveDate) -> Self {
        Self {
            date,
            option_name: option.name().to_string(),
            strike_price: option.strike_price(),
            daily_reversal: option.daily_reversal(),
            close_price: option.close_price(date),
            actual_volume: option.actual_volume(date),
            close_amount: option.close_amount(date),
            position: option.position(date).unwrap_or(0.0),
        }
    }
}

/// Result of a query run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuerySnapshot {
    /// Every trade date up to the query date of exactly one option.
    Single {
        option_name: String,
        rows: Vec<QueryRow>,
    },
    /// One row per option, split by expiry.
    Aggregate(AggregateSnapshot),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    /// Rows at the query date for options still trading.
    pub active: Vec<QueryRow>,
    /// Rows at the last trade date for expired options.
    pub expired: Vec<QueryRow>,
    pub active_count: usize,
    pub expired_count: usize,
}

impl QuerySnapshot {
    /// Every row in display order.
    pub fn rows(&self) -> impl Iterator<Item = &QueryRow> {
        let (first, second): (&[QueryRow], &[QueryRow]) = match self {
            Self::Single { rows, .. } => (rows.as_slice(), [].as_slice()),
            Self::Aggregate(aggregate) => {
                (aggregate.active.as_slice(), aggregate.expired.as_slice())
            }
        };
        first.iter().chain(second.iter())
    }

    #[must_use]
    pub const fn is_single(&self) -> bool {
        matches!(self, Self::Single { .. })
    }
}
