//! Forward recompute of an option's derived series.
//!
//! Walking from a trade date to the end of the sequence, each date gets:
//!
//! ```text
//! actual_volume   = -daily_reversal  if the knock condition holds, else 0
//! position_change = daily_reversal + actual_volume
//! position        = previous_position + position_change + close_amount
//! ```
//!
//! The knock condition is one-sided. A short initial exposure
//! (`initial_amount < 0`) knocks when the close is above the strike, a long
//! one when the close is below it. Dates without a resolved close never knock.

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{ClosePrice, OptionContract};

/// Recomputes `option` from `from` to its last trade date.
///
/// The seed is the stored position of the trade date immediately before
/// `from`, or the initial amount when `from` is the first date (or the
/// preceding date has no position yet). Close prices and close amounts are
/// read but never written.
///
/// # Errors
/// Returns [`crate::LedgerError::DateNotFound`] if `from` is not a trade date.
pub fn recompute(option: &mut OptionContract, from: NaiveDate) -> Result<()> {
    let start = option.require_date(from)?;
    recompute_from_index(option, start);
    Ok(())
}

/// Recomputes every trade date, seeding from the initial amount.
pub fn recompute_all(option: &mut OptionContract) {
    recompute_from_index(option, 0);
}

/// Knock volume for a single close price.
#[must_use]
pub fn knock_volume(option: &OptionContract, close: Option<ClosePrice>) -> f64 {
    let Some(price) = close.and_then(ClosePrice::price) else {
        return 0.0;
    };

    let knocked = if option.initial_amount < 0.0 {
        price > option.strike_price
    } else {
        price < option.strike_price
    };

    if knocked {
        -option.daily_reversal
    } else {
        0.0
    }
}

fn recompute_from_index(option: &mut OptionContract, start: usize) {
    let mut previous = start
        .checked_sub(1)
        .and_then(|prev| option.trade_dates.get(prev))
        .and_then(|prev| option.positions.get(prev).copied())
        .unwrap_or(option.initial_amount);

    for index in start..option.trade_dates.len() {
        let date = option.trade_dates[index];
        let volume = knock_volume(option, option.close_price(date));
        let change = option.daily_reversal + volume;
        let position = previous + change + option.close_amount(date);

        option.actual_volumes.insert(date, volume);
        option.position_changes.insert(date, change);
        option.positions.insert(date, position);
        previous = position;
    }

    tracing::trace!(
        option = %option.name,
        from_index = start,
        dates = option.trade_dates.len() - start,
        "Recomputed derived series"
    );
}
