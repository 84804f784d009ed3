//! Trade-date list helpers.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::error::{LedgerError, Result};

/// Generates `count` consecutive dates starting at `start`, optionally
/// skipping Saturdays and Sundays.
#[must_use]
pub fn consecutive_dates(start: NaiveDate, count: usize, skip_weekends: bool) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut current = start;

    while dates.len() < count {
        if !(skip_weekends && is_weekend(current)) {
            dates.push(current);
        }
        match current.checked_add_days(Days::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }
    dates
}

/// Appends every date not already present, keeping the existing order.
/// Returns how many dates were added.
pub fn merge_dates(existing: &mut Vec<NaiveDate>, additions: &[NaiveDate]) -> usize {
    let before = existing.len();
    for date in additions {
        if !existing.contains(date) {
            existing.push(*date);
        }
    }
    existing.len() - before
}

/// Appends a single date.
///
/// # Errors
/// Returns [`LedgerError::Validation`] if the date is already listed.
pub fn add_date(existing: &mut Vec<NaiveDate>, date: NaiveDate) -> Result<()> {
    if existing.contains(&date) {
        return Err(LedgerError::Validation(format!(
            "trade date {date} has already been added"
        )));
    }
    existing.push(date);
    Ok(())
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
