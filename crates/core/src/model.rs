//! Option contract entity and its per-date series.
//!
//! A close price has three observable states per trade date:
//! - no entry: the date has never been attempted
//! - [`ClosePrice::Resolved`]: a settlement price is known
//! - [`ClosePrice::Missing`]: a fetch for a past date failed and the date is
//!   marked until a manual edit or a later successful fetch
//!
//! The derived series (`actual_volumes`, `position_changes`, `positions`)
//! are only ever written by [`crate::recompute`].

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};

use crate::error::{LedgerError, Result};

/// Sentinel used for [`ClosePrice::Missing`] in the persisted format.
pub const MISSING_SENTINEL: &str = "N/A";

/// A close price entry for one trade date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClosePrice {
    Resolved(f64),
    Missing,
}

impl ClosePrice {
    #[must_use]
    pub const fn price(self) -> Option<f64> {
        match self {
            Self::Resolved(price) => Some(price),
            Self::Missing => None,
        }
    }

    #[must_use]
    pub const fn is_missing(self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl Serialize for ClosePrice {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Resolved(price) => serializer.serialize_f64(*price),
            Self::Missing => serializer.serialize_str(MISSING_SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for ClosePrice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Price(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Price(price) => Ok(Self::Resolved(price)),
            Raw::Text(text) if text == MISSING_SENTINEL => Ok(Self::Missing),
            Raw::Text(text) => Err(serde::de::Error::custom(format!(
                "expected a price or \"{MISSING_SENTINEL}\", got \"{text}\""
            ))),
        }
    }
}

/// User-supplied contract terms, used for both creation and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionTerms {
    pub code: String,
    pub strike_price: f64,
    pub initial_amount: f64,
    pub trade_dates: Vec<NaiveDate>,
}

impl OptionTerms {
    /// Checks the terms without touching any ledger state.
    ///
    /// # Errors
    /// Returns [`LedgerError::Validation`] for an empty code, a non-finite
    /// strike or amount, an empty date list, or a repeated date.
    pub fn validate(&self) -> Result<()> {
        if self.code.trim().is_empty() {
            return Err(LedgerError::validation("contract code is required"));
        }
        if !self.strike_price.is_finite() {
            return Err(LedgerError::validation("strike price must be a number"));
        }
        if !self.initial_amount.is_finite() {
            return Err(LedgerError::validation("initial amount must be a number"));
        }
        if self.trade_dates.is_empty() {
            return Err(LedgerError::validation("at least one trade date is required"));
        }

        let mut seen = HashSet::with_capacity(self.trade_dates.len());
        for date in &self.trade_dates {
            if !seen.insert(*date) {
                return Err(LedgerError::Validation(format!(
                    "trade date {date} is listed more than once"
                )));
            }
        }
        Ok(())
    }
}

/// One option contract tracked by the ledger.
///
/// Serializes to the persisted record shape; `close_prices` uses the
/// `"N/A"` sentinel for [`ClosePrice::Missing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub(crate) name: String,
    pub(crate) code: String,
    pub(crate) strike_price: f64,
    pub(crate) initial_amount: f64,
    pub(crate) trade_dates: Vec<NaiveDate>,
    pub(crate) daily_reversal: f64,
    #[serde(default)]
    pub(crate) close_prices: BTreeMap<NaiveDate, ClosePrice>,
    #[serde(default)]
    pub(crate) close_amounts: BTreeMap<NaiveDate, f64>,
    #[serde(default)]
    pub(crate) actual_volumes: BTreeMap<NaiveDate, f64>,
    #[serde(default)]
    pub(crate) position_changes: BTreeMap<NaiveDate, f64>,
    #[serde(default)]
    pub(crate) positions: BTreeMap<NaiveDate, f64>,
}

impl OptionContract {
    /// Creates a contract with empty per-date series.
    ///
    /// Derived series stay empty until the first recompute.
    ///
    /// # Errors
    /// Returns [`LedgerError::Validation`] if the name is blank or the terms
    /// are invalid.
    pub fn new(name: impl Into<String>, terms: OptionTerms) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(LedgerError::validation("option name is required"));
        }
        terms.validate()?;

        let daily_reversal = daily_reversal(terms.initial_amount, terms.trade_dates.len());
        Ok(Self {
            name,
            code: terms.code.trim().to_string(),
            strike_price: terms.strike_price,
            initial_amount: terms.initial_amount,
            trade_dates: terms.trade_dates,
            daily_reversal,
            close_prices: BTreeMap::new(),
            close_amounts: BTreeMap::new(),
            actual_volumes: BTreeMap::new(),
            position_changes: BTreeMap::new(),
            positions: BTreeMap::new(),
        })
    }

    /// Replaces the contract terms and drops every per-date entry for dates
    /// that are no longer trade dates. Derived series must be recomputed by
    /// the caller.
    pub(crate) fn replace_terms(&mut self, terms: OptionTerms) {
        self.code = terms.code.trim().to_string();
        self.strike_price = terms.strike_price;
        self.initial_amount = terms.initial_amount;
        self.trade_dates = terms.trade_dates;
        self.daily_reversal = daily_reversal(self.initial_amount, self.trade_dates.len());

        let kept: HashSet<NaiveDate> = self.trade_dates.iter().copied().collect();
        self.close_prices.retain(|date, _| kept.contains(date));
        self.close_amounts.retain(|date, _| kept.contains(date));
        self.actual_volumes.retain(|date, _| kept.contains(date));
        self.position_changes.retain(|date, _| kept.contains(date));
        self.positions.retain(|date, _| kept.contains(date));
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub const fn strike_price(&self) -> f64 {
        self.strike_price
    }

    #[must_use]
    pub const fn initial_amount(&self) -> f64 {
        self.initial_amount
    }

    #[must_use]
    pub const fn daily_reversal(&self) -> f64 {
        self.daily_reversal
    }

    #[must_use]
    pub fn trade_dates(&self) -> &[NaiveDate] {
        &self.trade_dates
    }

    /// Current terms, e.g. to prefill an edit.
    #[must_use]
    pub fn terms(&self) -> OptionTerms {
        OptionTerms {
            code: self.code.clone(),
            strike_price: self.strike_price,
            initial_amount: self.initial_amount,
            trade_dates: self.trade_dates.clone(),
        }
    }

    /// Position of `date` in the trade-date sequence.
    #[must_use]
    pub fn date_index(&self, date: NaiveDate) -> Option<usize> {
        self.trade_dates.iter().position(|d| *d == date)
    }

    #[must_use]
    pub fn has_trade_date(&self, date: NaiveDate) -> bool {
        self.date_index(date).is_some()
    }

    /// Latest trade date, regardless of insertion order.
    #[must_use]
    pub fn last_trade_date(&self) -> Option<NaiveDate> {
        self.trade_dates.iter().max().copied()
    }

    /// An option is expired once its last trade date is strictly before `today`.
    #[must_use]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.last_trade_date().is_some_and(|last| last < today)
    }

    /// Close price entry; `None` means the date was never attempted.
    #[must_use]
    pub fn close_price(&self, date: NaiveDate) -> Option<ClosePrice> {
        self.close_prices.get(&date).copied()
    }

    /// Manual close amount, 0 when none was recorded.
    #[must_use]
    pub fn close_amount(&self, date: NaiveDate) -> f64 {
        self.close_amounts.get(&date).copied().unwrap_or(0.0)
    }

    /// Knock volume, 0 when not yet computed.
    #[must_use]
    pub fn actual_volume(&self, date: NaiveDate) -> f64 {
        self.actual_volumes.get(&date).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn position_change(&self, date: NaiveDate) -> Option<f64> {
        self.position_changes.get(&date).copied()
    }

    #[must_use]
    pub fn position(&self, date: NaiveDate) -> Option<f64> {
        self.positions.get(&date).copied()
    }

    /// Trade dates up to `through` (inclusive) whose price is [`ClosePrice::Missing`].
    #[must_use]
    pub fn missing_dates_through(&self, through: NaiveDate) -> Vec<NaiveDate> {
        self.trade_dates
            .iter()
            .copied()
            .filter(|date| *date <= through)
            .filter(|date| self.close_price(*date).is_some_and(ClosePrice::is_missing))
            .collect()
    }

    /// Trade dates strictly before `before` whose price is [`ClosePrice::Missing`].
    #[must_use]
    pub fn missing_dates_before(&self, before: NaiveDate) -> Vec<NaiveDate> {
        self.trade_dates
            .iter()
            .copied()
            .filter(|date| *date < before)
            .filter(|date| self.close_price(*date).is_some_and(ClosePrice::is_missing))
            .collect()
    }

    /// Trade dates up to `through` (inclusive) that were never attempted.
    #[must_use]
    pub fn unattempted_dates_through(&self, through: NaiveDate) -> Vec<NaiveDate> {
        self.trade_dates
            .iter()
            .copied()
            .filter(|date| *date <= through && !self.close_prices.contains_key(date))
            .collect()
    }

    /// Trade dates up to `through` (inclusive), in sequence order.
    #[must_use]
    pub fn trade_dates_through(&self, through: NaiveDate) -> Vec<NaiveDate> {
        self.trade_dates
            .iter()
            .copied()
            .filter(|date| *date <= through)
            .collect()
    }

    pub(crate) fn require_date(&self, date: NaiveDate) -> Result<usize> {
        self.date_index(date).ok_or_else(|| LedgerError::DateNotFound {
            name: self.name.clone(),
            date,
        })
    }
}

fn daily_reversal(initial_amount: f64, date_count: usize) -> f64 {
    if date_count == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = date_count as f64;
    -initial_amount / count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn terms(dates: &[&str]) -> OptionTerms {
        OptionTerms {
            code: "m2509".to_string(),
            strike_price: 100.0,
            initial_amount: -1000.0,
            trade_dates: dates.iter().map(|d| date(d)).collect(),
        }
    }

    #[test]
    fn daily_reversal_is_amount_spread_over_dates() {
        let option =
            OptionContract::new("m-put", terms(&["2025-01-02", "2025-01-03", "2025-01-06"]))
                .unwrap();
        assert!((option.daily_reversal() - 1000.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_blank_name_and_duplicate_dates() {
        assert!(matches!(
            OptionContract::new("  ", terms(&["2025-01-02"])),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            OptionContract::new("x", terms(&["2025-01-02", "2025-01-02"])),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            OptionContract::new("x", terms(&[])),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn rejects_non_finite_terms() {
        let mut bad = terms(&["2025-01-02"]);
        bad.strike_price = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = terms(&["2025-01-02"]);
        bad.initial_amount = f64::INFINITY;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn missing_sentinel_round_trips_through_json() {
        let mut option = OptionContract::new("x", terms(&["2025-01-02", "2025-01-03"])).unwrap();
        option
            .close_prices
            .insert(date("2025-01-02"), ClosePrice::Resolved(101.5));
        option
            .close_prices
            .insert(date("2025-01-03"), ClosePrice::Missing);

        let json = serde_json::to_value(&option).unwrap();
        assert_eq!(json["close_prices"]["2025-01-03"], "N/A");
        assert_eq!(json["close_prices"]["2025-01-02"], 101.5);

        let back: OptionContract = serde_json::from_value(json).unwrap();
        assert_eq!(back.close_price(date("2025-01-03")), Some(ClosePrice::Missing));
        assert_eq!(back, option);
    }

    #[test]
    fn integer_prices_and_unknown_text_in_persisted_data() {
        let price: ClosePrice = serde_json::from_str("105").unwrap();
        assert_eq!(price, ClosePrice::Resolved(105.0));
        assert!(serde_json::from_str::<ClosePrice>("\"pending\"").is_err());
    }

    #[test]
    fn replace_terms_drops_entries_for_removed_dates() {
        let mut option = OptionContract::new("x", terms(&["2025-01-02", "2025-01-03"])).unwrap();
        option
            .close_prices
            .insert(date("2025-01-03"), ClosePrice::Resolved(99.0));
        option.close_amounts.insert(date("2025-01-03"), 10.0);

        option.replace_terms(terms(&["2025-01-02"]));

        assert_eq!(option.close_price(date("2025-01-03")), None);
        assert_eq!(option.close_amount(date("2025-01-03")), 0.0);
        assert!((option.daily_reversal() - 1000.0).abs() < 1e-12);
    }

    #[test]
    fn expiry_uses_latest_trade_date() {
        let option = OptionContract::new("x", terms(&["2025-01-06", "2025-01-02"])).unwrap();
        assert_eq!(option.last_trade_date(), Some(date("2025-01-06")));
        assert!(option.is_expired(date("2025-01-07")));
        assert!(!option.is_expired(date("2025-01-06")));
    }

    #[test]
    fn date_filters_split_missing_and_unattempted() {
        let mut option = OptionContract::new(
            "x",
            terms(&["2025-01-02", "2025-01-03", "2025-01-06", "2025-01-07"]),
        )
        .unwrap();
        option
            .close_prices
            .insert(date("2025-01-02"), ClosePrice::Missing);
        option
            .close_prices
            .insert(date("2025-01-03"), ClosePrice::Resolved(100.0));
        option
            .close_prices
            .insert(date("2025-01-06"), ClosePrice::Missing);

        assert_eq!(
            option.missing_dates_through(date("2025-01-06")),
            vec![date("2025-01-02"), date("2025-01-06")]
        );
        assert_eq!(
            option.missing_dates_before(date("2025-01-06")),
            vec![date("2025-01-02")]
        );
        assert_eq!(
            option.unattempted_dates_through(date("2025-01-07")),
            vec![date("2025-01-07")]
        );
    }
}
