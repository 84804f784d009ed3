//! In-memory table of option contracts keyed by name.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{LedgerError, Result};
use crate::model::{ClosePrice, OptionContract, OptionTerms};
use crate::recompute::{recompute, recompute_all};

/// Ledger shared between the caller and at most one running task.
pub type SharedLedger = Arc<RwLock<LedgerStore>>;

/// Owns every option contract. Names are unique.
///
/// Serializes as a JSON object keyed by option name, which is the persisted
/// file format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerStore {
    options: BTreeMap<String, OptionContract>,
}

impl LedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the store for sharing with a task runner.
    #[must_use]
    pub fn into_shared(self) -> SharedLedger {
        Arc::new(RwLock::new(self))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionContract> {
        self.options.get(name)
    }

    /// # Errors
    /// Returns [`LedgerError::OptionNotFound`] if no option has this name.
    pub fn require(&self, name: &str) -> Result<&OptionContract> {
        self.options
            .get(name)
            .ok_or_else(|| LedgerError::option_not_found(name))
    }

    /// # Errors
    /// Returns [`LedgerError::OptionNotFound`] if no option has this name.
    pub fn require_mut(&mut self, name: &str) -> Result<&mut OptionContract> {
        self.options
            .get_mut(name)
            .ok_or_else(|| LedgerError::option_not_found(name))
    }

    /// Option names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.options.keys().cloned().collect()
    }

    pub fn options(&self) -> impl Iterator<Item = &OptionContract> {
        self.options.values()
    }

    /// Names containing `keyword`, compared case-insensitively.
    #[must_use]
    pub fn names_matching(&self, keyword: &str) -> Vec<String> {
        let needle = keyword.trim().to_lowercase();
        self.options
            .keys()
            .filter(|name| name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Checks records read from storage and rebuilds their derived values.
    ///
    /// Each record must be keyed by its own name and carry valid terms.
    /// Daily reversal, entries for dates that are not trade dates, and the
    /// derived series are recomputed from the stored inputs.
    ///
    /// # Errors
    /// Returns [`LedgerError::Validation`] naming the first bad record.
    pub fn reconcile(&mut self) -> Result<()> {
        for (key, option) in &mut self.options {
            if key != option.name() {
                return Err(LedgerError::Validation(format!(
                    "record '{key}' holds option '{}'",
                    option.name()
                )));
            }
            let terms = option.terms();
            terms.validate().map_err(|e| {
                LedgerError::Validation(format!("record '{key}': {e}"))
            })?;
            option.replace_terms(terms);
            recompute_all(option);
        }
        Ok(())
    }

    /// Saves a new option.
    ///
    /// An existing option with the same name is only replaced when
    /// `overwrite` is set; the replacement starts with empty price and
    /// amount history.
    ///
    /// # Errors
    /// - [`LedgerError::Validation`] for invalid input
    /// - [`LedgerError::DuplicateName`] if the name exists and `overwrite` is false
    pub fn create(&mut self, name: &str, terms: OptionTerms, overwrite: bool) -> Result<()> {
        let mut option = OptionContract::new(name, terms)?;
        if self.options.contains_key(option.name()) && !overwrite {
            return Err(LedgerError::DuplicateName {
                name: option.name().to_string(),
            });
        }

        recompute_all(&mut option);
        info!(
            option = %option.name(),
            code = %option.code(),
            dates = option.trade_dates().len(),
            overwrite,
            "Saved option"
        );
        self.options.insert(option.name().to_string(), option);
        Ok(())
    }

    /// Replaces the terms of an existing option and recomputes it from its
    /// first trade date. Prices and amounts recorded for dates that remain
    /// trade dates are kept.
    ///
    /// # Errors
    /// - [`LedgerError::OptionNotFound`] if the option does not exist
    /// - [`LedgerError::Validation`] for invalid terms
    pub fn update(&mut self, name: &str, terms: OptionTerms) -> Result<()> {
        terms.validate()?;
        let option = self.require_mut(name)?;
        option.replace_terms(terms);
        recompute_all(option);

        info!(
            option = %name,
            daily_reversal = option.daily_reversal(),
            "Updated option terms"
        );
        Ok(())
    }

    /// # Errors
    /// Returns [`LedgerError::OptionNotFound`] if the option does not exist.
    pub fn delete(&mut self, name: &str) -> Result<OptionContract> {
        let removed = self
            .options
            .remove(name)
            .ok_or_else(|| LedgerError::option_not_found(name))?;
        info!(option = %name, "Deleted option");
        Ok(removed)
    }

    /// Manually sets the close price of one trade date.
    ///
    /// # Errors
    /// - [`LedgerError::Validation`] if the price is negative or not finite
    /// - [`LedgerError::OptionNotFound`] / [`LedgerError::DateNotFound`]
    pub fn set_close_price(&mut self, name: &str, date: NaiveDate, price: f64) -> Result<()> {
        if !price.is_finite() || price < 0.0 {
            return Err(LedgerError::Validation(format!(
                "close price must be a non-negative number, got {price}"
            )));
        }
        let option = self.require_mut(name)?;
        option.require_date(date)?;
        option.close_prices.insert(date, ClosePrice::Resolved(price));
        recompute(option, date)?;

        info!(option = %name, %date, price, "Edited close price");
        Ok(())
    }

    /// Records a manual close amount for one trade date.
    ///
    /// # Errors
    /// - [`LedgerError::Validation`] if the amount is not finite
    /// - [`LedgerError::OptionNotFound`] / [`LedgerError::DateNotFound`]
    pub fn set_close_amount(&mut self, name: &str, date: NaiveDate, amount: f64) -> Result<()> {
        if !amount.is_finite() {
            return Err(LedgerError::validation("close amount must be a number"));
        }
        let option = self.require_mut(name)?;
        option.require_date(date)?;
        option.close_amounts.insert(date, amount);
        recompute(option, date)?;

        info!(option = %name, %date, amount, "Recorded close amount");
        Ok(())
    }
}
