//! Bulk fetch-then-recompute over a selection of options.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use option_ledger_core::{FetchEffect, LedgerStore};
use tracing::{info, warn};

use crate::context::{FetchUnit, TaskContext};
use crate::error::TaskError;
use crate::events::{ErrorReport, TaskOutcome};
use crate::progress::ProgressReporter;
use crate::selection::Selection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshScope {
    /// Every trade date up to `through` of the selected options.
    Selection {
        selection: Selection,
        through: NaiveDate,
    },
    /// Exactly these dates, e.g. the error report of an earlier query.
    Stale(BTreeMap<String, Vec<NaiveDate>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub scope: RefreshScope,
}

impl RefreshRequest {
    #[must_use]
    pub const fn new(selection: Selection, through: NaiveDate) -> Self {
        Self {
            scope: RefreshScope::Selection { selection, through },
        }
    }

    #[must_use]
    pub const fn stale(dates: BTreeMap<String, Vec<NaiveDate>>) -> Self {
        Self {
            scope: RefreshScope::Stale(dates),
        }
    }

    /// Units to fetch, in option order then trade-date order.
    ///
    /// Stale entries naming an unknown option or a date that is not a trade
    /// date are skipped.
    ///
    /// # Errors
    /// Returns error if the selection cannot be resolved.
    pub fn units(&self, ledger: &LedgerStore) -> Result<Vec<FetchUnit>, TaskError> {
        match &self.scope {
            RefreshScope::Selection { selection, through } => {
                let mut units = Vec::new();
                for name in selection.resolve(ledger)? {
                    let option = ledger.require(&name)?;
                    units.extend(
                        option
                            .trade_dates_through(*through)
                            .into_iter()
                            .map(|date| FetchUnit::new(name.as_str(), date)),
                    );
                }
                Ok(units)
            }
            RefreshScope::Stale(dates) => {
                let mut units = Vec::new();
                for (name, dates) in dates {
                    let Some(option) = ledger.get(name) else {
                        warn!(option = %name, "Skipping stale dates of unknown option");
                        continue;
                    };
                    for date in dates {
                        if option.has_trade_date(*date) {
                            units.push(FetchUnit::new(name.as_str(), *date));
                        } else {
                            warn!(option = %name, %date, "Skipping stale non-trade date");
                        }
                    }
                }
                Ok(units)
            }
        }
    }
}

/// Runs a refresh to completion or cancellation.
///
/// Past dates that stay unavailable are listed in the error report of the
/// completed outcome. The ledger is saved only when every unit ran.
///
/// # Errors
/// Returns error if the selection does not resolve, the ledger changes
/// underneath the run, or the final save fails.
pub async fn run_refresh(
    ctx: &TaskContext,
    request: RefreshRequest,
    reporter: &mut ProgressReporter,
) -> Result<TaskOutcome, TaskError> {
    let units = {
        let ledger = ctx.ledger.read().await;
        request.units(&ledger)?
    };
    info!(units = units.len(), "Refresh started");

    let Some(effects) = ctx.fetch_units(&units, reporter, 0, 100).await? else {
        info!("Refresh cancelled");
        return Ok(TaskOutcome::Cancelled);
    };

    let mut report = ErrorReport::new();
    for (unit, effect) in units.iter().zip(&effects) {
        if *effect == FetchEffect::MarkedMissing {
            report.record(&unit.option, unit.date);
        }
    }

    ctx.persist().await?;
    reporter.report(100, "Refresh complete").await;
    info!(
        units = units.len(),
        unavailable = report.date_count(),
        "Refresh finished"
    );
    Ok(TaskOutcome::completed(report))
}
