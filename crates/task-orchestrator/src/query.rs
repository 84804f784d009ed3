//! Three-phase query: find stale prices, retry them, then build a snapshot.
//!
//! Progress bands are 0-30 for the staleness scan, 30-70 for refetching and
//! 70-100 for the snapshot. A single target option yields every row up to the
//! query date; any other number of targets yields the aggregate view.

use chrono::NaiveDate;
use option_ledger_core::{recompute, AggregateSnapshot, ClosePrice, QueryRow, QuerySnapshot};
use tracing::{debug, info};

use crate::context::{FetchUnit, TaskContext};
use crate::error::TaskError;
use crate::events::{ErrorReport, TaskOutcome};
use crate::progress::{scaled_percent, ProgressReporter};
use crate::selection::Selection;

const SCAN_END: u8 = 30;
const FETCH_END: u8 = 70;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub target: Selection,
    pub query_date: NaiveDate,
    /// Also fetch trade dates up to the query date that were never attempted.
    pub fetch_unattempted: bool,
}

impl QueryRequest {
    #[must_use]
    pub const fn new(target: Selection, query_date: NaiveDate) -> Self {
        Self {
            target,
            query_date,
            fetch_unattempted: false,
        }
    }

    #[must_use]
    pub fn with_unattempted(mut self, fetch_unattempted: bool) -> Self {
        self.fetch_unattempted = fetch_unattempted;
        self
    }
}

/// Runs a query to completion or cancellation.
///
/// On success the snapshot is published before the completed outcome is
/// returned. Target resolution happens before any event is sent.
///
/// # Errors
/// Returns error if the target does not resolve or saving the ledger fails.
pub async fn run_query(
    ctx: &TaskContext,
    request: QueryRequest,
    reporter: &mut ProgressReporter,
) -> Result<TaskOutcome, TaskError> {
    let query_date = request.query_date;
    let targets = {
        let ledger = ctx.ledger.read().await;
        request.target.resolve(&ledger)?
    };
    info!(targets = targets.len(), %query_date, "Query started");

    reporter.report(0, "Preparing query").await;
    ctx.persist().await?;

    let Some(stale) = scan_stale(ctx, &targets, &request, reporter).await? else {
        return Ok(cancelled());
    };

    let mut report = ErrorReport::new();
    if !refetch_stale(ctx, &stale, query_date, reporter, &mut report).await? {
        return Ok(cancelled());
    }

    let snapshot = if targets.len() == 1 {
        single_snapshot(ctx, &targets[0], query_date, reporter).await?
    } else {
        aggregate_snapshot(ctx, &targets, query_date, reporter).await?
    };
    let Some(snapshot) = snapshot else {
        return Ok(cancelled());
    };

    {
        let ledger = ctx.ledger.read().await;
        for name in &targets {
            let option = ledger.require(name)?;
            report.extend(name, option.missing_dates_before(query_date));
        }
    }

    ctx.persist().await?;
    reporter.report(100, "Query complete").await;
    reporter.publish(snapshot).await;
    info!(unavailable = report.date_count(), "Query finished");
    Ok(TaskOutcome::completed(report))
}

fn cancelled() -> TaskOutcome {
    info!("Query cancelled");
    TaskOutcome::Cancelled
}

/// Phase 1: per-target list of dates to refetch.
async fn scan_stale(
    ctx: &TaskContext,
    targets: &[String],
    request: &QueryRequest,
    reporter: &mut ProgressReporter,
) -> Result<Option<Vec<FetchUnit>>, TaskError> {
    let mut units = Vec::new();

    for (done, name) in targets.iter().enumerate() {
        if ctx.is_cancelled() {
            return Ok(None);
        }
        {
            let ledger = ctx.ledger.read().await;
            let option = ledger.require(name)?;
            let stale = option
                .trade_dates_through(request.query_date)
                .into_iter()
                .filter(|date| match option.close_price(*date) {
                    Some(ClosePrice::Missing) => true,
                    Some(ClosePrice::Resolved(_)) => false,
                    None => request.fetch_unattempted,
                });
            units.extend(stale.map(|date| FetchUnit::new(name.as_str(), date)));
        }

        let percent = scaled_percent(done + 1, targets.len(), 0, SCAN_END);
        reporter.report(percent, format!("Checked {name}")).await;
    }

    debug!(stale = units.len(), "Staleness scan finished");
    Ok(Some(units))
}

/// Phase 2: one refetch per stale unit.
///
/// A date before the query date that is still missing afterwards goes into
/// the report. The query date itself is never reported here.
async fn refetch_stale(
    ctx: &TaskContext,
    units: &[FetchUnit],
    query_date: NaiveDate,
    reporter: &mut ProgressReporter,
    report: &mut ErrorReport,
) -> Result<bool, TaskError> {
    if units.is_empty() {
        reporter.report(FETCH_END, "No stale prices").await;
        return Ok(!ctx.is_cancelled());
    }
    if ctx.fetch_units(units, reporter, SCAN_END, FETCH_END).await?.is_none() {
        return Ok(false);
    }

    let ledger = ctx.ledger.read().await;
    for unit in units.iter().filter(|unit| unit.date < query_date) {
        let option = ledger.require(&unit.option)?;
        if option
            .close_price(unit.date)
            .is_some_and(ClosePrice::is_missing)
        {
            report.record(&unit.option, unit.date);
        }
    }
    Ok(true)
}

/// Phase 3, single mode: every trade date up to the query date.
async fn single_snapshot(
    ctx: &TaskContext,
    name: &str,
    query_date: NaiveDate,
    reporter: &mut ProgressReporter,
) -> Result<Option<QuerySnapshot>, TaskError> {
    let dates = {
        let ledger = ctx.ledger.read().await;
        ledger.require(name)?.trade_dates_through(query_date)
    };

    let mut rows = Vec::with_capacity(dates.len());
    for (done, date) in dates.iter().enumerate() {
        if ctx.is_cancelled() {
            return Ok(None);
        }
        {
            let mut ledger = ctx.ledger.write().await;
            let option = ledger.require_mut(name)?;
            recompute(option, *date)?;
            rows.push(QueryRow::capture(option, *date));
        }

        let percent = scaled_percent(done + 1, dates.len(), FETCH_END, 100);
        reporter.report(percent, format!("Computed {name} on {date}")).await;
    }

    Ok(Some(QuerySnapshot::Single {
        option_name: name.to_string(),
        rows,
    }))
}

/// Phase 3, aggregate mode: expired options at their last trade date,
/// active options at the query date when it is one of their trade dates.
async fn aggregate_snapshot(
    ctx: &TaskContext,
    targets: &[String],
    query_date: NaiveDate,
    reporter: &mut ProgressReporter,
) -> Result<Option<QuerySnapshot>, TaskError> {
    let today = ctx.today();
    let mut aggregate = AggregateSnapshot::default();

    for (done, name) in targets.iter().enumerate() {
        if ctx.is_cancelled() {
            return Ok(None);
        }
        {
            let mut ledger = ctx.ledger.write().await;
            let option = ledger.require_mut(name)?;
            if option.is_expired(today) {
                if let Some(last) = option.last_trade_date() {
                    recompute(option, last)?;
                    aggregate.expired.push(QueryRow::capture(option, last));
                }
            } else if option.has_trade_date(query_date) {
                recompute(option, query_date)?;
                aggregate.active.push(QueryRow::capture(option, query_date));
            }
        }

        let percent = scaled_percent(done + 1, targets.len(), FETCH_END, 100);
        reporter.report(percent, format!("Computed {name}")).await;
    }

    aggregate.active_count = aggregate.active.len();
    aggregate.expired_count = aggregate.expired.len();
    Ok(Some(QuerySnapshot::Aggregate(aggregate)))
}
