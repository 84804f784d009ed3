use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use option_ledger_core::{
    apply_fetch, Clock, FetchEffect, FetchOutcome, MarketDataProvider, PersistenceStore,
    SharedLedger,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TaskError;
use crate::progress::{scaled_percent, ProgressReporter};

/// One (option, trade date) pair to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchUnit {
    pub option: String,
    pub date: NaiveDate,
}

impl FetchUnit {
    pub fn new(option: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            option: option.into(),
            date,
        }
    }
}

/// Everything a run needs, shared with the runner that spawned it.
#[derive(Clone)]
pub struct TaskContext {
    pub ledger: SharedLedger,
    pub provider: Arc<dyn MarketDataProvider>,
    pub store: Arc<dyn PersistenceStore>,
    pub clock: Arc<dyn Clock>,
    pub fetch_timeout: Duration,
    pub cancel: CancellationToken,
}

impl TaskContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Saves a copy of the current ledger on the blocking pool. The ledger
    /// lock is released before the store is called.
    pub async fn persist(&self) -> Result<(), TaskError> {
        let ledger = self.ledger.read().await.clone();
        let options = ledger.len();
        let store = Arc::clone(&self.store);

        tokio::task::spawn_blocking(move || store.save(&ledger)).await??;
        info!(options, "Ledger saved");
        Ok(())
    }

    /// Fetches one unit and folds the result into the ledger.
    ///
    /// Returns `None` when the run was cancelled while the provider call was
    /// in flight; its result is then discarded.
    pub async fn fetch_unit(&self, unit: &FetchUnit) -> Result<Option<FetchEffect>, TaskError> {
        let code = {
            let ledger = self.ledger.read().await;
            ledger.require(&unit.option)?.code().to_string()
        };

        let price = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!(option = %unit.option, date = %unit.date, "Fetch abandoned");
                return Ok(None);
            }
            result = tokio::time::timeout(
                self.fetch_timeout,
                self.provider.fetch_close(&code, unit.date),
            ) => result.unwrap_or_else(|_| {
                warn!(%code, date = %unit.date, "Close price fetch timed out");
                None
            }),
        };

        debug!(%code, date = %unit.date, ?price, "Fetched close price");

        let today = self.today();
        let mut ledger = self.ledger.write().await;
        let option = ledger.require_mut(&unit.option)?;
        let effect = apply_fetch(option, unit.date, FetchOutcome::from(price), today)?;
        Ok(Some(effect))
    }

    /// Fetches `units` in order, reporting progress across `start..=end`.
    ///
    /// Returns `None` if the run was cancelled before all units finished.
    /// Units completed before that keep their effect on the ledger.
    pub async fn fetch_units(
        &self,
        units: &[FetchUnit],
        reporter: &mut ProgressReporter,
        start: u8,
        end: u8,
    ) -> Result<Option<Vec<FetchEffect>>, TaskError> {
        let mut effects = Vec::with_capacity(units.len());

        for (done, unit) in units.iter().enumerate() {
            if self.is_cancelled() {
                return Ok(None);
            }
            let Some(effect) = self.fetch_unit(unit).await? else {
                return Ok(None);
            };
            effects.push(effect);

            let percent = scaled_percent(done + 1, units.len(), start, end);
            reporter
                .report(percent, format!("Fetched {} on {}", unit.option, unit.date))
                .await;
        }

        Ok(Some(effects))
    }
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("fetch_timeout", &self.fetch_timeout)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
