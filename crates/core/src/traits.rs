use crate::error::PersistenceError;
use crate::ledger::LedgerStore;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Source of daily settlement prices.
///
/// Implementations never fail: transport or parse problems are reported as
/// `None` (unavailable).
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_close(&self, code: &str, date: NaiveDate) -> Option<f64>;
}

/// Durable storage for the whole ledger.
pub trait PersistenceStore: Send + Sync {
    /// # Errors
    /// Returns [`PersistenceError`] if the ledger cannot be written.
    fn save(&self, ledger: &LedgerStore) -> Result<(), PersistenceError>;

    /// # Errors
    /// Returns [`PersistenceError::NotFound`] if nothing was saved yet, or
    /// another [`PersistenceError`] if reading or decoding fails.
    fn load(&self) -> Result<LedgerStore, PersistenceError>;
}

/// Wall-clock date source.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
