#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use option_ledger_core::{
    apply_fetch, FetchOutcome, FixedClock, LedgerStore, MarketDataProvider, OptionTerms,
    PersistenceError, PersistenceStore, SharedLedger,
};
use option_ledger_tasks::{TaskEvent, TaskOutcome, TaskRunner, TaskSettings};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Answers from a fixed price table and records every call.
#[derive(Default)]
pub struct ScriptedProvider {
    prices: Mutex<HashMap<(String, NaiveDate), f64>>,
    calls: Mutex<Vec<(String, NaiveDate)>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(self, code: &str, day: &str, price: f64) -> Self {
        self.prices.lock().insert((code.to_string(), date(day)), price);
        self
    }

    pub fn calls(&self) -> Vec<(String, NaiveDate)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    async fn fetch_close(&self, code: &str, date: NaiveDate) -> Option<f64> {
        self.calls.lock().push((code.to_string(), date));
        self.prices.lock().get(&(code.to_string(), date)).copied()
    }
}

/// Blocks every call until the test releases a permit.
pub struct GatedProvider {
    gate: Semaphore,
    price: f64,
    started: AtomicUsize,
}

impl GatedProvider {
    pub fn new(price: f64) -> Self {
        Self {
            gate: Semaphore::new(0),
            price,
            started: AtomicUsize::new(0),
        }
    }

    pub fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for GatedProvider {
    async fn fetch_close(&self, _code: &str, _date: NaiveDate) -> Option<f64> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.ok()?;
        permit.forget();
        Some(self.price)
    }
}

/// Never answers within any reasonable timeout.
pub struct SlowProvider;

#[async_trait]
impl MarketDataProvider for SlowProvider {
    async fn fetch_close(&self, _code: &str, _date: NaiveDate) -> Option<f64> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Some(1.0)
    }
}

/// Answers every lookup with the same price.
pub struct ConstantProvider(pub f64);

#[async_trait]
impl MarketDataProvider for ConstantProvider {
    async fn fetch_close(&self, _code: &str, _date: NaiveDate) -> Option<f64> {
        Some(self.0)
    }
}

pub struct PanickingProvider;

#[async_trait]
impl MarketDataProvider for PanickingProvider {
    async fn fetch_close(&self, _code: &str, _date: NaiveDate) -> Option<f64> {
        panic!("provider exploded");
    }
}

/// Keeps the last saved ledger in memory.
#[derive(Default)]
pub struct MemoryStore {
    saved: Mutex<Option<LedgerStore>>,
    saves: AtomicUsize,
    fail: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.fail.store(true, Ordering::SeqCst);
        store
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> Option<LedgerStore> {
        self.saved.lock().clone()
    }
}

impl PersistenceStore for MemoryStore {
    fn save(&self, ledger: &LedgerStore) -> Result<(), PersistenceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PersistenceError::Io(std::io::Error::other("disk full")));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.saved.lock() = Some(ledger.clone());
        Ok(())
    }

    fn load(&self) -> Result<LedgerStore, PersistenceError> {
        self.saved
            .lock()
            .clone()
            .ok_or_else(|| PersistenceError::NotFound("memory".into()))
    }
}

/// Records, for every save, whether the ledger could be locked for writing
/// while the save was running.
pub struct LockCheckingStore {
    ledger: SharedLedger,
    writable: Mutex<Vec<bool>>,
}

impl LockCheckingStore {
    pub fn new(ledger: SharedLedger) -> Self {
        Self {
            ledger,
            writable: Mutex::new(Vec::new()),
        }
    }

    pub fn writable(&self) -> Vec<bool> {
        self.writable.lock().clone()
    }
}

impl PersistenceStore for LockCheckingStore {
    fn save(&self, _ledger: &LedgerStore) -> Result<(), PersistenceError> {
        let free = self.ledger.try_write().is_ok();
        self.writable.lock().push(free);
        Ok(())
    }

    fn load(&self) -> Result<LedgerStore, PersistenceError> {
        Err(PersistenceError::NotFound("lock-checking".into()))
    }
}

pub fn terms(code: &str, strike: f64, amount: f64, dates: &[&str]) -> OptionTerms {
    OptionTerms {
        code: code.to_string(),
        strike_price: strike,
        initial_amount: amount,
        trade_dates: dates.iter().map(|d| date(d)).collect(),
    }
}

/// Short soymeal call that expired on 2025-11-05 and a long iron put that
/// trades around 2025-11-10.
pub fn sample_ledger() -> LedgerStore {
    let mut ledger = LedgerStore::new();
    ledger
        .create(
            "m-call",
            terms("m2601", 3000.0, -900.0, &["2025-11-03", "2025-11-04", "2025-11-05"]),
            false,
        )
        .unwrap();
    ledger
        .create(
            "i-put",
            terms("i2601", 800.0, 400.0, &["2025-11-07", "2025-11-10", "2025-11-11"]),
            false,
        )
        .unwrap();
    ledger
}

pub fn mark_missing(ledger: &mut LedgerStore, name: &str, day: &str) {
    let option = ledger.require_mut(name).unwrap();
    apply_fetch(option, date(day), FetchOutcome::Unavailable, date("2099-01-01")).unwrap();
}

pub fn settings(fetch_unattempted_on_query: bool) -> TaskSettings {
    TaskSettings {
        event_buffer: 64,
        fetch_timeout: Duration::from_secs(5),
        fetch_unattempted_on_query,
    }
}

pub fn runner(
    ledger: LedgerStore,
    provider: Arc<dyn MarketDataProvider>,
    store: Arc<MemoryStore>,
    today: &str,
    settings: TaskSettings,
) -> TaskRunner {
    TaskRunner::new(ledger.into_shared(), provider, store)
        .with_clock(Arc::new(FixedClock(date(today))))
        .with_settings(settings)
}

pub fn progress_percents(events: &[TaskEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            TaskEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect()
}

/// Checks the stream shape every run must have and returns its outcome.
pub fn terminal(events: &[TaskEvent]) -> TaskOutcome {
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1, "exactly one terminal event: {events:?}");

    let percents = progress_percents(events);
    assert!(
        percents.windows(2).all(|w| w[0] <= w[1]),
        "progress went backwards: {percents:?}"
    );

    match events.last() {
        Some(TaskEvent::Finished(outcome)) => outcome.clone(),
        other => panic!("last event is not terminal: {other:?}"),
    }
}
