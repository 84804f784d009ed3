use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use option_ledger_core::{
    AppConfig, Clock, MarketDataProvider, PersistenceStore, SharedLedger, SystemClock,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::context::TaskContext;
use crate::error::TaskError;
use crate::events::{TaskEvent, TaskOutcome};
use crate::progress::ProgressReporter;
use crate::query::{run_query, QueryRequest};
use crate::refresh::{run_refresh, RefreshRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Refresh,
    Query,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refresh => write!(f, "refresh"),
            Self::Query => write!(f, "query"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSettings {
    /// Capacity of the event channel of each run.
    pub event_buffer: usize,
    /// Upper bound for one provider call.
    pub fetch_timeout: Duration,
    pub fetch_unattempted_on_query: bool,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            event_buffer: 256,
            fetch_timeout: Duration::from_secs(10),
            fetch_unattempted_on_query: true,
        }
    }
}

impl From<&AppConfig> for TaskSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            event_buffer: config.tasks.event_buffer.max(1),
            fetch_timeout: Duration::from_secs(config.market_data.timeout_secs),
            fetch_unattempted_on_query: config.tasks.fetch_unattempted_on_query,
        }
    }
}

/// Starts refresh and query runs against a shared ledger, one at a time.
pub struct TaskRunner {
    ledger: SharedLedger,
    provider: Arc<dyn MarketDataProvider>,
    store: Arc<dyn PersistenceStore>,
    clock: Arc<dyn Clock>,
    settings: TaskSettings,
    busy: Arc<AtomicBool>,
}

impl TaskRunner {
    #[must_use]
    pub fn new(
        ledger: SharedLedger,
        provider: Arc<dyn MarketDataProvider>,
        store: Arc<dyn PersistenceStore>,
    ) -> Self {
        Self {
            ledger,
            provider,
            store,
            clock: Arc::new(SystemClock),
            settings: TaskSettings::default(),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: TaskSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The ledger tasks run against. Read it after a run has finished.
    #[must_use]
    pub fn ledger(&self) -> SharedLedger {
        Arc::clone(&self.ledger)
    }

    #[must_use]
    pub const fn settings(&self) -> &TaskSettings {
        &self.settings
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Spawns a refresh run.
    ///
    /// # Errors
    /// Returns [`TaskError::Busy`] while another run is active.
    pub fn start_refresh(&self, request: RefreshRequest) -> Result<TaskHandle, TaskError> {
        self.spawn(TaskKind::Refresh, move |ctx, mut reporter| async move {
            run_refresh(&ctx, request, &mut reporter).await
        })
    }

    /// Spawns a query run. The configured unattempted-date setting is
    /// applied on top of the request.
    ///
    /// # Errors
    /// Returns [`TaskError::Busy`] while another run is active.
    pub fn start_query(&self, request: QueryRequest) -> Result<TaskHandle, TaskError> {
        let request = if self.settings.fetch_unattempted_on_query {
            request.with_unattempted(true)
        } else {
            request
        };
        self.spawn(TaskKind::Query, move |ctx, mut reporter| async move {
            run_query(&ctx, request, &mut reporter).await
        })
    }

    fn spawn<F, Fut>(&self, kind: TaskKind, body: F) -> Result<TaskHandle, TaskError>
    where
        F: FnOnce(TaskContext, ProgressReporter) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<TaskOutcome, TaskError>> + Send + 'static,
    {
        let guard = BusyGuard::acquire(&self.busy)?;

        let (tx, rx) = mpsc::channel(self.settings.event_buffer.max(1));
        let cancel = CancellationToken::new();
        let ctx = TaskContext {
            ledger: Arc::clone(&self.ledger),
            provider: Arc::clone(&self.provider),
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            fetch_timeout: self.settings.fetch_timeout,
            cancel: cancel.clone(),
        };
        let reporter = ProgressReporter::new(tx.clone());

        info!(task = %kind, "Task started");
        let join = tokio::spawn(async move {
            // Panics inside the run surface here as a join error.
            let outcome = match tokio::spawn(body(ctx, reporter)).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    error!(task = %kind, error = %e, "Task failed");
                    TaskOutcome::failed(e.to_string())
                }
                Err(e) => {
                    error!(task = %kind, error = %e, "Task aborted");
                    TaskOutcome::failed(format!("internal error: {e}"))
                }
            };

            drop(guard);
            info!(task = %kind, outcome = %outcome, "Task finished");
            if tx.send(TaskEvent::Finished(outcome.clone())).await.is_err() {
                tracing::trace!("Event receiver dropped before the terminal event");
            }
            outcome
        });

        Ok(TaskHandle {
            kind,
            cancel,
            events: rx,
            join,
        })
    }
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("settings", &self.settings)
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

/// Holds the single-run slot until dropped.
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, TaskError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| TaskError::Busy)?;
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Caller side of one run: its event stream and cancel switch.
#[derive(Debug)]
pub struct TaskHandle {
    kind: TaskKind,
    cancel: CancellationToken,
    events: mpsc::Receiver<TaskEvent>,
    join: JoinHandle<TaskOutcome>,
}

impl TaskHandle {
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Requests cancellation. The run stops at its next unit boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this run, e.g. for a Ctrl-C handler.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next event, or `None` after the terminal event has been received.
    pub async fn next_event(&mut self) -> Option<TaskEvent> {
        self.events.recv().await
    }

    /// Drains every event of the run, the terminal one last.
    pub async fn collect(mut self) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        events
    }

    /// Waits for the run to finish, discarding remaining events.
    pub async fn wait(mut self) -> TaskOutcome {
        while self.events.recv().await.is_some() {}
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => TaskOutcome::failed(format!("internal error: {e}")),
        }
    }
}
