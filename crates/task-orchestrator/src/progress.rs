use option_ledger_core::QuerySnapshot;
use tokio::sync::mpsc;
use tracing::trace;

use crate::events::TaskEvent;

/// Sends progress and result events for one run.
///
/// Percentages never go backwards: a lower value than the last one sent is
/// raised to it.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: mpsc::Sender<TaskEvent>,
    last: u8,
}

impl ProgressReporter {
    #[must_use]
    pub const fn new(tx: mpsc::Sender<TaskEvent>) -> Self {
        Self { tx, last: 0 }
    }

    #[must_use]
    pub const fn last_percent(&self) -> u8 {
        self.last
    }

    pub async fn report(&mut self, percent: u8, message: impl Into<String>) {
        let percent = percent.min(100).max(self.last);
        self.last = percent;
        self.send(TaskEvent::Progress {
            percent,
            message: message.into(),
        })
        .await;
    }

    pub async fn publish(&mut self, snapshot: QuerySnapshot) {
        self.send(TaskEvent::ResultReady(snapshot)).await;
    }

    async fn send(&self, event: TaskEvent) {
        // A caller that stopped listening does not stop the run.
        if self.tx.send(event).await.is_err() {
            trace!("Event receiver dropped");
        }
    }
}

/// Maps `done` of `total` units onto the band `start..=end`, rounded.
///
/// An empty band of work counts as finished.
#[must_use]
pub fn scaled_percent(done: usize, total: usize, start: u8, end: u8) -> u8 {
    if total == 0 {
        return end;
    }
    let span = f64::from(end.saturating_sub(start));
    let fraction = done.min(total) as f64 / total as f64;
    start.saturating_add((span * fraction).round() as u8).min(end)
}
