//! Background refresh and query tasks over the shared option ledger.
//!
//! A [`TaskRunner`] spawns one run at a time on the tokio runtime. Each run
//! streams [`TaskEvent`]s through its [`TaskHandle`] and ends with exactly one
//! [`TaskEvent::Finished`]. Cancellation is cooperative and checked between
//! units of work.

pub mod context;
pub mod error;
pub mod events;
pub mod progress;
pub mod query;
pub mod refresh;
pub mod runner;
pub mod selection;

pub use context::{FetchUnit, TaskContext};
pub use error::TaskError;
pub use events::{ErrorReport, TaskEvent, TaskOutcome};
pub use progress::ProgressReporter;
pub use query::QueryRequest;
pub use refresh::{RefreshRequest, RefreshScope};
pub use runner::{TaskHandle, TaskKind, TaskRunner, TaskSettings};
pub use selection::Selection;
