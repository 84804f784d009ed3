use option_ledger_core::{LedgerError, PersistenceError};
use thiserror::Error;

/// Errors that end a task run, or prevent one from starting.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Another task is still running against the ledger.
    #[error("a task is already running")]
    Busy,

    /// A keyword selected no option.
    #[error("no option matches keyword '{keyword}'")]
    NoMatch { keyword: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("failed to save ledger: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("ledger save did not finish: {0}")]
    SaveAborted(#[from] tokio::task::JoinError),
}

impl TaskError {
    pub fn no_match(keyword: impl Into<String>) -> Self {
        Self::NoMatch {
            keyword: keyword.into(),
        }
    }
}
