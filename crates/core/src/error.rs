//! Error types for ledger maintenance and persistence.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed or missing user input. Nothing was mutated.
    #[error("validation error: {0}")]
    Validation(String),

    /// The named option does not exist.
    #[error("option not found: {name}")]
    OptionNotFound {
        /// Name that was looked up.
        name: String,
    },

    /// The date is not one of the option's trade dates.
    #[error("trade date {date} not found for option {name}")]
    DateNotFound {
        /// Option that was addressed.
        name: String,
        /// Date that is not a trade date.
        date: NaiveDate,
    },

    /// A save targeted an existing name without overwrite confirmation.
    #[error("option already exists: {name} (confirm overwrite to replace it)")]
    DuplicateName {
        /// The conflicting name.
        name: String,
    },

    /// Loading or saving the ledger failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl LedgerError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn option_not_found(name: &str) -> Self {
        Self::OptionNotFound {
            name: name.to_string(),
        }
    }
}

/// Errors from a [`crate::traits::PersistenceStore`].
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// No ledger has been saved at the location yet.
    #[error("ledger file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// IO error reading/writing the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file decoded but holds inconsistent records.
    #[error("invalid ledger file {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
