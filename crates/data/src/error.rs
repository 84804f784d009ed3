//! Error types for the exchange quotes client.

use thiserror::Error;

/// Errors that can occur when fetching or reading a daily quotes page.
#[derive(Debug, Error)]
pub enum DceError {
    /// Network error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The exchange answered with a non-success status.
    #[error("HTTP status {status_code} for {url}")]
    Status { status_code: u16, url: String },

    /// The response is not a daily quotes page (holiday notice, error page, ...).
    #[error("response is not a daily quotes page")]
    NotDayQuotes,

    /// No table on the page carries the contract and close columns.
    #[error("quotes table is missing the contract or close column")]
    MissingColumns,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl DceError {
    pub fn status(status_code: u16, url: impl Into<String>) -> Self {
        Self::Status {
            status_code,
            url: url.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DceError>;
