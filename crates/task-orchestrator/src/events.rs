use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use option_ledger_core::QuerySnapshot;
use serde::{Deserialize, Serialize};

/// Event streamed from a running task to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskEvent {
    /// Percent is non-decreasing within a run.
    Progress { percent: u8, message: String },

    /// Query result, sent once before a successful `Finished`.
    ResultReady(QuerySnapshot),

    /// Always the last event of a run.
    Finished(TaskOutcome),
}

impl TaskEvent {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskOutcome {
    Completed { error_report: ErrorReport },
    Cancelled,
    Failed { message: String },
}

impl TaskOutcome {
    pub(crate) fn completed(error_report: ErrorReport) -> Self {
        Self::Completed { error_report }
    }

    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Error report of a completed run.
    #[must_use]
    pub const fn error_report(&self) -> Option<&ErrorReport> {
        match self {
            Self::Completed { error_report } => Some(error_report),
            _ => None,
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed { error_report } if error_report.is_empty() => write!(f, "completed"),
            Self::Completed { error_report } => write!(
                f,
                "completed with {} unavailable close price(s)",
                error_report.date_count()
            ),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed { message } => write!(f, "failed: {message}"),
        }
    }
}

/// Dates whose close price stayed unavailable, grouped by option name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorReport(BTreeMap<String, BTreeSet<NaiveDate>>);

impl ErrorReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, option: &str, date: NaiveDate) {
        self.0.entry(option.to_string()).or_default().insert(date);
    }

    pub fn extend(&mut self, option: &str, dates: impl IntoIterator<Item = NaiveDate>) {
        let mut dates = dates.into_iter().peekable();
        if dates.peek().is_some() {
            self.0.entry(option.to_string()).or_default().extend(dates);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of options with at least one unavailable date.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn date_count(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    /// Sorted dates recorded for `option`.
    #[must_use]
    pub fn dates(&self, option: &str) -> Vec<NaiveDate> {
        self.0
            .get(option)
            .map(|dates| dates.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<NaiveDate>)> {
        self.0.iter().map(|(name, dates)| (name.as_str(), dates))
    }

    /// The report as a stale map, e.g. to retry the dates with a refresh.
    #[must_use]
    pub fn to_stale_map(&self) -> BTreeMap<String, Vec<NaiveDate>> {
        self.0
            .iter()
            .map(|(name, dates)| (name.clone(), dates.iter().copied().collect()))
            .collect()
    }
}
