//! Ledger persistence as a single pretty-printed JSON file.
//!
//! The file is an object keyed by option name; each value is the option
//! record with dates as `YYYY-MM-DD` strings and `"N/A"` marking missing
//! close prices.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use option_ledger_core::{LedgerStore, PersistenceError, PersistenceStore};
use tracing::{debug, info};

/// Reads and writes the ledger at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonLedgerStore {
    path: PathBuf,
}

impl JsonLedgerStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the ledger, starting empty when no file exists yet.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] if an existing file cannot be read or decoded.
    pub fn load_or_default(&self) -> Result<LedgerStore, PersistenceError> {
        match self.load() {
            Ok(ledger) => Ok(ledger),
            Err(PersistenceError::NotFound(_)) => {
                info!(
                    path = %self.path.display(),
                    "No ledger file found, starting with an empty ledger"
                );
                Ok(LedgerStore::new())
            }
            Err(e) => Err(e),
        }
    }
}

impl PersistenceStore for JsonLedgerStore {
    /// Creates parent directories if they don't exist.
    fn save(&self, ledger: &LedgerStore) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, ledger)?;
        writer.flush()?;

        debug!(
            path = %self.path.display(),
            options = ledger.len(),
            "Saved ledger"
        );
        Ok(())
    }

    fn load(&self) -> Result<LedgerStore, PersistenceError> {
        if !self.path.exists() {
            return Err(PersistenceError::NotFound(self.path.clone()));
        }

        let file = File::open(&self.path)?;
        let mut ledger: LedgerStore = serde_json::from_reader(BufReader::new(file))?;
        ledger
            .reconcile()
            .map_err(|e| PersistenceError::Invalid {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        info!(
            path = %self.path.display(),
            options = ledger.len(),
            "Loaded ledger"
        );
        Ok(ledger)
    }
}
