use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use option_ledger_core::{AppConfig, ConfigLoader, LedgerStore, PersistenceStore};
use option_ledger_data::JsonLedgerStore;

/// Configuration and ledger file shared by every command.
pub struct App {
    pub config: AppConfig,
    pub store: Arc<JsonLedgerStore>,
}

impl App {
    /// Loads the configuration. `ledger` replaces the configured ledger path.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be parsed.
    pub fn load(config_path: &str, ledger: Option<PathBuf>) -> Result<Self> {
        let config = ConfigLoader::load_from(config_path)
            .with_context(|| format!("failed to load configuration from {config_path}"))?;
        let path = ledger.unwrap_or_else(|| PathBuf::from(&config.storage.ledger_path));
        tracing::debug!(ledger = %path.display(), "Using ledger file");

        Ok(Self {
            config,
            store: Arc::new(JsonLedgerStore::new(path)),
        })
    }

    #[cfg(test)]
    pub fn with_ledger_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config: AppConfig::default(),
            store: Arc::new(JsonLedgerStore::new(path)),
        }
    }

    pub fn ledger_path(&self) -> &Path {
        self.store.path()
    }

    /// Reads the ledger file, or starts an empty ledger if there is none.
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be read.
    pub fn load_ledger(&self) -> Result<LedgerStore> {
        self.store
            .load_or_default()
            .with_context(|| format!("failed to load ledger {}", self.ledger_path().display()))
    }

    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_ledger(&self, ledger: &LedgerStore) -> Result<()> {
        self.store
            .save(ledger)
            .with_context(|| format!("failed to save ledger {}", self.ledger_path().display()))
    }
}
