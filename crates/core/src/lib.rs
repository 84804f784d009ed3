pub mod calendar;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod ledger;
pub mod model;
pub mod policy;
pub mod recompute;
pub mod snapshot;
pub mod traits;

pub use config::{AppConfig, MarketDataConfig, StorageConfig, TaskConfig};
pub use config_loader::ConfigLoader;
pub use error::{LedgerError, PersistenceError};
pub use ledger::{LedgerStore, SharedLedger};
pub use model::{ClosePrice, OptionContract, OptionTerms, MISSING_SENTINEL};
pub use policy::{apply_fetch, FetchEffect, FetchOutcome};
pub use recompute::{recompute, recompute_all};
pub use snapshot::{AggregateSnapshot, QueryRow, QuerySnapshot};
pub use traits::{Clock, FixedClock, MarketDataProvider, PersistenceStore, SystemClock};
