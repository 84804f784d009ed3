//! Storage and market data for the option ledger.
//!
//! This crate provides:
//! - JSON file persistence for the ledger
//! - A rate-limited, caching client for exchange daily close prices

pub mod day_quotes;
pub mod dce;
pub mod error;
pub mod json_store;

pub use day_quotes::{DayQuotes, DayQuotesParser};
pub use dce::DceClient;
pub use error::DceError;
pub use json_store::JsonLedgerStore;
