use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub market_data: MarketDataConfig,
    pub tasks: TaskConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding the ledger.
    pub ledger_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    pub base_url: String,
    /// Upper bound for one price lookup, including rate-limit waits.
    pub timeout_secs: u64,
    pub requests_per_second: u32,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Capacity of each task's event channel.
    pub event_buffer: usize,
    /// Also fetch never-attempted dates while resolving stale data in a query.
    pub fetch_unattempted_on_query: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            ledger_path: "option_data.json".to_string(),
        }
    }
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: "http://www.dce.com.cn".to_string(),
            timeout_secs: 10,
            requests_per_second: 5,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            event_buffer: 256,
            fetch_unattempted_on_query: true,
        }
    }
}
