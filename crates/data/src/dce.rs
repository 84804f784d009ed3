//! Close-price provider backed by the Dalian Commodity Exchange daily quotes page.
//!
//! One page lists every contract traded that day, so pages are fetched once per
//! date and kept for the lifetime of the client. Requests are rate-limited.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use governor::{Quota, RateLimiter};
use option_ledger_core::{MarketDataConfig, MarketDataProvider};
use parking_lot::Mutex;
use reqwest::Client;
use tracing::{debug, warn};

use crate::day_quotes::{DayQuotes, DayQuotesParser};
use crate::error::{DceError, Result};

/// Path of the daily quotes page relative to the exchange base URL.
pub const DAY_QUOTES_PATH: &str = "/publicweb/quotesdata/dayQuotesCh.html";

pub struct DceClient {
    base_url: String,
    user_agent: String,
    requests_per_second: u32,
    http: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
    parser: DayQuotesParser,
    pages: Mutex<HashMap<NaiveDate, Arc<DayQuotes>>>,
}

impl std::fmt::Debug for DceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DceClient")
            .field("base_url", &self.base_url)
            .field("requests_per_second", &self.requests_per_second)
            .field("cached_days", &self.pages.lock().len())
            .finish_non_exhaustive()
    }
}

impl DceClient {
    /// Creates a client from the market data settings.
    ///
    /// # Errors
    /// Returns error if the request rate is zero or the HTTP client cannot be built.
    pub fn new(config: &MarketDataConfig) -> Result<Self> {
        let per_second = NonZeroU32::new(config.requests_per_second).ok_or_else(|| {
            DceError::Configuration("requests_per_second must be greater than zero".to_string())
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            requests_per_second: config.requests_per_second,
            http,
            rate_limiter,
            parser: DayQuotesParser::new()?,
            pages: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Number of trading days whose quotes page is cached.
    #[must_use]
    pub fn cached_days(&self) -> usize {
        self.pages.lock().len()
    }

    /// Returns the quotes of `date`, downloading the page on first use.
    ///
    /// # Errors
    /// Returns error if the page cannot be fetched or is not a quotes page.
    /// Failed lookups are not cached.
    pub async fn day_quotes(&self, date: NaiveDate) -> Result<Arc<DayQuotes>> {
        if let Some(page) = self.pages.lock().get(&date) {
            return Ok(Arc::clone(page));
        }

        let html = self.fetch_page(date).await?;
        let quotes = Arc::new(self.parser.parse(&html)?);
        debug!(%date, contracts = quotes.len(), "Cached daily quotes");

        let mut pages = self.pages.lock();
        Ok(Arc::clone(pages.entry(date).or_insert(quotes)))
    }

    async fn fetch_page(&self, date: NaiveDate) -> Result<String> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, DAY_QUOTES_PATH);
        // The exchange expects a zero-based month.
        let params = [
            ("dayQuotes.variety", "all".to_string()),
            ("dayQuotes.trade_type", "0".to_string()),
            ("year", date.year().to_string()),
            ("month", date.month0().to_string()),
            ("day", format!("{:02}", date.day())),
        ];

        debug!(%date, "GET {}", url);

        let response = self.http.get(&url).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DceError::status(status.as_u16(), url));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl MarketDataProvider for DceClient {
    async fn fetch_close(&self, code: &str, date: NaiveDate) -> Option<f64> {
        match self.day_quotes(date).await {
            Ok(quotes) => {
                let close = quotes.close(code);
                if close.is_none() {
                    debug!(code, %date, listed = quotes.contains(code), "No close price");
                }
                close
            }
            Err(e) => {
                warn!(code, %date, error = %e, "Daily quotes unavailable");
                None
            }
        }
    }
}
