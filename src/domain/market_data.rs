//! Time-bounded market data access on top of a [`MarketData`] source.
//!
//! Every call is wrapped in `tokio::time::timeout`; a timeout becomes
//! [`AdvisorError::Timeout`]. Series are normalised to ascending, one bar
//! per date, and rejected outright if any row is incomplete.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::error::AdvisorError;
use crate::domain::ohlcv::{normalize_series, OhlcvBar};
use crate::domain::quote::{CompanyProfile, Quote};
use crate::ports::market_data_port::MarketData;

#[derive(Clone)]
pub struct MarketDataFetcher {
    source: Arc<dyn MarketData>,
    timeout: Duration,
}

impl MarketDataFetcher {
    pub fn new(source: Arc<dyn MarketData>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// History for `ticker` over `days` calendar days.
    ///
    /// No rows, or any row missing a field, is `DataUnavailable`.
    pub async fn series(&self, ticker: &str, days: u32) -> Result<Vec<OhlcvBar>, AdvisorError> {
        let bars = timeout(self.timeout, self.source.history(ticker, days))
            .await
            .map_err(|_| {
                AdvisorError::timeout(format!("history({})", ticker), self.timeout.as_secs())
            })??;

        if bars.is_empty() {
            return Err(AdvisorError::data_unavailable(ticker, "no rows returned"));
        }
        if let Some(bad) = bars.iter().find(|b| !b.is_complete()) {
            return Err(AdvisorError::data_unavailable(
                ticker,
                format!("incomplete row on {}", bad.date),
            ));
        }

        let bars: Vec<OhlcvBar> = normalize_series(bars)
            .into_iter()
            .map(|mut b| {
                b.ticker = ticker.to_string();
                b
            })
            .collect();
        debug!(ticker, days, bars = bars.len(), "fetched history");
        Ok(bars)
    }

    /// Like [`series`](Self::series) but never fails: any failure is logged
    /// and returned as an empty series.
    pub async fn fetch_series(&self, ticker: &str, days: u32) -> Vec<OhlcvBar> {
        match self.series(ticker, days).await {
            Ok(bars) => bars,
            Err(e) => {
                warn!(ticker, days, error = %e, "no market data");
                Vec::new()
            }
        }
    }

    pub async fn quote(&self, ticker: &str) -> Result<Quote, AdvisorError> {
        timeout(self.timeout, self.source.quote(ticker))
            .await
            .map_err(|_| AdvisorError::timeout(format!("quote({})", ticker), self.timeout.as_secs()))?
    }

    pub async fn profile(&self, ticker: &str) -> Result<CompanyProfile, AdvisorError> {
        timeout(self.timeout, self.source.profile(ticker))
            .await
            .map_err(|_| {
                AdvisorError::timeout(format!("profile({})", ticker), self.timeout.as_secs())
            })?
    }
}
