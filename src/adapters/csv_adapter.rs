//! Offline market data from per-ticker CSV files (`<TICKER>.csv`).
//!
//! Headers are matched case-insensitively after trimming, so exports with
//! `Date,Open,High,Low,Close,Volume` work as-is. History windows are
//! anchored at the file's last date, not the wall clock.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use crate::domain::error::AdvisorError;
use crate::domain::ohlcv::{normalize_series, OhlcvBar};
use crate::domain::quote::{CompanyProfile, Quote};
use crate::ports::market_data_port::MarketData;

const REQUIRED: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvMarketAdapter {
    base_path: PathBuf,
}

impl CsvMarketAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    /// All bars in the ticker's file, ascending. A missing file is an empty series.
    async fn load(&self, ticker: &str) -> Result<Vec<OhlcvBar>, AdvisorError> {
        let path = self.csv_path(ticker);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AdvisorError::Io(e)),
        };
        parse_bars(ticker, &content)
    }
}

/// Parse a price CSV with case-insensitive headers.
pub fn parse_bars(ticker: &str, content: &str) -> Result<Vec<OhlcvBar>, AdvisorError> {
    let bad = |reason: String| AdvisorError::data_unavailable(ticker, reason);

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| bad(format!("CSV header error: {}", e)))?
        .clone();
    let columns: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect();
    let mut idx = [0usize; REQUIRED.len()];
    for (slot, name) in idx.iter_mut().zip(REQUIRED) {
        *slot = *columns
            .get(name)
            .ok_or_else(|| bad(format!("missing {} column", name)))?;
    }
    let [date_i, open_i, high_i, low_i, close_i, volume_i] = idx;

    let mut bars = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| bad(format!("CSV parse error: {}", e)))?;
        let field = |i: usize, name: &str| {
            record
                .get(i)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| bad(format!("row {}: missing {}", line + 1, name)))
        };
        let number = |i: usize, name: &str| -> Result<f64, AdvisorError> {
            field(i, name)?
                .parse()
                .map_err(|e| bad(format!("row {}: invalid {}: {}", line + 1, name, e)))
        };

        let date_str = field(date_i, "date")?;
        // tolerate timestamps like "2024-01-15 00:00:00"
        let date = NaiveDate::parse_from_str(date_str.get(..10).unwrap_or(date_str), "%Y-%m-%d")
            .map_err(|e| bad(format!("row {}: invalid date: {}", line + 1, e)))?;

        bars.push(OhlcvBar {
            ticker: ticker.to_string(),
            date,
            open: number(open_i, "open")?,
            high: number(high_i, "high")?,
            low: number(low_i, "low")?,
            close: number(close_i, "close")?,
            volume: number(volume_i, "volume")? as i64,
        });
    }

    Ok(normalize_series(bars))
}

#[async_trait]
impl MarketData for CsvMarketAdapter {
    async fn history(&self, ticker: &str, days: u32) -> Result<Vec<OhlcvBar>, AdvisorError> {
        let bars = self.load(ticker).await?;
        let Some(last) = bars.last().map(|b| b.date) else {
            return Ok(bars);
        };
        let start = last - Duration::days(i64::from(days));
        Ok(bars.into_iter().filter(|b| b.date > start).collect())
    }

    async fn quote(&self, ticker: &str) -> Result<Quote, AdvisorError> {
        let bars = self.load(ticker).await?;
        match bars.as_slice() {
            [.., prev, last] => Ok(Quote::new(
                ticker, last.close, prev.close, last.high, last.low, last.open,
            )),
            [only] => Ok(Quote::new(
                ticker, only.close, only.open, only.high, only.low, only.open,
            )),
            [] => Err(AdvisorError::data_unavailable(ticker, "no price file")),
        }
    }

    async fn profile(&self, ticker: &str) -> Result<CompanyProfile, AdvisorError> {
        Ok(CompanyProfile {
            ticker: ticker.to_string(),
            name: ticker.to_string(),
            ..Default::default()
        })
    }
}
