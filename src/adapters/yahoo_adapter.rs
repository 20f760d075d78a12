//! Yahoo Finance chart endpoint adapter.
//!
//! `GET {base_url}/v8/finance/chart/{ticker}` returns columnar arrays with
//! `null` holes; rows with any hole are dropped before they reach the
//! domain. Quotes and profile names come from the same endpoint's `meta`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::domain::error::AdvisorError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::quote::{CompanyProfile, Quote};
use crate::ports::market_data_port::MarketData;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl YahooAdapter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AdvisorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tickerwise/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Chart endpoint for `ticker`, with the symbol percent-encoded as one
    /// path segment (`BRK/B`, `^GSPC`).
    fn chart_url(&self, ticker: &str) -> Result<Url, AdvisorError> {
        let bad_base = |reason: String| AdvisorError::Http {
            reason: format!("invalid base url '{}': {}", self.base_url, reason),
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| bad_base(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| bad_base("cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart"])
            .push(ticker);
        Ok(url)
    }

    async fn chart(&self, ticker: &str, query: &[(&str, String)]) -> Result<Option<ChartResult>, AdvisorError> {
        let url = self.chart_url(ticker)?;
        let response = self.client.get(url.clone()).query(query).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AdvisorError::Http {
                reason: format!("{} returned {}", url, status),
            });
        }
        let body: ChartResponse = response.json().await?;
        if let Some(err) = body.chart.error {
            debug!(ticker, code = ?err.code, description = ?err.description, "chart error");
            return Ok(None);
        }
        Ok(body.chart.result.and_then(|r| r.into_iter().next()))
    }
}

fn rows_from_chart(ticker: &str, result: &ChartResult) -> Vec<OhlcvBar> {
    let Some(q) = result.indicators.quote.first() else {
        return Vec::new();
    };
    let at = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    let mut dropped = 0usize;
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let row = (
            DateTime::<Utc>::from_timestamp(ts, 0),
            at(&q.open, i),
            at(&q.high, i),
            at(&q.low, i),
            at(&q.close, i),
            at(&q.volume, i),
        );
        match row {
            (Some(dt), Some(open), Some(high), Some(low), Some(close), Some(volume)) => {
                bars.push(OhlcvBar {
                    ticker: ticker.to_string(),
                    date: dt.date_naive(),
                    open,
                    high,
                    low,
                    close,
                    volume: volume as i64,
                })
            }
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(ticker, dropped, "dropped incomplete chart rows");
    }
    bars
}

#[async_trait]
impl MarketData for YahooAdapter {
    async fn history(&self, ticker: &str, days: u32) -> Result<Vec<OhlcvBar>, AdvisorError> {
        let end = Utc::now();
        let start = end - chrono::Duration::days(i64::from(days));
        let query = [
            ("period1", start.timestamp().to_string()),
            ("period2", end.timestamp().to_string()),
            ("interval", "1d".to_string()),
        ];
        Ok(self
            .chart(ticker, &query)
            .await?
            .map(|r| rows_from_chart(ticker, &r))
            .unwrap_or_default())
    }

    async fn quote(&self, ticker: &str) -> Result<Quote, AdvisorError> {
        let query = [("range", "5d".to_string()), ("interval", "1d".to_string())];
        let result = self
            .chart(ticker, &query)
            .await?
            .ok_or_else(|| AdvisorError::data_unavailable(ticker, "unknown symbol"))?;
        let bars = rows_from_chart(ticker, &result);
        let meta = &result.meta;

        let price = meta
            .regular_market_price
            .or_else(|| bars.last().map(|b| b.close))
            .ok_or_else(|| AdvisorError::data_unavailable(ticker, "no market price"))?;
        let prev_close = meta
            .chart_previous_close
            .or(meta.previous_close)
            .or_else(|| bars.iter().rev().nth(1).map(|b| b.close))
            .ok_or_else(|| AdvisorError::data_unavailable(ticker, "no previous close"))?;
        let last = bars.last();

        Ok(Quote::new(
            ticker,
            price,
            prev_close,
            meta.regular_market_day_high
                .or(last.map(|b| b.high))
                .unwrap_or(price),
            meta.regular_market_day_low
                .or(last.map(|b| b.low))
                .unwrap_or(price),
            last.map(|b| b.open).unwrap_or(price),
        ))
    }

    async fn profile(&self, ticker: &str) -> Result<CompanyProfile, AdvisorError> {
        let query = [("range", "1d".to_string()), ("interval", "1d".to_string())];
        let result = self
            .chart(ticker, &query)
            .await?
            .ok_or_else(|| AdvisorError::data_unavailable(ticker, "unknown symbol"))?;
        let name = result
            .meta
            .long_name
            .or(result.meta.short_name)
            .unwrap_or_else(|| ticker.to_string());
        Ok(CompanyProfile {
            ticker: ticker.to_string(),
            name,
            ..Default::default()
        })
    }
}
