#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tickerwise::domain::action::ActionVector;
use tickerwise::domain::baseline::{BaselineTable, MarketRow};
use tickerwise::domain::error::AdvisorError;
use tickerwise::domain::indicator::IndicatorSnapshot;
use tickerwise::domain::inference::InferenceEngine;
use tickerwise::domain::market_data::MarketDataFetcher;
use tickerwise::domain::observation::{expected_len, Observation, INITIAL_AMOUNT};
pub use tickerwise::domain::ohlcv::OhlcvBar;
use tickerwise::domain::pipeline::Advisor;
use tickerwise::domain::quote::{CompanyProfile, Quote};
use tickerwise::domain::universe::AssetUniverse;
use tickerwise::ports::market_data_port::MarketData;
use tickerwise::ports::policy_port::Policy;
use tickerwise::ports::text_port::{TextGenerator, TextRequest};

pub const UNIVERSE: [&str; 4] = ["AAPL", "MSFT", "GOOG", "AMZN"];

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `n` consecutive daily bars with a gentle trend and a small wiggle.
pub fn make_bars(ticker: &str, n: usize, start: f64, drift: f64) -> Vec<OhlcvBar> {
    (0..n)
        .map(|i| {
            let close = start + drift * i as f64 + (i as f64 * 0.7).sin();
            OhlcvBar {
                ticker: ticker.to_string(),
                date: date(2024, 1, 1) + chrono::Duration::days(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000 + i as i64,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

pub struct MockMarketData {
    pub bars: HashMap<String, Vec<OhlcvBar>>,
    pub history_errors: HashSet<String>,
    pub quote_errors: HashSet<String>,
    pub history_calls: AtomicUsize,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            bars: HashMap::new(),
            history_errors: HashSet::new(),
            quote_errors: HashSet::new(),
            history_calls: AtomicUsize::new(0),
        }
    }

    /// 150 bars for every ticker in `tickers`.
    pub fn with_series(mut self, tickers: &[&str]) -> Self {
        for (i, t) in tickers.iter().enumerate() {
            let bars = make_bars(t, 150, 100.0 + 50.0 * i as f64, 0.2);
            self.bars.insert(t.to_string(), bars);
        }
        self
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.bars.insert(ticker.to_string(), bars);
        self
    }

    pub fn failing_history(mut self, ticker: &str) -> Self {
        self.history_errors.insert(ticker.to_string());
        self
    }

    pub fn failing_quote(mut self, ticker: &str) -> Self {
        self.quote_errors.insert(ticker.to_string());
        self
    }
}

#[async_trait]
impl MarketData for MockMarketData {
    async fn history(&self, ticker: &str, _days: u32) -> Result<Vec<OhlcvBar>, AdvisorError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if self.history_errors.contains(ticker) {
            return Err(AdvisorError::Http {
                reason: format!("upstream refused {}", ticker),
            });
        }
        Ok(self.bars.get(ticker).cloned().unwrap_or_default())
    }

    async fn quote(&self, ticker: &str) -> Result<Quote, AdvisorError> {
        if self.quote_errors.contains(ticker) {
            return Err(AdvisorError::Http {
                reason: "quote endpoint down".into(),
            });
        }
        let bars = self
            .bars
            .get(ticker)
            .filter(|b| b.len() >= 2)
            .ok_or_else(|| AdvisorError::data_unavailable(ticker, "no quote"))?;
        let (prev, last) = (&bars[bars.len() - 2], &bars[bars.len() - 1]);
        Ok(Quote::new(
            ticker, last.close, prev.close, last.high, last.low, last.open,
        ))
    }

    async fn profile(&self, ticker: &str) -> Result<CompanyProfile, AdvisorError> {
        Ok(CompanyProfile {
            ticker: ticker.to_string(),
            name: format!("{} Inc.", ticker),
            ..Default::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Text generation
// ---------------------------------------------------------------------------

/// Answers each prompt family with a canned reply, routed on the system prompt.
pub struct ScriptedTextGenerator {
    pub tickers: HashMap<String, Vec<String>>,
    pub window_days: HashMap<String, String>,
    pub watchlist_messages: HashSet<String>,
    pub malformed_narrative: HashSet<String>,
    pub fail_extraction: bool,
    pub requests: Mutex<Vec<TextRequest>>,
}

impl ScriptedTextGenerator {
    pub fn new() -> Self {
        Self {
            tickers: HashMap::new(),
            window_days: HashMap::new(),
            watchlist_messages: HashSet::new(),
            malformed_narrative: HashSet::new(),
            fail_extraction: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_tickers(mut self, message: &str, tickers: &[&str]) -> Self {
        self.tickers.insert(
            message.to_string(),
            tickers.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    pub fn with_window(mut self, message: &str, reply: &str) -> Self {
        self.window_days
            .insert(message.to_string(), reply.to_string());
        self
    }

    pub fn with_watchlist_intent(mut self, message: &str) -> Self {
        self.watchlist_messages.insert(message.to_string());
        self
    }

    pub fn malformed_for(mut self, ticker: &str) -> Self {
        self.malformed_narrative.insert(ticker.to_string());
        self
    }

    pub fn failing_extraction(mut self) -> Self {
        self.fail_extraction = true;
        self
    }

    /// Requests whose system prompt contains `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.system.contains(needle))
            .count()
    }
}

pub const ANALYSIS_MARKER: &str = "structured financial analysis";

#[async_trait]
impl TextGenerator for ScriptedTextGenerator {
    async fn complete(&self, request: &TextRequest) -> Result<String, AdvisorError> {
        self.requests.lock().unwrap().push(request.clone());
        let system = request.system.as_str();
        let user = request.user.as_str();

        if system.contains("stock ticker symbol") {
            if self.fail_extraction {
                return Err(AdvisorError::Http {
                    reason: "model offline".into(),
                });
            }
            let tickers = self.tickers.get(user).cloned().unwrap_or_default();
            return Ok(serde_json::json!({ "tickers": tickers }).to_string());
        }
        if system.contains("time window") {
            if self.fail_extraction {
                return Err(AdvisorError::Http {
                    reason: "model offline".into(),
                });
            }
            return Ok(self
                .window_days
                .get(user)
                .cloned()
                .unwrap_or_else(|| "90".to_string()));
        }
        if system.contains("analyze their stock watchlist") {
            return Ok(self.watchlist_messages.contains(user).to_string());
        }
        if system.contains("summary for a watchlist analysis") {
            return Ok(r#"{"summary_text": "Your watchlist leans bullish."}"#.to_string());
        }
        if system.contains(ANALYSIS_MARKER) {
            if self
                .malformed_narrative
                .iter()
                .any(|t| user.contains(&format!("\"ticker\": \"{}\"", t)))
            {
                return Ok("I'm sorry, I can't produce JSON today.".to_string());
            }
            return Ok(r#"```json
{"summary_text": "Momentum is constructive.",
 "action_tags": ["BULLISH", "SHORT-TERM", "MODERATE-RISK"],
 "pros": ["RSI is neutral"],
 "cons": ["Price is near the upper band"]}
```"#
                .to_string());
        }
        if system.contains("title generation") {
            return Ok("\"Apple Stock Outlook\"".to_string());
        }
        Ok(format!("Summary of: {}", user.chars().take(40).collect::<String>()))
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Returns fixed action values and remembers every observation it saw.
pub struct FakePolicy {
    pub actions: Vec<f64>,
    pub calls: AtomicUsize,
    pub observations: Mutex<Vec<Vec<f32>>>,
}

impl FakePolicy {
    pub fn new(actions: Vec<f64>) -> Self {
        Self {
            actions,
            calls: AtomicUsize::new(0),
            observations: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_observation(&self) -> Option<Vec<f32>> {
        self.observations.lock().unwrap().last().cloned()
    }
}

impl Policy for FakePolicy {
    fn observation_dim(&self) -> usize {
        expected_len(self.actions.len())
    }

    fn action_dim(&self) -> usize {
        self.actions.len()
    }

    fn act(&self, observation: &Observation) -> Result<ActionVector, AdvisorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.observations
            .lock()
            .unwrap()
            .push(observation.as_slice().to_vec());
        Ok(ActionVector::clamped(self.actions.clone()))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn universe() -> AssetUniverse {
    AssetUniverse::new(UNIVERSE.iter().map(|t| t.to_string()).collect()).unwrap()
}

/// Baseline close for universe member `i` is `10 * (i + 1)`.
pub fn baseline_close(i: usize) -> f64 {
    10.0 * (i + 1) as f64
}

pub fn baseline(universe: &AssetUniverse) -> BaselineTable {
    let rows = universe
        .tickers()
        .iter()
        .enumerate()
        .map(|(i, t)| MarketRow {
            ticker: t.clone(),
            date: date(2023, 12, 29),
            close: baseline_close(i),
            volume: 500,
            indicators: IndicatorSnapshot::new([i as f64; 8]),
        })
        .collect();
    BaselineTable::aligned(universe, rows).unwrap()
}

/// Actions by universe index: AAPL buy, MSFT sell, GOOG hold, AMZN buy.
pub const DEFAULT_ACTIONS: [f64; 4] = [0.3, -0.5, 0.01, 0.8];

pub fn ready_engine(policy: Arc<FakePolicy>) -> Arc<InferenceEngine> {
    let universe = universe();
    let baseline = baseline(&universe);
    Arc::new(InferenceEngine::ready(universe, baseline, policy, INITIAL_AMOUNT).unwrap())
}

pub fn advisor_with(
    engine: Arc<InferenceEngine>,
    market: Arc<MockMarketData>,
    text: Arc<ScriptedTextGenerator>,
) -> Advisor {
    Advisor::new(
        engine,
        MarketDataFetcher::new(market, Duration::from_secs(5)),
        text,
        90,
    )
}
