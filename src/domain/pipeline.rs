//! Pipeline orchestrator: free text in, cards and chat messages out.
//!
//! Stages per request: resolve → partition → per-ticker refresh (fan-out)
//! → one batched inference → classify → assemble (fan-out) → response.
//! Failures are caught at the smallest scope that keeps partial results;
//! nothing here returns an error to the caller of [`Advisor::run`].

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::action::classify;
use crate::domain::baseline::MarketRow;
use crate::domain::error::AdvisorError;
use crate::domain::extraction::{Extractor, DEFAULT_WINDOW_DAYS};
use crate::domain::indicator::transform::compute_frame;
use crate::domain::inference::InferenceEngine;
use crate::domain::market_data::MarketDataFetcher;
use crate::domain::narrative::Narrator;
use crate::domain::recommendation::{
    cards_summary, Classified, Recommendation, RecommendationAssembler, TickerOutcome,
};
use crate::ports::text_port::TextGenerator;

/// Refreshes fetch at least this many calendar days so the 60-bar average warms up.
pub const MIN_REFRESH_DAYS: u32 = 100;

pub const INFERENCE_UNAVAILABLE_MESSAGE: &str =
    "I couldn't retrieve model predictions at this time.";

#[derive(Debug, Clone, Default, Serialize)]
pub struct AdvisorResponse {
    pub cards: Vec<Recommendation>,
    pub chat_messages: Vec<String>,
    pub is_advice: bool,
    /// Notes on silently-defaulted stages; omitted when everything resolved.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub tickers: Vec<String>,
    pub window_days: u32,
    pub degraded: Vec<String>,
}

#[derive(Clone)]
pub struct Advisor {
    engine: Arc<InferenceEngine>,
    market: MarketDataFetcher,
    extractor: Extractor,
    narrator: Narrator,
    assembler: RecommendationAssembler,
    default_window: u32,
}

impl Advisor {
    pub fn new(
        engine: Arc<InferenceEngine>,
        market: MarketDataFetcher,
        text: Arc<dyn TextGenerator>,
        default_window: u32,
    ) -> Self {
        let narrator = Narrator::new(Arc::clone(&text));
        Self {
            engine,
            assembler: RecommendationAssembler::new(market.clone(), narrator.clone()),
            market,
            extractor: Extractor::new(text),
            narrator,
            default_window: if default_window == 0 {
                DEFAULT_WINDOW_DAYS
            } else {
                default_window
            },
        }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn market(&self) -> &MarketDataFetcher {
        &self.market
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn narrator(&self) -> &Narrator {
        &self.narrator
    }

    pub fn default_window(&self) -> u32 {
        self.default_window
    }

    /// Answer one free-text request.
    pub async fn run(&self, user_text: &str, window_override: Option<u32>) -> AdvisorResponse {
        let resolution = self.resolve(user_text, window_override).await;
        info!(
            tickers = ?resolution.tickers,
            days = resolution.window_days,
            "resolved request"
        );
        self.respond(user_text, resolution).await
    }

    /// Tickers and window from free text. Failures fall back to no tickers
    /// and the default window, each leaving a note in `degraded`.
    pub async fn resolve(&self, user_text: &str, window_override: Option<u32>) -> Resolution {
        let window = async {
            match window_override {
                Some(days) if days > 0 => Ok(days),
                _ => self.extractor.window_days(user_text).await,
            }
        };
        let (tickers, window) = tokio::join!(self.extractor.tickers(user_text), window);

        let mut degraded = Vec::new();
        let tickers = tickers.unwrap_or_else(|e| {
            warn!(stage = "resolve", error = %e, "ticker extraction failed");
            degraded.push(format!("ticker extraction failed ({}); treated as no tickers", e));
            Vec::new()
        });
        let window_days = window.unwrap_or_else(|e| {
            warn!(stage = "resolve", error = %e, "window extraction failed");
            degraded.push(format!(
                "time window extraction failed ({}); using {} days",
                e, self.default_window
            ));
            self.default_window
        });

        Resolution {
            tickers,
            window_days,
            degraded,
        }
    }

    /// Build the response for an already-resolved request.
    pub async fn respond(&self, user_text: &str, resolution: Resolution) -> AdvisorResponse {
        let mut response = AdvisorResponse {
            degraded: resolution.degraded,
            ..Default::default()
        };
        let days = resolution.window_days;

        if resolution.tickers.is_empty() {
            response.chat_messages.push(self.narrator.summary(user_text).await);
            return response;
        }

        let (supported, unsupported) = match self.engine.universe() {
            Some(universe) => universe.partition(&resolution.tickers),
            None => {
                warn!(stage = "partition", "inference unavailable; narrative only");
                response
                    .chat_messages
                    .push(INFERENCE_UNAVAILABLE_MESSAGE.to_string());
                response
                    .degraded
                    .push("policy unavailable; no recommendations produced".to_string());
                (Vec::new(), resolution.tickers.clone())
            }
        };
        response.is_advice = !supported.is_empty();

        if !supported.is_empty() {
            if days != self.default_window {
                let trends = self.trend_messages(&supported, days).await;
                response.chat_messages.extend(trends);
            }
            match self.recommend(&supported, days).await {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        response.chat_messages.extend(outcome.messages());
                        if let Ok(card) = outcome.result {
                            response.cards.push(card);
                        }
                    }
                }
                Err(e) => {
                    warn!(stage = "inference", error = %e, "batch inference failed");
                    response
                        .chat_messages
                        .push(INFERENCE_UNAVAILABLE_MESSAGE.to_string());
                }
            }
        }

        let overviews =
            join_all(unsupported.iter().map(|t| self.narrator.company_overview(t))).await;
        response.chat_messages.extend(overviews);

        if let Some(line) = cards_summary(&response.cards) {
            response.chat_messages.insert(0, line);
        }
        response
    }

    /// Policy recommendations for universe members, one outcome per ticker
    /// in input order. Fails as a whole only if the policy cannot run.
    pub async fn recommend(
        &self,
        tickers: &[String],
        days: u32,
    ) -> Result<Vec<TickerOutcome>, AdvisorError> {
        let state = self.engine.state()?;
        let lookback = days.max(MIN_REFRESH_DAYS);

        let refreshed = join_all(tickers.iter().map(|t| self.refresh(t, lookback))).await;

        let mut builder = self.engine.observation_builder()?;
        let refreshed: Vec<Result<MarketRow, AdvisorError>> = refreshed
            .into_iter()
            .map(|r| r.and_then(|row| builder.overlay(&row).map(|_| row)))
            .collect();

        for (ticker, r) in tickers.iter().zip(&refreshed) {
            if let Err(e) = r {
                warn!(ticker = %ticker, stage = "refresh", error = %e, "ticker skipped");
            }
        }
        if refreshed.iter().all(Result::is_err) {
            return Ok(tickers
                .iter()
                .zip(refreshed)
                .filter_map(|(t, r)| r.err().map(|e| TickerOutcome::failed(t, e)))
                .collect());
        }

        let observation = builder.build()?;
        let engine = Arc::clone(&self.engine);
        let actions = tokio::task::spawn_blocking(move || engine.infer(&observation))
            .await
            .map_err(|e| AdvisorError::InferenceUnavailable {
                reason: e.to_string(),
            })??;

        let outcomes = tickers.iter().zip(refreshed).map(|(ticker, r)| {
            let classified = r.and_then(|row| {
                let action_value = actions.value_for(&state.universe, ticker)?;
                Ok(Classified {
                    action: classify(action_value),
                    action_value,
                    row,
                })
            });
            async move {
                match classified {
                    Ok(c) => self.assembler.assemble(ticker, c).await,
                    Err(e) => TickerOutcome::failed(ticker, e),
                }
            }
        });
        Ok(join_all(outcomes).await)
    }

    async fn refresh(&self, ticker: &str, days: u32) -> Result<MarketRow, AdvisorError> {
        let bars = self.market.series(ticker, days).await?;
        let frame = compute_frame(ticker, &bars)?;
        Ok(MarketRow::from_indicator_row(ticker, frame.latest()))
    }

    async fn trend_messages(&self, tickers: &[String], days: u32) -> Vec<String> {
        join_all(tickers.iter().map(|t| self.trend_message(t, days)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn trend_message(&self, ticker: &str, days: u32) -> Option<String> {
        let bars = self.market.fetch_series(ticker, days).await;
        if bars.is_empty() {
            return None;
        }
        let table: Vec<String> = bars
            .iter()
            .map(|b| format!("{} {:.2}", b.date, b.close))
            .collect();
        let prompt = format!(
            "The following is the historical price data for {} for the last {} days, from oldest to newest:\n\ndate close\n{}\n\nBased *only* on this data, briefly summarize the price trend over this period.",
            ticker,
            days,
            table.join("\n")
        );
        let summary = self.narrator.summary(&prompt).await;
        Some(format!(
            "Regarding the {}-day trend for {}: {}",
            days, ticker, summary
        ))
    }
}
