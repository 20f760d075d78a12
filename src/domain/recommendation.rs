//! Per-ticker recommendation cards and their assembly.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::action::Action;
use crate::domain::baseline::MarketRow;
use crate::domain::error::AdvisorError;
use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::market_data::MarketDataFetcher;
use crate::domain::narrative::{AnalysisInput, Narrator};
use crate::domain::quote::PriceField;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub ticker: String,
    pub prediction_date: NaiveDate,
    pub recommendation: RecommendationBody,
    pub analysis: AnalysisBody,
    pub data: CardData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationBody {
    pub action: Action,
    pub action_value: f64,
    pub summary: String,
    pub action_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisBody {
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardData {
    pub close_price: f64,
    pub volume: i64,
    pub technical_indicators: IndicatorSnapshot,
    pub current_price: PriceField,
    pub percent_change: PriceField,
}

/// A classified policy decision for one ticker, before narrative.
#[derive(Debug, Clone)]
pub struct Classified {
    pub action: Action,
    pub action_value: f64,
    /// The row the observation used for this ticker.
    pub row: MarketRow,
}

/// Everything one ticker contributes to a response.
///
/// `notices` are informational lines (e.g. a stale-price warning) that
/// appear even when `result` is an error.
#[derive(Debug)]
pub struct TickerOutcome {
    pub ticker: String,
    pub notices: Vec<String>,
    pub result: Result<Recommendation, AdvisorError>,
}

impl TickerOutcome {
    pub fn failed(ticker: &str, err: AdvisorError) -> Self {
        Self {
            ticker: ticker.to_string(),
            notices: Vec::new(),
            result: Err(err),
        }
    }

    /// Chat lines for this ticker: notices first, then the failure message if any.
    pub fn messages(&self) -> Vec<String> {
        let mut out = self.notices.clone();
        if let Err(e) = &self.result {
            out.push(failure_message(&self.ticker, e));
        }
        out
    }
}

/// The user-facing line for a per-ticker failure.
pub fn failure_message(ticker: &str, err: &AdvisorError) -> String {
    match err {
        AdvisorError::NarrativeMalformed { .. } => format!(
            "The AI model failed to generate a detailed analysis for {}.",
            ticker
        ),
        _ => format!("I couldn't retrieve a prediction for {} at this time.", ticker),
    }
}

pub fn stale_price_notice(ticker: &str) -> String {
    format!(
        "Could not fetch real-time price for {}. The displayed price may be from the last trading day.",
        ticker
    )
}

/// One line introducing the cards; `None` when there are none.
pub fn cards_summary(cards: &[Recommendation]) -> Option<String> {
    match cards {
        [] => None,
        [only] => Some(format!("Here is the analysis for {}.", only.ticker)),
        many => {
            let names: Vec<&str> = many.iter().map(|c| c.ticker.as_str()).collect();
            Some(format!(
                "I have prepared a detailed analysis for {}. You can find the cards below.",
                names.join(", ")
            ))
        }
    }
}

#[derive(Clone)]
pub struct RecommendationAssembler {
    market: MarketDataFetcher,
    narrator: Narrator,
}

impl RecommendationAssembler {
    pub fn new(market: MarketDataFetcher, narrator: Narrator) -> Self {
        Self { market, narrator }
    }

    /// Attach a live quote and narrative to a classified decision.
    ///
    /// A quote failure degrades to "N/A" prices plus a notice; a narrative
    /// failure fails this ticker only.
    pub async fn assemble(&self, ticker: &str, classified: Classified) -> TickerOutcome {
        let mut notices = Vec::new();
        let (current_price, percent_change) = match self.market.quote(ticker).await {
            Ok(q) => (
                PriceField::from(Some(q.current_price)),
                PriceField::from(Some(q.percent_change)),
            ),
            Err(e) => {
                warn!(ticker, error = %e, "quote unavailable");
                notices.push(stale_price_notice(ticker));
                (PriceField::NotAvailable, PriceField::NotAvailable)
            }
        };

        let row = classified.row;
        let input = AnalysisInput {
            ticker: ticker.to_string(),
            recommended_action: classified.action,
            action_value: classified.action_value,
            close_price: row.close,
            volume: row.volume,
            indicators: row.indicators,
            current_price,
            percent_change,
        };

        let result = match self.narrator.analysis(&input).await {
            Ok(narrative) => {
                info!(ticker, action = %classified.action, "recommendation assembled");
                Ok(Recommendation {
                    ticker: ticker.to_string(),
                    prediction_date: row.date,
                    recommendation: RecommendationBody {
                        action: classified.action,
                        action_value: classified.action_value,
                        summary: narrative.summary_text,
                        action_tags: narrative.action_tags,
                    },
                    analysis: AnalysisBody {
                        pros: narrative.pros,
                        cons: narrative.cons,
                    },
                    data: CardData {
                        close_price: row.close,
                        volume: row.volume,
                        technical_indicators: row.indicators,
                        current_price,
                        percent_change,
                    },
                })
            }
            Err(e) => {
                warn!(ticker, error = %e, "narrative failed");
                Err(e)
            }
        };

        TickerOutcome {
            ticker: ticker.to_string(),
            notices,
            result,
        }
    }
}
