//! Narrative text requested from the text-generation capability.
//!
//! Only [`Narrator::analysis`] can fail; the other helpers always return
//! displayable text and log when they fall back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::domain::action::Action;
use crate::domain::error::AdvisorError;
use crate::domain::extraction::parse_json_reply;
use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::quote::PriceField;
use crate::ports::text_port::{TextGenerator, TextRequest};

pub const EMPTY_WATCHLIST_MESSAGE: &str =
    "There are no new recommendations for your watchlist at this time.";
const WATCHLIST_FALLBACK: &str = "Could not generate a summary for your watchlist.";
const SUMMARY_FALLBACK: &str = "I had trouble generating a summary.";
const TITLE_MAX_WORDS: usize = 5;
const TITLE_FALLBACK_CHARS: usize = 50;

const ANALYSIS_PROMPT: &str = r#"You are an expert financial analyst AI. Your task is to interpret the provided model data and generate a comprehensive, structured financial analysis.

The user will provide a JSON object containing the model's prediction and key metrics for a specific stock. This includes:
- `recommended_action`: The action suggested by the model (BUY, SELL, HOLD).
- `action_value`: A raw numerical value from the model. Positive values lean towards buying, negative towards selling.
- `key_metrics`: Technical indicators like MACD, RSI, CCI, etc.

Your response MUST be a single, clean JSON object with the following structure:
{
  "summary_text": "A concise, easy-to-understand summary of the recommendation.",
  "action_tags": ["BULLISH" | "BEARISH" | "NEUTRAL", "SHORT-TERM" | "LONG-TERM", "HIGH-RISK" | "MODERATE-RISK" | "LOW-RISK"],
  "pros": ["Reasons supporting the recommendation, one string each."],
  "cons": ["Negative aspects or potential risks, one string each."]
}

Analyze all the provided data. Use the technical indicators to build the `pros` and `cons` lists. The reasoning should be sound and directly related to the data provided."#;

const SUMMARY_PROMPT: &str = "You are a helpful financial bot. Summarize the provided information \
concisely and conversationally in one or two sentences.";

const TITLE_PROMPT: &str = "You are a title generation AI. Your task is to create a short, concise \
but descriptive title (up to 5 words) for a new chat conversation based on the user's first \
message. The title should capture the main topic of the conversation. No need for bold text output";

const WATCHLIST_PROMPT: &str = r#"You are an expert financial analyst AI. Your task is to provide a summary for a watchlist analysis.

Your response MUST be a single, clean JSON object with the following structure, and ONLY this JSON object:
{
  "summary_text": "A concise, easy-to-understand summary of the recommendations for the entire watchlist."
}

Analyze the provided ticker lists to formulate your analysis. The reasoning should be sound and directly related to the data."#;

/// The structured justification attached to a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub summary_text: String,
    pub action_tags: Vec<String>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// What the analysis prompt is given about one ticker.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisInput {
    pub ticker: String,
    pub recommended_action: Action,
    pub action_value: f64,
    pub close_price: f64,
    pub volume: i64,
    pub indicators: IndicatorSnapshot,
    pub current_price: PriceField,
    pub percent_change: PriceField,
}

impl AnalysisInput {
    fn to_prompt_json(&self) -> Value {
        let mut metrics = serde_json::to_value(self.indicators).unwrap_or_else(|_| json!({}));
        if let Value::Object(map) = &mut metrics {
            map.insert("close_price".into(), json!(self.close_price));
            map.insert("volume".into(), json!(self.volume));
            map.insert(
                "current_price".into(),
                serde_json::to_value(self.current_price).unwrap_or(Value::Null),
            );
            map.insert(
                "percent_change".into(),
                serde_json::to_value(self.percent_change).unwrap_or(Value::Null),
            );
        }
        json!({
            "ticker": self.ticker,
            "recommended_action": self.recommended_action,
            "action_value": self.action_value,
            "key_metrics": metrics,
        })
    }
}

#[derive(Clone)]
pub struct Narrator {
    text: Arc<dyn TextGenerator>,
}

impl Narrator {
    pub fn new(text: Arc<dyn TextGenerator>) -> Self {
        Self { text }
    }

    /// Summary, tags, pros and cons for one recommendation.
    pub async fn analysis(&self, input: &AnalysisInput) -> Result<Narrative, AdvisorError> {
        let pretty = serde_json::to_string_pretty(&input.to_prompt_json())
            .map_err(|e| AdvisorError::narrative_malformed(&input.ticker, e.to_string()))?;
        let user = format!(
            "Here is the model data for analysis:\n{}\n\nPlease generate the structured financial analysis in the specified JSON format.",
            pretty
        );
        let reply = self
            .text
            .complete(&TextRequest::json(ANALYSIS_PROMPT, user))
            .await
            .map_err(|e| AdvisorError::narrative_malformed(&input.ticker, e.to_string()))?;
        parse_narrative(&input.ticker, &reply)
    }

    /// One or two conversational sentences about `prompt`.
    pub async fn summary(&self, prompt: &str) -> String {
        match self
            .text
            .complete(&TextRequest::text(SUMMARY_PROMPT, prompt))
            .await
        {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                warn!("empty summary reply");
                SUMMARY_FALLBACK.to_string()
            }
            Err(e) => {
                warn!(error = %e, "summary generation failed");
                SUMMARY_FALLBACK.to_string()
            }
        }
    }

    /// Overview for a ticker the policy does not cover.
    pub async fn company_overview(&self, ticker: &str) -> String {
        self.summary(&format!(
            "Please provide a brief, general overview of the company with the stock ticker {}. \
             I cannot provide a detailed model analysis for it. Keep the summary concise and conversational.",
            ticker
        ))
        .await
    }

    /// Up to five words naming a conversation.
    pub async fn title(&self, message: &str) -> String {
        match self
            .text
            .complete(&TextRequest::text(TITLE_PROMPT, message))
            .await
        {
            Ok(reply) => clean_title(&reply).unwrap_or_else(|| fallback_title(message)),
            Err(e) => {
                warn!(error = %e, "title generation failed");
                fallback_title(message)
            }
        }
    }

    pub async fn watchlist_summary(&self, buy: &[String], sell: &[String], hold: &[String]) -> String {
        if buy.is_empty() && sell.is_empty() && hold.is_empty() {
            return EMPTY_WATCHLIST_MESSAGE.to_string();
        }
        let user = format!(
            "Here are the watchlist analysis results:\n- Buy: {:?}\n- Sell: {:?}\n- Hold: {:?}\n\nPlease generate the structured financial analysis in the specified JSON format.",
            buy, sell, hold
        );
        let reply = match self
            .text
            .complete(&TextRequest::json(WATCHLIST_PROMPT, user))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "watchlist summary failed");
                return WATCHLIST_FALLBACK.to_string();
            }
        };
        parse_json_reply(&reply)
            .and_then(|v| v.get("summary_text").and_then(Value::as_str).map(str::to_string))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| WATCHLIST_FALLBACK.to_string())
    }
}

/// Validate a structured narrative reply; every key is required.
pub fn parse_narrative(ticker: &str, reply: &str) -> Result<Narrative, AdvisorError> {
    let value = parse_json_reply(reply)
        .ok_or_else(|| AdvisorError::narrative_malformed(ticker, "reply is not JSON"))?;
    for key in ["summary_text", "action_tags", "pros", "cons"] {
        if value.get(key).is_none() {
            return Err(AdvisorError::narrative_malformed(
                ticker,
                format!("missing key '{}'", key),
            ));
        }
    }
    serde_json::from_value(value).map_err(|e| AdvisorError::narrative_malformed(ticker, e.to_string()))
}

fn clean_title(reply: &str) -> Option<String> {
    let words: Vec<&str> = reply
        .trim()
        .trim_matches(|c| c == '"' || c == '*' || c == '#')
        .split_whitespace()
        .take(TITLE_MAX_WORDS)
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn fallback_title(message: &str) -> String {
    message.chars().take(TITLE_FALLBACK_CHARS).collect()
}
