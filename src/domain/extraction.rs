//! Free text → tickers, lookback window, watchlist intent.
//!
//! All three go through the text-generation capability. Each returns a
//! typed error on transport failure or an unusable reply; the orchestrator
//! decides the fallback.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::domain::error::AdvisorError;
use crate::ports::text_port::{TextGenerator, TextRequest};

pub const DEFAULT_WINDOW_DAYS: u32 = 90;

static FIRST_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("literal pattern compiles"));

const TICKER_PROMPT: &str = "You are a financial expert AI. Your task is to identify all company \
names and stock tickers mentioned in the user's message and convert them to their official stock \
ticker symbol. Return a JSON object with a single key \"tickers\" which contains a list of the \
ticker symbols. For example, for the message \"show me apple and msft\", you should return \
{\"tickers\": [\"AAPL\", \"MSFT\"]}. If no tickers or company names are found, return an empty \
list in the JSON object: {\"tickers\": []}.";

const WINDOW_PROMPT: &str = "You are a financial assistant AI. Your task is to determine the time \
window in days that the user is referring to in their message. If the user asks for a prediction \
for the next N days, N weeks, N months, N years, or a timeframe (e.g., 'next week', 'next 3 \
months', '6 months outlook'), extract the number of days as an integer. If the user does not \
specify a timeframe, reply with 90. Your response should be a single integer (number of days) \
only, with no other text.";

const INTENT_PROMPT: &str = "You are a financial assistant AI. Your task is to determine if the \
user wants to analyze their stock watchlist. Respond with 'true' if they do, and 'false' if they \
don't. For example, if the user says 'analyze my watchlist', 'give me info on my watchlist', or \
'should I buy or sell the stocks in my watchlist?', you should respond with 'true'. If the user \
asks about a specific stock, even if it's on their watchlist, you should respond with 'false'.";

#[derive(Clone)]
pub struct Extractor {
    text: Arc<dyn TextGenerator>,
}

impl Extractor {
    pub fn new(text: Arc<dyn TextGenerator>) -> Self {
        Self { text }
    }

    /// Uppercased tickers in mention order, without repeats.
    pub async fn tickers(&self, message: &str) -> Result<Vec<String>, AdvisorError> {
        let reply = self
            .text
            .complete(&TextRequest::json(TICKER_PROMPT, message))
            .await
            .map_err(resolution)?;
        let tickers = parse_ticker_reply(&reply)?;
        debug!(?tickers, "extracted tickers");
        Ok(tickers)
    }

    /// First positive integer in the reply, as days.
    pub async fn window_days(&self, message: &str) -> Result<u32, AdvisorError> {
        let reply = self
            .text
            .complete(&TextRequest::text(WINDOW_PROMPT, message))
            .await
            .map_err(resolution)?;
        parse_window_reply(&reply)
    }

    pub async fn watchlist_intent(&self, message: &str) -> Result<bool, AdvisorError> {
        let reply = self
            .text
            .complete(&TextRequest::text(INTENT_PROMPT, message))
            .await
            .map_err(resolution)?;
        Ok(reply.trim().eq_ignore_ascii_case("true"))
    }
}

fn resolution(err: AdvisorError) -> AdvisorError {
    AdvisorError::ResolutionFailure {
        reason: err.to_string(),
    }
}

/// Accepts `{"tickers": [...]}` or a bare list; non-string entries are skipped.
pub fn parse_ticker_reply(reply: &str) -> Result<Vec<String>, AdvisorError> {
    let value = parse_json_reply(reply).ok_or_else(|| AdvisorError::ResolutionFailure {
        reason: "ticker reply is not JSON".to_string(),
    })?;
    let items: &[Value] = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("tickers") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    let mut seen = HashSet::new();
    Ok(items
        .iter()
        .filter_map(Value::as_str)
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect())
}

pub fn parse_window_reply(reply: &str) -> Result<u32, AdvisorError> {
    FIRST_INTEGER
        .find(reply)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|&days| days > 0)
        .ok_or_else(|| AdvisorError::ResolutionFailure {
            reason: format!("no positive day count in reply '{}'", reply.trim()),
        })
}

/// Parse a model reply as JSON, tolerating code fences and surrounding prose.
pub fn parse_json_reply(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(v) = serde_json::from_str(trimmed) {
        return Some(v);
    }

    if let Some(start) = trimmed.find("```") {
        let body = &trimmed[start + 3..];
        let body = body.strip_prefix("json").unwrap_or(body);
        if let Some(end) = body.find("```") {
            if let Ok(v) = serde_json::from_str(body[..end].trim()) {
                return Some(v);
            }
        }
    }

    let start = trimmed.find(['{', '['])?;
    let end = trimmed.rfind(['}', ']'])?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}
