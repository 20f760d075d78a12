//! Watchlist analysis and quote listing.

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::action::Action;
use crate::domain::market_data::MarketDataFetcher;
use crate::domain::narrative::EMPTY_WATCHLIST_MESSAGE;
use crate::domain::pipeline::{Advisor, AdvisorResponse, INFERENCE_UNAVAILABLE_MESSAGE};
use crate::domain::quote::Quote;

/// Run the policy over a user's watchlist and summarise the result.
///
/// Members outside the universe are skipped; per-ticker failures become
/// chat lines after the summary.
pub async fn analyze_watchlist(advisor: &Advisor, tickers: &[String]) -> AdvisorResponse {
    let mut response = AdvisorResponse {
        is_advice: true,
        ..Default::default()
    };
    if tickers.is_empty() {
        response.chat_messages.push(EMPTY_WATCHLIST_MESSAGE.to_string());
        return response;
    }

    let supported: Vec<String> = match advisor.engine().universe() {
        Some(universe) => universe.partition(tickers).0,
        None => {
            response
                .chat_messages
                .push(INFERENCE_UNAVAILABLE_MESSAGE.to_string());
            return response;
        }
    };

    let mut failures = Vec::new();
    match advisor.recommend(&supported, advisor.default_window()).await {
        Ok(outcomes) => {
            for outcome in outcomes {
                failures.extend(outcome.messages());
                if let Ok(card) = outcome.result {
                    response.cards.push(card);
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "watchlist inference failed");
            response
                .chat_messages
                .push(INFERENCE_UNAVAILABLE_MESSAGE.to_string());
            return response;
        }
    }

    let group = |action: Action| -> Vec<String> {
        response
            .cards
            .iter()
            .filter(|c| c.recommendation.action == action)
            .map(|c| c.ticker.clone())
            .collect()
    };
    let (buy, sell, hold) = (group(Action::Buy), group(Action::Sell), group(Action::Hold));
    info!(
        buy = buy.len(),
        sell = sell.len(),
        hold = hold.len(),
        "watchlist analysed"
    );

    let summary = advisor
        .narrator()
        .watchlist_summary(&buy, &sell, &hold)
        .await;
    response.chat_messages.push(summary);
    response.chat_messages.extend(failures);
    response
}

/// One watchlist member with its latest quote, or why there is none.
#[derive(Debug, Clone, Serialize)]
pub struct WatchlistEntry {
    pub ticker: String,
    pub name: String,
    pub quote: Option<Quote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn watchlist_entries(market: &MarketDataFetcher, tickers: &[String]) -> Vec<WatchlistEntry> {
    join_all(tickers.iter().map(|ticker| async move {
        let (quote, profile) = tokio::join!(market.quote(ticker), market.profile(ticker));
        let name = profile
            .ok()
            .map(|p| p.name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ticker.clone());
        match quote {
            Ok(q) => WatchlistEntry {
                ticker: ticker.clone(),
                name,
                quote: Some(q),
                error: None,
            },
            Err(e) => WatchlistEntry {
                ticker: ticker.clone(),
                name,
                quote: None,
                error: Some(e.to_string()),
            },
        }
    }))
    .await
}
