//! Conversation and watchlist flows through `ChatService`.

mod common;

use common::*;
use std::sync::Arc;
use tickerwise::adapters::memory_store::MemoryStore;
use tickerwise::domain::action::Action;
use tickerwise::domain::chat::{ChatRequest, ChatService};
use tickerwise::domain::narrative::EMPTY_WATCHLIST_MESSAGE;
use tickerwise::domain::watchlist::{analyze_watchlist, watchlist_entries};
use tickerwise::ports::store_port::{ConversationStore, Sender, WatchlistStore};

fn service(
    market: MockMarketData,
    text: ScriptedTextGenerator,
) -> (ChatService, Arc<MemoryStore>, Arc<FakePolicy>) {
    let policy = Arc::new(FakePolicy::new(DEFAULT_ACTIONS.to_vec()));
    let advisor = advisor_with(
        ready_engine(Arc::clone(&policy)),
        Arc::new(market),
        Arc::new(text),
    );
    let store = Arc::new(MemoryStore::new());
    let service = ChatService::new(Arc::new(advisor), store.clone(), store.clone());
    (service, store, policy)
}

#[tokio::test]
async fn new_conversation_is_titled_and_recorded() {
    let msg = "how is apple looking?";
    let (service, store, _) = service(
        MockMarketData::new().with_series(&["AAPL"]),
        ScriptedTextGenerator::new().with_tickers(msg, &["AAPL"]),
    );

    let reply = service
        .handle(ChatRequest {
            user: Some("alice".into()),
            message: msg.into(),
            ..Default::default()
        })
        .await;

    let id = reply.conversation_id.unwrap();
    assert_eq!(
        store.conversations().unwrap(),
        vec![("alice".to_string(), "Apple Stock Outlook".to_string())]
    );
    let messages = store.messages(id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::User);
    assert_eq!(messages[0].body, msg);
    assert_eq!(messages[1].sender, Sender::Bot);
    let recorded: serde_json::Value = serde_json::from_str(&messages[1].body).unwrap();
    assert_eq!(recorded["cards"][0]["ticker"], "AAPL");
    assert_eq!(reply.response.cards.len(), 1);
}

#[tokio::test]
async fn existing_conversation_is_appended() {
    let (service, store, _) = service(MockMarketData::new(), ScriptedTextGenerator::new());
    let id = store.create_conversation("alice", "Earlier chat").await.unwrap();

    let reply = service
        .handle(ChatRequest {
            user: Some("alice".into()),
            message: "hi again".into(),
            conversation_id: Some(id),
            ..Default::default()
        })
        .await;

    assert_eq!(reply.conversation_id, Some(id));
    assert_eq!(store.conversations().unwrap().len(), 1);
    assert_eq!(store.messages(id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn anonymous_request_records_nothing() {
    let (service, store, _) = service(MockMarketData::new(), ScriptedTextGenerator::new());

    let reply = service
        .handle(ChatRequest {
            message: "hello".into(),
            ..Default::default()
        })
        .await;

    assert!(reply.conversation_id.is_none());
    assert!(store.conversations().unwrap().is_empty());
    assert_eq!(reply.response.chat_messages, vec!["Summary of: hello".to_string()]);
}

#[tokio::test]
async fn watchlist_intent_routes_to_analysis() {
    let msg = "analyze my watchlist";
    let (service, store, policy) = service(
        MockMarketData::new().with_series(&["AAPL", "MSFT"]),
        ScriptedTextGenerator::new().with_watchlist_intent(msg),
    );
    store.add("alice", "AAPL").await.unwrap();
    store.add("alice", "MSFT").await.unwrap();
    store.add("alice", "TSLA").await.unwrap();

    let reply = service
        .handle(ChatRequest {
            user: Some("alice".into()),
            message: msg.into(),
            ..Default::default()
        })
        .await;

    let response = reply.response;
    assert!(response.is_advice);
    assert_eq!(response.cards.len(), 2);
    assert_eq!(response.chat_messages[0], "Your watchlist leans bullish.");
    assert_eq!(policy.calls(), 1);
    let id = reply.conversation_id.unwrap();
    assert_eq!(store.messages(id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_watchlist_gets_fixed_message() {
    let msg = "what should I do with my watchlist";
    let (service, _, policy) = service(
        MockMarketData::new(),
        ScriptedTextGenerator::new().with_watchlist_intent(msg),
    );

    let reply = service
        .handle(ChatRequest {
            user: Some("bob".into()),
            message: msg.into(),
            ..Default::default()
        })
        .await;

    assert_eq!(
        reply.response.chat_messages,
        vec![EMPTY_WATCHLIST_MESSAGE.to_string()]
    );
    assert_eq!(policy.calls(), 0);
}

#[tokio::test]
async fn watchlist_analysis_groups_by_action() {
    let policy = Arc::new(FakePolicy::new(DEFAULT_ACTIONS.to_vec()));
    let text = Arc::new(ScriptedTextGenerator::new());
    let advisor = advisor_with(
        ready_engine(Arc::clone(&policy)),
        Arc::new(
            MockMarketData::new()
                .with_series(&["AAPL", "MSFT", "GOOG"])
                .failing_history("AMZN"),
        ),
        Arc::clone(&text),
    );
    let tickers: Vec<String> = ["AAPL", "MSFT", "GOOG", "AMZN"]
        .iter()
        .map(|t| t.to_string())
        .collect();

    let response = analyze_watchlist(&advisor, &tickers).await;

    let actions: Vec<(String, Action)> = response
        .cards
        .iter()
        .map(|c| (c.ticker.clone(), c.recommendation.action))
        .collect();
    assert_eq!(
        actions,
        vec![
            ("AAPL".to_string(), Action::Buy),
            ("MSFT".to_string(), Action::Sell),
            ("GOOG".to_string(), Action::Hold),
        ]
    );
    assert_eq!(response.chat_messages[0], "Your watchlist leans bullish.");
    assert_eq!(
        response.chat_messages[1],
        "I couldn't retrieve a prediction for AMZN at this time."
    );
    let requests = text.requests.lock().unwrap();
    let summary = requests
        .iter()
        .find(|r| r.system.contains("summary for a watchlist analysis"))
        .unwrap();
    assert!(summary.user.contains(r#"Buy: ["AAPL"]"#));
    assert!(summary.user.contains(r#"Sell: ["MSFT"]"#));
    assert!(summary.user.contains(r#"Hold: ["GOOG"]"#));
}

#[tokio::test]
async fn watchlist_entries_report_quotes_and_errors() {
    let market = Arc::new(
        MockMarketData::new()
            .with_series(&["AAPL"])
            .failing_quote("MSFT"),
    );
    let advisor = advisor_with(
        ready_engine(Arc::new(FakePolicy::new(DEFAULT_ACTIONS.to_vec()))),
        market,
        Arc::new(ScriptedTextGenerator::new()),
    );

    let entries =
        watchlist_entries(advisor.market(), &["AAPL".to_string(), "MSFT".to_string()]).await;

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "AAPL Inc.");
    assert!(entries[0].quote.is_some());
    assert!(entries[1].quote.is_none());
    assert!(entries[1].error.is_some());
}
