//! Conversation handling around the orchestrator.
//!
//! Store failures are logged and never fail a reply.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, warn};

use crate::domain::pipeline::{Advisor, AdvisorResponse};
use crate::domain::watchlist::analyze_watchlist;
use crate::ports::store_port::{ConversationStore, Sender, WatchlistStore};

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub user: Option<String>,
    pub message: String,
    /// Continue an existing conversation; `None` starts a new one.
    pub conversation_id: Option<i64>,
    pub window_override: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub conversation_id: Option<i64>,
    pub response: AdvisorResponse,
}

#[derive(Clone)]
pub struct ChatService {
    advisor: Arc<Advisor>,
    conversations: Arc<dyn ConversationStore>,
    watchlists: Arc<dyn WatchlistStore>,
}

impl ChatService {
    pub fn new(
        advisor: Arc<Advisor>,
        conversations: Arc<dyn ConversationStore>,
        watchlists: Arc<dyn WatchlistStore>,
    ) -> Self {
        Self {
            advisor,
            conversations,
            watchlists,
        }
    }

    pub async fn handle(&self, request: ChatRequest) -> ChatReply {
        let mut conversation_id = request.conversation_id;
        if let (Some(user), None) = (&request.user, conversation_id) {
            let title = self.advisor.narrator().title(&request.message).await;
            match self.conversations.create_conversation(user, &title).await {
                Ok(id) => conversation_id = Some(id),
                Err(e) => error!(user = %user, error = %e, "could not create conversation"),
            }
        }

        if let Some(id) = conversation_id {
            self.record(id, Sender::User, &request.message).await;
        }

        let wants_watchlist = match self.advisor.extractor().watchlist_intent(&request.message).await {
            Ok(flag) => flag,
            Err(e) => {
                warn!(error = %e, "watchlist intent check failed");
                false
            }
        };

        let response = if wants_watchlist {
            let tickers = match &request.user {
                Some(user) => self.watchlists.list(user).await.unwrap_or_else(|e| {
                    error!(user = %user, error = %e, "could not read watchlist");
                    Vec::new()
                }),
                None => Vec::new(),
            };
            analyze_watchlist(&self.advisor, &tickers).await
        } else {
            self.advisor
                .run(&request.message, request.window_override)
                .await
        };

        if let Some(id) = conversation_id {
            match serde_json::to_string(&response) {
                Ok(body) => self.record(id, Sender::Bot, &body).await,
                Err(e) => error!(error = %e, "could not serialise response"),
            }
        }

        ChatReply {
            conversation_id,
            response,
        }
    }

    async fn record(&self, conversation_id: i64, sender: Sender, body: &str) {
        if let Err(e) = self
            .conversations
            .append_message(conversation_id, sender, body)
            .await
        {
            error!(conversation_id, sender = sender.as_str(), error = %e, "could not record message");
        }
    }
}
