//! Persistence ports for transcripts and watchlists.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::error::AdvisorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Sender::User),
            "bot" => Some(Sender::Bot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMessage {
    pub sender: Sender,
    /// Plain text for user turns, the serialised response payload for bot turns.
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create a conversation and return its id.
    async fn create_conversation(&self, user: &str, title: &str) -> Result<i64, AdvisorError>;

    async fn append_message(
        &self,
        conversation_id: i64,
        sender: Sender,
        body: &str,
    ) -> Result<(), AdvisorError>;

    async fn messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>, AdvisorError>;
}

#[async_trait]
pub trait WatchlistStore: Send + Sync {
    /// Add `ticker`; adding an existing member is a no-op.
    async fn add(&self, user: &str, ticker: &str) -> Result<(), AdvisorError>;

    /// Remove `ticker`; returns whether it was present.
    async fn remove(&self, user: &str, ticker: &str) -> Result<bool, AdvisorError>;

    /// Members in insertion order.
    async fn list(&self, user: &str) -> Result<Vec<String>, AdvisorError>;
}
