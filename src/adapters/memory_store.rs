//! Process-local conversation and watchlist store.
//!
//! Used when the `sqlite` feature is disabled and as a test double.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::error::AdvisorError;
use crate::ports::store_port::{ConversationStore, Sender, StoredMessage, WatchlistStore};

#[derive(Debug, Default)]
struct Inner {
    titles: Vec<(String, String)>,
    messages: HashMap<i64, Vec<StoredMessage>>,
    watchlists: HashMap<String, Vec<String>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, AdvisorError> {
        self.inner.lock().map_err(|e| AdvisorError::Store {
            reason: e.to_string(),
        })
    }

    /// `(user, title)` for each conversation, in creation order.
    pub fn conversations(&self) -> Result<Vec<(String, String)>, AdvisorError> {
        Ok(self.lock()?.titles.clone())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_conversation(&self, user: &str, title: &str) -> Result<i64, AdvisorError> {
        let mut inner = self.lock()?;
        inner.titles.push((user.to_string(), title.to_string()));
        let id = inner.titles.len() as i64;
        inner.messages.insert(id, Vec::new());
        Ok(id)
    }

    async fn append_message(
        &self,
        conversation_id: i64,
        sender: Sender,
        body: &str,
    ) -> Result<(), AdvisorError> {
        let mut inner = self.lock()?;
        let messages = inner
            .messages
            .get_mut(&conversation_id)
            .ok_or_else(|| AdvisorError::Store {
                reason: format!("no conversation {}", conversation_id),
            })?;
        messages.push(StoredMessage {
            sender,
            body: body.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>, AdvisorError> {
        Ok(self
            .lock()?
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl WatchlistStore for MemoryStore {
    async fn add(&self, user: &str, ticker: &str) -> Result<(), AdvisorError> {
        let ticker = ticker.to_uppercase();
        let mut inner = self.lock()?;
        let list = inner.watchlists.entry(user.to_string()).or_default();
        if !list.contains(&ticker) {
            list.push(ticker);
        }
        Ok(())
    }

    async fn remove(&self, user: &str, ticker: &str) -> Result<bool, AdvisorError> {
        let ticker = ticker.to_uppercase();
        let mut inner = self.lock()?;
        let Some(list) = inner.watchlists.get_mut(user) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|t| *t != ticker);
        Ok(list.len() != before)
    }

    async fn list(&self, user: &str) -> Result<Vec<String>, AdvisorError> {
        Ok(self
            .lock()?
            .watchlists
            .get(user)
            .cloned()
            .unwrap_or_default())
    }
}
