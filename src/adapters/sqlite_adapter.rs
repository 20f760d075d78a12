//! SQLite persistence for conversations and watchlists.
//!
//! rusqlite is blocking, so every call checks a connection out of the r2d2
//! pool inside `spawn_blocking`.

use crate::domain::error::AdvisorError;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::{ConversationStore, Sender, StoredMessage, WatchlistStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS conversations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user TEXT NOT NULL,
        title TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        conversation_id INTEGER NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
        sender TEXT NOT NULL,
        body TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id);
    CREATE TABLE IF NOT EXISTS watchlist (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user TEXT NOT NULL,
        ticker TEXT NOT NULL,
        UNIQUE (user, ticker)
    );";

fn store_err(e: impl std::fmt::Display) -> AdvisorError {
    AdvisorError::Store {
        reason: e.to_string(),
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AdvisorError> {
        let db_path = config
            .get_string("sqlite", "path")
            .ok_or_else(|| AdvisorError::ConfigMissing {
                section: "sqlite".into(),
                key: "path".into(),
            })?;
        let pool_size = config.get_int(
            "sqlite",
            "pool_size",
            crate::domain::config_validation::DEFAULT_SQLITE_POOL_SIZE,
        ) as u32;
        Self::build(SqliteConnectionManager::file(&db_path), pool_size)
    }

    /// A single-connection pool, so every checkout sees the same database.
    pub fn in_memory() -> Result<Self, AdvisorError> {
        Self::build(SqliteConnectionManager::memory(), 1)
    }

    fn build(manager: SqliteConnectionManager, pool_size: u32) -> Result<Self, AdvisorError> {
        let manager = manager.with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(store_err)?;
        let conn = pool.get().map_err(store_err)?;
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        Ok(Self { pool })
    }

    async fn run<T, F>(&self, f: F) -> Result<T, AdvisorError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, AdvisorError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get().map_err(store_err)?;
            f(&*conn)
        })
        .await
        .map_err(store_err)?
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn create_conversation(&self, user: &str, title: &str) -> Result<i64, AdvisorError> {
        let (user, title) = (user.to_string(), title.to_string());
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO conversations (user, title, created_at) VALUES (?1, ?2, ?3)",
                params![user, title, Utc::now().to_rfc3339()],
            )
            .map_err(store_err)?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn append_message(
        &self,
        conversation_id: i64,
        sender: Sender,
        body: &str,
    ) -> Result<(), AdvisorError> {
        let body = body.to_string();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO messages (conversation_id, sender, body, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![conversation_id, sender.as_str(), body, Utc::now().to_rfc3339()],
            )
            .map_err(store_err)?;
            Ok(())
        })
        .await
    }

    async fn messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>, AdvisorError> {
        self.run(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT sender, body, created_at FROM messages
                     WHERE conversation_id = ?1 ORDER BY id ASC",
                )
                .map_err(store_err)?;
            let rows = stmt
                .query_map(params![conversation_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(store_err)?;

            let mut messages = Vec::new();
            for row in rows {
                let (sender, body, created_at) = row.map_err(store_err)?;
                let sender = Sender::parse(&sender)
                    .ok_or_else(|| store_err(format!("unknown sender '{}'", sender)))?;
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map_err(store_err)?
                    .with_timezone(&Utc);
                messages.push(StoredMessage {
                    sender,
                    body,
                    created_at,
                });
            }
            Ok(messages)
        })
        .await
    }
}

#[async_trait]
impl WatchlistStore for SqliteStore {
    async fn add(&self, user: &str, ticker: &str) -> Result<(), AdvisorError> {
        let (user, ticker) = (user.to_string(), ticker.to_uppercase());
        self.run(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO watchlist (user, ticker) VALUES (?1, ?2)",
                params![user, ticker],
            )
            .map_err(store_err)?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, user: &str, ticker: &str) -> Result<bool, AdvisorError> {
        let (user, ticker) = (user.to_string(), ticker.to_uppercase());
        self.run(move |conn| {
            let removed = conn
                .execute(
                    "DELETE FROM watchlist WHERE user = ?1 AND ticker = ?2",
                    params![user, ticker],
                )
                .map_err(store_err)?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list(&self, user: &str) -> Result<Vec<String>, AdvisorError> {
        let user = user.to_string();
        self.run(move |conn| {
            let mut stmt = conn
                .prepare("SELECT ticker FROM watchlist WHERE user = ?1 ORDER BY id ASC")
                .map_err(store_err)?;
            let rows = stmt
                .query_map(params![user], |row| row.get::<_, String>(0))
                .map_err(store_err)?;
            let tickers = rows.collect::<Result<Vec<_>, _>>().map_err(store_err)?;
            Ok(tickers)
        })
        .await
    }
}

impl SqliteStore {
    /// Title of a conversation, if it exists.
    pub async fn conversation_title(&self, conversation_id: i64) -> Result<Option<String>, AdvisorError> {
        self.run(move |conn| {
            conn.query_row(
                "SELECT title FROM conversations WHERE id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)
        })
        .await
    }
}
