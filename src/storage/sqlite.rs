//! SQLite Chat Table
//!
//! Information Hiding:
//! - Schema and SQL hidden from users
//! - Blocking rusqlite calls moved off the async runtime via spawn_blocking
//! - Records kept as JSON documents, with `id` lifted into the primary key and
//!   the parsed creation instant into an indexed millisecond column

use super::{ChatTable, StorageError, StorageOperation, StorageResult};
use crate::core::chat::Timestamp;
use crate::core::serialization::SerializedChat;
use anyhow::Context;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chats (
        id TEXT PRIMARY KEY,
        created_ms INTEGER,
        record TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chats_created_ms ON chats(created_ms);
"#;

/// Milliseconds since the epoch, or NULL when `createdAt` does not parse
fn created_ms(created_at: &str) -> Option<i64> {
    Timestamp::parse_iso(created_at)
        .as_datetime()
        .map(|value| value.timestamp_millis())
}

pub struct SqliteTable {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTable {
    /// Open (or create) the database file at `path`
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = tokio::task::spawn_blocking(move || Connection::open(&path))
            .await
            .context("SQLite open task panicked")?
            .context("Failed to open chat database")?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, mainly for tests
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize chat schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, operation: StorageOperation, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, Box<dyn std::error::Error + Send + Sync>>
            + Send
            + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StorageError::new(operation, "connection mutex poisoned"))?;
            f(&mut guard).map_err(|e| StorageError::new(operation, e))
        })
        .await
        .map_err(|e| StorageError::new(operation, e))?
    }
}

fn read_records(
    conn: &Connection,
    sql: &str,
) -> Result<Vec<SerializedChat>, Box<dyn std::error::Error + Send + Sync>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut chats = Vec::new();
    for row in rows {
        let chat: SerializedChat = serde_json::from_str(&row?)?;
        chats.push(chat);
    }
    Ok(chats)
}

#[async_trait]
impl ChatTable for SqliteTable {
    async fn to_array(&self) -> StorageResult<Vec<SerializedChat>> {
        let chats = self
            .with_conn(StorageOperation::ReadAll, |conn| {
                read_records(conn, "SELECT record FROM chats ORDER BY id")
            })
            .await?;
        tracing::debug!("[SqliteTable] Read {} chats", chats.len());
        Ok(chats)
    }

    async fn to_array_by_created_at(&self) -> StorageResult<Vec<SerializedChat>> {
        self.with_conn(StorageOperation::ReadAll, |conn| {
            read_records(
                conn,
                "SELECT record FROM chats ORDER BY created_ms IS NULL, created_ms, id",
            )
        })
        .await
    }

    async fn add(&self, chat: SerializedChat) -> StorageResult<()> {
        let id = chat.id.clone();
        self.with_conn(StorageOperation::Insert, move |conn| {
            let record = serde_json::to_string(&chat)?;
            conn.execute(
                "INSERT INTO chats (id, created_ms, record) VALUES (?1, ?2, ?3)",
                params![chat.id, created_ms(&chat.created_at), record],
            )?;
            Ok(())
        })
        .await?;
        tracing::debug!("[SqliteTable] Inserted chat '{}'", id);
        Ok(())
    }

    async fn update(&self, id: &str, mut chat: SerializedChat) -> StorageResult<bool> {
        let id = id.to_string();
        chat.id = id.clone();
        let replaced = self
            .with_conn(StorageOperation::Update, move |conn| {
                let record = serde_json::to_string(&chat)?;
                let changed = conn.execute(
                    "UPDATE chats SET created_ms = ?2, record = ?3 WHERE id = ?1",
                    params![chat.id, created_ms(&chat.created_at), record],
                )?;
                Ok(changed > 0)
            })
            .await?;
        tracing::debug!("[SqliteTable] Update of chat '{}' replaced={}", id, replaced);
        Ok(replaced)
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let id = id.to_string();
        let key = id.clone();
        self.with_conn(StorageOperation::Delete, move |conn| {
            conn.execute("DELETE FROM chats WHERE id = ?1", params![key])?;
            Ok(())
        })
        .await?;
        tracing::debug!("[SqliteTable] Deleted chat '{}'", id);
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        let removed = self
            .with_conn(StorageOperation::Clear, |conn| {
                Ok(conn.execute("DELETE FROM chats", [])?)
            })
            .await?;
        tracing::debug!("[SqliteTable] Cleared {} chats", removed);
        Ok(())
    }

    async fn count(&self) -> StorageResult<usize> {
        self.with_conn(StorageOperation::ReadAll, |conn| {
            let count: Option<i64> = conn
                .query_row("SELECT COUNT(*) FROM chats", [], |row| row.get(0))
                .optional()?;
            Ok(count.unwrap_or(0) as usize)
        })
        .await
    }
}
