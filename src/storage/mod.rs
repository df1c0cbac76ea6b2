//! Chat Table Abstraction
//!
//! Information Hiding:
//! - Storage backend implementation details hidden behind trait
//! - Allows swapping between memory, filesystem and SQLite without API changes
//! - Every backend failure surfaces as the one `StorageError` kind

use crate::config::{StorageBackend, StorageConfig};
use crate::core::chat::Timestamp;
use crate::core::serialization::SerializedChat;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

pub mod filesystem;
pub mod memory;
pub mod sqlite;

pub use filesystem::FileSystemTable;
pub use memory::MemoryTable;
pub use sqlite::SqliteTable;

/// Table-level operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOperation {
    ReadAll,
    Insert,
    Update,
    Delete,
    Clear,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadAll => "read_all",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Clear => "clear",
        };
        f.write_str(name)
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A storage operation failed. Sub-kinds (quota, corruption, access) are not
/// distinguished; the cause is kept as the error source.
#[derive(Debug, thiserror::Error)]
#[error("storage operation `{operation}` failed: {source}")]
pub struct StorageError {
    operation: StorageOperation,
    #[source]
    source: BoxError,
}

impl StorageError {
    pub fn new(operation: StorageOperation, source: impl Into<BoxError>) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }

    pub fn operation(&self) -> StorageOperation {
        self.operation
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Durable table of serialized chats keyed by `id`, indexed by `createdAt`
#[async_trait]
pub trait ChatTable: Send + Sync {
    /// All records in primary-key order
    async fn to_array(&self) -> StorageResult<Vec<SerializedChat>>;

    /// Insert a new record; fails if the key is already present
    async fn add(&self, chat: SerializedChat) -> StorageResult<()>;

    /// Replace the record stored under `id`.
    /// Returns `false` if there was no such record (nothing is written).
    async fn update(&self, id: &str, chat: SerializedChat) -> StorageResult<bool>;

    /// Delete the record stored under `id`; a missing key is not an error
    async fn delete(&self, id: &str) -> StorageResult<()>;

    /// Remove every record
    async fn clear(&self) -> StorageResult<()>;

    /// All records ordered by creation time, ties broken by id
    async fn to_array_by_created_at(&self) -> StorageResult<Vec<SerializedChat>> {
        let mut chats = self.to_array().await?;
        chats.sort_by(|a, b| {
            created_at_key(&a.created_at)
                .cmp(&created_at_key(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(chats)
    }

    async fn count(&self) -> StorageResult<usize> {
        Ok(self.to_array().await?.len())
    }
}

/// Unparseable timestamps order after every valid one.
fn created_at_key(raw: &str) -> (bool, Option<chrono::DateTime<chrono::Utc>>) {
    match Timestamp::parse_iso(raw) {
        Timestamp::Valid(value) => (false, Some(value)),
        Timestamp::Invalid(_) => (true, None),
    }
}

/// Open the backend selected in configuration
pub async fn open_table(config: &StorageConfig) -> anyhow::Result<Arc<dyn ChatTable>> {
    let table: Arc<dyn ChatTable> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryTable::new()),
        StorageBackend::Filesystem => Arc::new(FileSystemTable::new(config.path.clone()).await?),
        StorageBackend::Sqlite => {
            tokio::fs::create_dir_all(&config.path).await?;
            Arc::new(SqliteTable::open(config.path.join("chats.db")).await?)
        }
    };

    tracing::info!(
        "[Storage] Opened {:?} chat table at {:?}",
        config.backend,
        config.path
    );
    Ok(table)
}
