//! In-Memory Chat Table
//!
//! Information Hiding:
//! - BTreeMap storage structure hidden from users (gives primary-key order)
//! - Thread-safe access via RwLock hidden behind async interface
//! - Suitable for testing and ephemeral sessions

use super::{ChatTable, StorageError, StorageOperation, StorageResult};
use crate::core::serialization::SerializedChat;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory table keyed by chat id
/// Data is lost when process terminates
pub struct MemoryTable {
    chats: Arc<RwLock<BTreeMap<String, SerializedChat>>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self {
            chats: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTable for MemoryTable {
    async fn to_array(&self) -> StorageResult<Vec<SerializedChat>> {
        let chats = self.chats.read().await;
        let records: Vec<SerializedChat> = chats.values().cloned().collect();
        tracing::debug!("[MemoryTable] Read {} chats", records.len());
        Ok(records)
    }

    async fn add(&self, chat: SerializedChat) -> StorageResult<()> {
        let mut chats = self.chats.write().await;
        if chats.contains_key(&chat.id) {
            return Err(StorageError::new(
                StorageOperation::Insert,
                format!("key '{}' already exists", chat.id),
            ));
        }
        tracing::debug!("[MemoryTable] Inserted chat '{}'", chat.id);
        chats.insert(chat.id.clone(), chat);
        Ok(())
    }

    async fn update(&self, id: &str, chat: SerializedChat) -> StorageResult<bool> {
        let mut chats = self.chats.write().await;
        match chats.get_mut(id) {
            Some(existing) => {
                *existing = chat;
                tracing::debug!("[MemoryTable] Replaced chat '{}'", id);
                Ok(true)
            }
            None => {
                tracing::debug!("[MemoryTable] Chat '{}' does not exist, nothing to update", id);
                Ok(false)
            }
        }
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let mut chats = self.chats.write().await;
        chats.remove(id);
        tracing::debug!("[MemoryTable] Deleted chat '{}'", id);
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        let mut chats = self.chats.write().await;
        chats.clear();
        tracing::debug!("[MemoryTable] Cleared all chats");
        Ok(())
    }

    async fn count(&self) -> StorageResult<usize> {
        Ok(self.chats.read().await.len())
    }
}
