//! File System Chat Table
//!
//! Information Hiding:
//! - File paths and JSON serialization format hidden from users
//! - Directory structure management hidden behind interface
//! - Persistence mechanism independent of table trait users

use super::{ChatTable, StorageError, StorageOperation, StorageResult};
use crate::core::serialization::SerializedChat;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// File system table - each chat is a JSON file
/// Files are stored as {base_path}/{chat_id}.json
pub struct FileSystemTable {
    base_path: PathBuf,
}

impl FileSystemTable {
    pub async fn new(base_path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_path)
            .await
            .context("Failed to create storage directory")?;

        Ok(Self { base_path })
    }

    fn chat_path(&self, operation: StorageOperation, id: &str) -> StorageResult<PathBuf> {
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(StorageError::new(
                operation,
                format!("'{}' is not a valid chat id", id),
            ));
        }
        Ok(self.base_path.join(format!("{}.json", id)))
    }

    async fn write_record(&self, operation: StorageOperation, chat: &SerializedChat) -> StorageResult<()> {
        let path = self.chat_path(operation, &chat.id)?;
        let json = serde_json::to_string_pretty(chat)
            .map_err(|e| StorageError::new(operation, e))?;

        fs::write(&path, json)
            .await
            .map_err(|e| StorageError::new(operation, e))?;

        tracing::debug!(
            "[FileSystemTable] Wrote chat '{}' ({} messages) to {:?}",
            chat.id,
            chat.messages.len(),
            path
        );
        Ok(())
    }

    async fn json_files(&self, operation: StorageOperation) -> StorageResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.base_path)
            .await
            .map_err(|e| StorageError::new(operation, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::new(operation, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl ChatTable for FileSystemTable {
    async fn to_array(&self) -> StorageResult<Vec<SerializedChat>> {
        let op = StorageOperation::ReadAll;
        let mut chats = Vec::new();

        for path in self.json_files(op).await? {
            let json = fs::read_to_string(&path)
                .await
                .map_err(|e| StorageError::new(op, e))?;
            let chat: SerializedChat =
                serde_json::from_str(&json).map_err(|e| StorageError::new(op, e))?;
            chats.push(chat);
        }

        // File names are ids, so sorted paths already give key order.
        tracing::debug!(
            "[FileSystemTable] Read {} chats from {:?}",
            chats.len(),
            self.base_path
        );
        Ok(chats)
    }

    async fn add(&self, chat: SerializedChat) -> StorageResult<()> {
        let op = StorageOperation::Insert;
        let path = self.chat_path(op, &chat.id)?;
        if fs::try_exists(&path).await.map_err(|e| StorageError::new(op, e))? {
            return Err(StorageError::new(
                op,
                format!("key '{}' already exists", chat.id),
            ));
        }
        self.write_record(op, &chat).await
    }

    async fn update(&self, id: &str, mut chat: SerializedChat) -> StorageResult<bool> {
        let op = StorageOperation::Update;
        let path = self.chat_path(op, id)?;
        if !fs::try_exists(&path).await.map_err(|e| StorageError::new(op, e))? {
            tracing::debug!("[FileSystemTable] Chat '{}' does not exist, nothing to update", id);
            return Ok(false);
        }
        // The key is fixed by the path; the record cannot move to another id.
        chat.id = id.to_string();
        self.write_record(op, &chat).await?;
        Ok(true)
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let op = StorageOperation::Delete;
        let path = self.chat_path(op, id)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("[FileSystemTable] Deleted chat '{}' at {:?}", id, path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("[FileSystemTable] Chat '{}' does not exist, nothing to delete", id);
                Ok(())
            }
            Err(e) => Err(StorageError::new(op, e)),
        }
    }

    async fn clear(&self) -> StorageResult<()> {
        let op = StorageOperation::Clear;
        let files = self.json_files(op).await?;
        let removed = files.len();

        for path in files {
            fs::remove_file(&path)
                .await
                .map_err(|e| StorageError::new(op, e))?;
        }

        tracing::debug!("[FileSystemTable] Cleared {} chats", removed);
        Ok(())
    }
}
