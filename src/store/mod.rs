//! Conversation Store
//!
//! Information Hiding:
//! - Ordering of in-memory vs. durable mutation decided per operation here
//! - Serialization to the table representation hidden from callers
//! - State changes published as snapshots over a watch channel
//!
//! Operations take `&mut self`, so two operations on one store never overlap.
//! A failed durable write is logged, recorded as a localized message in
//! `error()`, and returned; in-memory changes made before the write are not
//! rolled back. `load_chats` resynchronizes memory from the table.

use crate::config::{ChatDefaults, Settings};
use crate::core::chat::{Chat, ChatUpdate, Message};
use crate::core::serialization::{deserialize_chat, serialize_chat, SerializedChat};
use crate::locale::{Locale, StoreOperation};
use crate::storage::{ChatTable, StorageError, StorageResult};
use std::sync::Arc;
use tokio::sync::watch;

mod snapshot;

pub use snapshot::StoreSnapshot;

pub struct ChatStore {
    table: Arc<dyn ChatTable>,
    defaults: ChatDefaults,
    locale: Locale,
    chats: Vec<Arc<Chat>>,
    current_chat_id: Option<String>,
    is_loading: bool,
    error: Option<String>,
    updates: watch::Sender<StoreSnapshot>,
}

impl ChatStore {
    pub fn new(table: Arc<dyn ChatTable>, defaults: ChatDefaults, locale: Locale) -> Self {
        let (updates, _) = watch::channel(StoreSnapshot::default());
        Self {
            table,
            defaults,
            locale,
            chats: Vec::new(),
            current_chat_id: None,
            is_loading: false,
            error: None,
            updates,
        }
    }

    pub fn from_settings(table: Arc<dyn ChatTable>, settings: &Settings) -> Self {
        Self::new(table, settings.chat.clone(), settings.locale)
    }

    // ---- read surface ----

    pub fn chats(&self) -> &[Arc<Chat>] {
        &self.chats
    }

    pub fn chat(&self, chat_id: &str) -> Option<&Chat> {
        self.chats
            .iter()
            .find(|chat| chat.id == chat_id)
            .map(|chat| chat.as_ref())
    }

    pub fn current_chat_id(&self) -> Option<&str> {
        self.current_chat_id.as_deref()
    }

    pub fn current_chat(&self) -> Option<&Chat> {
        self.current_chat_id
            .as_deref()
            .and_then(|id| self.chat(id))
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Last recorded failure message; stays set until `clear_error`
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        if self.error.take().is_some() {
            self.publish();
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Select an existing chat; returns `false` if no chat has this id
    pub fn set_current_chat(&mut self, chat_id: &str) -> bool {
        if self.position(chat_id).is_none() {
            return false;
        }
        self.current_chat_id = Some(chat_id.to_string());
        self.publish();
        true
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            chats: self.chats.clone(),
            current_chat_id: self.current_chat_id.clone(),
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.updates.subscribe()
    }

    // ---- operations ----

    /// Replace the in-memory list with the table contents.
    ///
    /// Failures are recorded in `error()` rather than returned; the list may
    /// be left empty.
    pub async fn load_chats(&mut self) {
        self.is_loading = true;
        self.publish();

        match self.table.to_array().await {
            Ok(records) => {
                self.chats = records
                    .iter()
                    .map(|record| Arc::new(deserialize_chat(record)))
                    .collect();
                tracing::info!("[ChatStore] Loaded {} chats", self.chats.len());

                if self.chats.is_empty() {
                    if let Err(err) = self.create_new_chat().await {
                        self.record_failure(StoreOperation::LoadChats, &err);
                    }
                } else {
                    self.current_chat_id = Some(self.chats[0].id.clone());
                }
            }
            Err(err) => self.record_failure(StoreOperation::LoadChats, &err),
        }

        self.is_loading = false;
        self.publish();
    }

    /// Create a chat with the default title, greeting, model and temperature.
    /// The table write happens first; on failure memory is left untouched.
    pub async fn create_new_chat(&mut self) -> StorageResult<Chat> {
        let title = self
            .defaults
            .title
            .as_deref()
            .unwrap_or_else(|| self.locale.new_chat_title());
        let greeting = self
            .defaults
            .greeting
            .as_deref()
            .unwrap_or_else(|| self.locale.greeting());
        let chat = Chat::new(
            title,
            greeting,
            self.defaults.model.as_str(),
            self.defaults.temperature,
        );

        if let Err(err) = self.table.add(serialize_chat(&chat)).await {
            self.record_failure(StoreOperation::CreateChat, &err);
            return Err(err);
        }

        self.chats.insert(0, Arc::new(chat.clone()));
        self.current_chat_id = Some(chat.id.clone());
        tracing::info!("[ChatStore] Created chat '{}'", chat.id);
        self.publish();
        Ok(chat)
    }

    /// Remove a chat from memory, then from the table.
    ///
    /// If it was current, the first remaining chat becomes current, or a new
    /// chat is created when none remain. Unknown ids are ignored.
    pub async fn delete_chat(&mut self, chat_id: &str) -> StorageResult<()> {
        let Some(index) = self.position(chat_id) else {
            tracing::debug!("[ChatStore] Chat '{}' not found, nothing to delete", chat_id);
            return Ok(());
        };

        self.chats.remove(index);
        let was_current = self.current_chat_id.as_deref() == Some(chat_id);
        if was_current {
            self.current_chat_id = self.chats.first().map(|chat| chat.id.clone());
        }
        self.publish();

        if let Err(err) = self.table.delete(chat_id).await {
            self.record_failure(StoreOperation::DeleteChat, &err);
            return Err(err);
        }
        tracing::info!("[ChatStore] Deleted chat '{}'", chat_id);

        if was_current && self.current_chat_id.is_none() {
            if let Err(err) = self.create_new_chat().await {
                self.record_failure(StoreOperation::DeleteChat, &err);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Merge `update` into a chat. The merged record is written first and
    /// memory is only updated once the write succeeds. Unknown ids are ignored.
    pub async fn update_chat(&mut self, chat_id: &str, update: ChatUpdate) -> StorageResult<()> {
        let Some(index) = self.position(chat_id) else {
            tracing::debug!("[ChatStore] Chat '{}' not found, nothing to update", chat_id);
            return Ok(());
        };

        let mut merged = Chat::clone(&self.chats[index]);
        merged.apply(&update);

        self.write_back(chat_id, serialize_chat(&merged), StoreOperation::UpdateChat)
            .await?;

        self.chats[index] = Arc::new(merged);
        self.publish();
        Ok(())
    }

    /// Append a message in memory, then write the whole chat back
    pub async fn add_message(&mut self, chat_id: &str, message: Message) -> StorageResult<()> {
        let Some(index) = self.position(chat_id) else {
            tracing::debug!("[ChatStore] Chat '{}' not found, message dropped", chat_id);
            return Ok(());
        };

        let chat = Arc::make_mut(&mut self.chats[index]);
        chat.messages.push(message);
        let record = serialize_chat(chat);
        self.publish();

        self.write_back(chat_id, record, StoreOperation::AddMessage).await
    }

    /// Replace the content of the last message when its role matches.
    ///
    /// Used for streaming into the latest assistant reply. No-op when the
    /// chat is unknown, has no messages, or the last role differs.
    pub async fn update_message(&mut self, chat_id: &str, message: Message) -> StorageResult<()> {
        let Some(index) = self.position(chat_id) else {
            return Ok(());
        };

        let matches = self.chats[index]
            .last_message()
            .is_some_and(|last| last.role == message.role);
        if !matches {
            tracing::debug!(
                "[ChatStore] Last message of chat '{}' is not from {}, skipping update",
                chat_id,
                message.role
            );
            return Ok(());
        }

        let chat = Arc::make_mut(&mut self.chats[index]);
        if let Some(last) = chat.messages.last_mut() {
            last.content = message.content;
        }
        let record = serialize_chat(chat);
        self.publish();

        self.write_back(chat_id, record, StoreOperation::UpdateMessage).await
    }

    /// Drop every chat from memory and the table, then start a fresh one
    pub async fn clear_chats(&mut self) -> StorageResult<()> {
        self.chats.clear();
        self.current_chat_id = None;
        self.publish();

        if let Err(err) = self.table.clear().await {
            self.record_failure(StoreOperation::ClearChats, &err);
            return Err(err);
        }
        tracing::info!("[ChatStore] Cleared all chats");

        if let Err(err) = self.create_new_chat().await {
            self.record_failure(StoreOperation::ClearChats, &err);
            return Err(err);
        }
        Ok(())
    }

    // ---- internals ----

    fn position(&self, chat_id: &str) -> Option<usize> {
        self.chats.iter().position(|chat| chat.id == chat_id)
    }

    async fn write_back(
        &mut self,
        chat_id: &str,
        record: SerializedChat,
        operation: StoreOperation,
    ) -> StorageResult<()> {
        match self.table.update(chat_id, record).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::warn!(
                    "[ChatStore] Chat '{}' is missing from storage; reload to resynchronize",
                    chat_id
                );
                Ok(())
            }
            Err(err) => {
                self.record_failure(operation, &err);
                Err(err)
            }
        }
    }

    fn record_failure(&mut self, operation: StoreOperation, err: &StorageError) {
        tracing::error!("[ChatStore] {:?} failed: {}", operation, err);
        self.error = Some(self.locale.failure_message(operation).to_string());
        self.publish();
    }

    /// The channel retains the latest snapshot, which shares every `Arc<Chat>`.
    /// The next in-place edit of a chat therefore copies that one chat.
    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests;
