//! Parley - local chat client core
//!
//! This library keeps chat history in a durable local table, mirrors it in
//! an in-memory store that front-ends read and subscribe to, and streams
//! replies from an OpenAI-compatible chat-completion endpoint.

pub mod assistant;
pub mod config;
pub mod core;
pub mod locale;
pub mod storage;
pub mod store;
pub mod utils;

pub mod cli;

pub use assistant::Assistant;
pub use config::Settings;
pub use crate::core::chat::{Chat, ChatUpdate, Message, Role, Timestamp};
pub use crate::core::llm::ChatCompletionClient;
pub use locale::Locale;
pub use storage::{ChatTable, StorageError};
pub use store::{ChatStore, StoreSnapshot};

/// Application context: settings plus the loaded chat store.
///
/// Built once at startup and passed to whatever drives the store.
pub struct App {
    pub settings: Settings,
    pub store: ChatStore,
}

impl App {
    /// Open the configured table and load its chats
    pub async fn init(settings: Settings) -> anyhow::Result<Self> {
        let table = storage::open_table(&settings.storage).await?;
        let mut store = ChatStore::from_settings(table, &settings);
        store.load_chats().await;

        tracing::info!(
            "Parley initialized with {} chats (locale {})",
            store.chats().len(),
            settings.locale
        );
        Ok(Self { settings, store })
    }

    /// Assistant bound to the configured endpoint; needs an API key
    pub fn assistant(&self) -> anyhow::Result<Assistant> {
        let api_key = Settings::api_key()?;
        Ok(Assistant::new(ChatCompletionClient::new(
            api_key,
            &self.settings.inference,
        )))
    }

    pub fn shutdown(self) {
        tracing::info!(
            "Parley shutdown complete ({} chats in memory)",
            self.store.chats().len()
        );
    }
}
