//! Assistant - streams model replies into a chat
//!
//! Information Hiding:
//! - Wire-format conversion of the chat history hidden from callers
//! - Streaming task and channel plumbing internalized
//! - Each received delta is persisted through `ChatStore::update_message`

use crate::core::chat::Message;
use crate::core::llm::{ChatCompletionClient, ChatMessage};
use crate::store::ChatStore;
use anyhow::{Context, Result};
use tokio::sync::mpsc;

const DELTA_BUFFER: usize = 64;

pub struct Assistant {
    client: ChatCompletionClient,
}

impl Assistant {
    pub fn new(client: ChatCompletionClient) -> Self {
        Self { client }
    }

    /// Send `user_text` in `chat_id` and stream the reply into the chat
    pub async fn reply(&self, store: &mut ChatStore, chat_id: &str, user_text: &str) -> Result<String> {
        self.reply_with(store, chat_id, user_text, |_| {}).await
    }

    /// Like `reply`, calling `on_delta` with every received fragment
    pub async fn reply_with<F>(
        &self,
        store: &mut ChatStore,
        chat_id: &str,
        user_text: &str,
        mut on_delta: F,
    ) -> Result<String>
    where
        F: FnMut(&str),
    {
        if store.chat(chat_id).is_none() {
            anyhow::bail!("Chat '{}' not found", chat_id);
        }

        store.add_message(chat_id, Message::user(user_text)).await?;

        let chat = store
            .chat(chat_id)
            .with_context(|| format!("Chat '{}' disappeared", chat_id))?;
        let history: Vec<ChatMessage> = chat.messages.iter().map(ChatMessage::from).collect();
        let model = chat.model.clone();
        let temperature = chat.temperature;

        // Placeholder that the streamed deltas fill in.
        store.add_message(chat_id, Message::assistant("")).await?;

        tracing::debug!(
            "[Assistant] Streaming reply for chat '{}' with {} messages of context",
            chat_id,
            history.len()
        );

        let (tx, mut rx) = mpsc::channel(DELTA_BUFFER);
        let client = self.client.clone();
        let stream = tokio::spawn(async move {
            client.stream_chat(&history, &model, temperature, tx).await
        });

        let mut reply = String::new();
        while let Some(delta) = rx.recv().await {
            on_delta(delta.as_str());
            reply.push_str(&delta);
            store
                .update_message(chat_id, Message::assistant(reply.clone()))
                .await?;
        }

        stream
            .await
            .context("Streaming task panicked")?
            .context("Streaming reply failed")?;

        tracing::info!(
            "[Assistant] Reply for chat '{}' complete ({} chars)",
            chat_id,
            reply.chars().count()
        );
        Ok(reply)
    }
}
