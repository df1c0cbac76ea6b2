use crate::core::chat::Chat;
use std::sync::Arc;

/// Immutable view of the store state at one point in time.
///
/// Chats are shared with the store; the store copies a chat before mutating
/// it while a snapshot still holds it.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub chats: Vec<Arc<Chat>>,
    pub current_chat_id: Option<String>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl StoreSnapshot {
    pub fn current_chat(&self) -> Option<&Chat> {
        let id = self.current_chat_id.as_deref()?;
        self.chats
            .iter()
            .find(|chat| chat.id == id)
            .map(|chat| chat.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }
}
