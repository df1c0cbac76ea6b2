//! Storage representation of conversations
//!
//! Records written to a `ChatTable` carry no native date type: `createdAt`
//! becomes an ISO-8601 string. Serialized values own their data, so mutating
//! the in-memory chat afterwards never alters a snapshot already handed out.

use super::chat::{Chat, Message, Role, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedChat {
    pub id: String,
    pub title: String,
    pub messages: Vec<SerializedMessage>,
    pub created_at: String,
    pub model: String,
    pub temperature: f64,
}

pub fn serialize_message(message: &Message) -> SerializedMessage {
    SerializedMessage {
        role: message.role,
        content: message.content.clone(),
    }
}

pub fn serialize_chat(chat: &Chat) -> SerializedChat {
    SerializedChat {
        id: chat.id.clone(),
        title: chat.title.clone(),
        messages: chat.messages.iter().map(serialize_message).collect(),
        created_at: chat.created_at.to_iso_string(),
        model: chat.model.clone(),
        temperature: chat.temperature,
    }
}

pub fn deserialize_message(message: &SerializedMessage) -> Message {
    Message {
        role: message.role,
        content: message.content.clone(),
    }
}

/// Unparseable `createdAt` values become `Timestamp::Invalid` rather than an error.
pub fn deserialize_chat(chat: &SerializedChat) -> Chat {
    Chat {
        id: chat.id.clone(),
        title: chat.title.clone(),
        messages: chat.messages.iter().map(deserialize_message).collect(),
        created_at: Timestamp::parse_iso(&chat.created_at),
        model: chat.model.clone(),
        temperature: chat.temperature,
    }
}
