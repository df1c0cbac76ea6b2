pub mod chat;
pub mod llm;
pub mod serialization;

pub use chat::{Chat, ChatUpdate, Message, Role, Timestamp};
pub use serialization::{SerializedChat, SerializedMessage};
