//! Strings the chat core emits on its own: default titles, the greeting, and
//! the per-operation failure messages surfaced through `ChatStore::error`.
//!
//! `ug-CN` only carries a default title; its other strings fall back to `en-US`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store operation a failure message is reported for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    LoadChats,
    CreateChat,
    DeleteChat,
    UpdateChat,
    AddMessage,
    UpdateMessage,
    ClearChats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "ug-CN")]
    UgCn,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Locale::ZhCn => "zh-CN",
            Locale::EnUs => "en-US",
            Locale::UgCn => "ug-CN",
        }
    }

    /// Locale consulted for strings this one does not define
    pub fn fallback(&self) -> Locale {
        match self {
            Locale::UgCn => Locale::EnUs,
            other => *other,
        }
    }

    pub fn new_chat_title(&self) -> &'static str {
        match self {
            Locale::ZhCn => "新对话",
            Locale::EnUs => "New Chat",
            Locale::UgCn => "يىڭى سۆھبەت",
        }
    }

    pub fn greeting(&self) -> &'static str {
        match self.fallback() {
            Locale::ZhCn => "你好！我是AI助手，有什么我可以帮你的吗？",
            Locale::EnUs | Locale::UgCn => "Hello! I'm your AI assistant. How can I help you?",
        }
    }

    pub fn failure_message(&self, operation: StoreOperation) -> &'static str {
        use StoreOperation::*;
        match (self.fallback(), operation) {
            (Locale::ZhCn, LoadChats) => "加载对话历史失败",
            (Locale::ZhCn, CreateChat) => "创建新对话失败",
            (Locale::ZhCn, DeleteChat) => "删除对话失败",
            (Locale::ZhCn, UpdateChat) => "更新对话失败",
            (Locale::ZhCn, AddMessage) => "添加消息失败",
            (Locale::ZhCn, UpdateMessage) => "更新消息失败",
            (Locale::ZhCn, ClearChats) => "清除对话失败",
            (Locale::EnUs | Locale::UgCn, LoadChats) => "Failed to load chat history",
            (Locale::EnUs | Locale::UgCn, CreateChat) => "Failed to create a new chat",
            (Locale::EnUs | Locale::UgCn, DeleteChat) => "Failed to delete the chat",
            (Locale::EnUs | Locale::UgCn, UpdateChat) => "Failed to update the chat",
            (Locale::EnUs | Locale::UgCn, AddMessage) => "Failed to add the message",
            (Locale::EnUs | Locale::UgCn, UpdateMessage) => "Failed to update the message",
            (Locale::EnUs | Locale::UgCn, ClearChats) => "Failed to clear chats",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zh-CN" | "zh" => Ok(Locale::ZhCn),
            "en-US" | "en" => Ok(Locale::EnUs),
            "ug-CN" | "ug" => Ok(Locale::UgCn),
            other => Err(anyhow::anyhow!("Unsupported locale '{}'", other)),
        }
    }
}
