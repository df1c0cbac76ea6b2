use super::*;
use crate::core::chat::Role;
use crate::storage::{MemoryTable, StorageOperation};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

/// Memory table that fails the operations it is told to
struct FlakyTable {
    inner: MemoryTable,
    failing: Mutex<HashSet<StorageOperation>>,
}

impl FlakyTable {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryTable::new(),
            failing: Mutex::new(HashSet::new()),
        })
    }

    fn fail(&self, operation: StorageOperation) {
        self.failing.lock().unwrap().insert(operation);
    }

    fn recover(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn check(&self, operation: StorageOperation) -> StorageResult<()> {
        if self.failing.lock().unwrap().contains(&operation) {
            return Err(StorageError::new(operation, "simulated failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatTable for FlakyTable {
    async fn to_array(&self) -> StorageResult<Vec<SerializedChat>> {
        self.check(StorageOperation::ReadAll)?;
        self.inner.to_array().await
    }

    async fn add(&self, chat: SerializedChat) -> StorageResult<()> {
        self.check(StorageOperation::Insert)?;
        self.inner.add(chat).await
    }

    async fn update(&self, id: &str, chat: SerializedChat) -> StorageResult<bool> {
        self.check(StorageOperation::Update)?;
        self.inner.update(id, chat).await
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        self.check(StorageOperation::Delete)?;
        self.inner.delete(id).await
    }

    async fn clear(&self) -> StorageResult<()> {
        self.check(StorageOperation::Clear)?;
        self.inner.clear().await
    }
}

fn store_with(table: Arc<dyn ChatTable>) -> ChatStore {
    ChatStore::new(table, ChatDefaults::default(), Locale::EnUs)
}

fn ids(store: &ChatStore) -> Vec<String> {
    store.chats().iter().map(|chat| chat.id.clone()).collect()
}

#[tokio::test]
async fn test_load_empty_table_creates_default_chat() {
    let table = Arc::new(MemoryTable::new());
    let mut store = store_with(table.clone());

    store.load_chats().await;

    assert_eq!(store.chats().len(), 1);
    let chat = &store.chats()[0];
    assert_eq!(chat.messages.len(), 1);
    assert_eq!(chat.messages[0].role, Role::Assistant);
    assert_eq!(chat.messages[0].content, Locale::EnUs.greeting());
    assert_eq!(chat.title, Locale::EnUs.new_chat_title());
    assert_eq!(chat.model, "qwen-plus");
    assert_eq!(store.current_chat_id(), Some(chat.id.as_str()));
    assert_eq!(table.count().await.unwrap(), 1);
    assert!(!store.is_loading());
    assert!(store.error().is_none());
}

#[tokio::test]
async fn test_load_selects_first_stored_chat() {
    let table = Arc::new(MemoryTable::new());
    for title in ["one", "two", "three"] {
        let chat = Chat::new(title, "hi", "qwen-plus", 0.7);
        table.add(serialize_chat(&chat)).await.unwrap();
    }
    let stored = table.to_array().await.unwrap();

    let mut store = store_with(table);
    store.load_chats().await;

    assert_eq!(store.chats().len(), 3);
    assert_eq!(store.current_chat_id(), Some(stored[0].id.as_str()));
    assert!(store.current_chat().is_some());
}

#[tokio::test]
async fn test_load_failure_is_recorded_not_returned() {
    let table = FlakyTable::new();
    table.fail(StorageOperation::ReadAll);
    let mut store = store_with(table);

    store.load_chats().await;

    assert!(store.chats().is_empty());
    assert_eq!(store.error(), Some(Locale::EnUs.failure_message(StoreOperation::LoadChats)));
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_create_prepends_and_selects() {
    let mut store = store_with(Arc::new(MemoryTable::new()));

    let a = store.create_new_chat().await.unwrap();
    let b = store.create_new_chat().await.unwrap();

    assert_eq!(ids(&store), vec![b.id.clone(), a.id.clone()]);
    assert_eq!(store.current_chat_id(), Some(b.id.as_str()));
    assert!(!b.messages.is_empty());
}

#[tokio::test]
async fn test_created_ids_are_unique() {
    let mut store = store_with(Arc::new(MemoryTable::new()));
    for _ in 0..25 {
        store.create_new_chat().await.unwrap();
    }

    let unique: HashSet<String> = ids(&store).into_iter().collect();
    assert_eq!(unique.len(), 25);
}

#[tokio::test]
async fn test_create_failure_leaves_memory_untouched() {
    let table = FlakyTable::new();
    let mut store = store_with(table.clone());
    let existing = store.create_new_chat().await.unwrap();

    table.fail(StorageOperation::Insert);
    let err = store.create_new_chat().await.unwrap_err();

    assert_eq!(err.operation(), StorageOperation::Insert);
    assert_eq!(ids(&store), vec![existing.id.clone()]);
    assert_eq!(store.current_chat_id(), Some(existing.id.as_str()));
    assert_eq!(store.error(), Some(Locale::EnUs.failure_message(StoreOperation::CreateChat)));
}

#[tokio::test]
async fn test_configured_defaults_override_locale() {
    let defaults = ChatDefaults {
        model: "qwen-max".to_string(),
        temperature: 0.2,
        title: Some("Scratchpad".to_string()),
        greeting: Some("Ready.".to_string()),
    };
    let mut store = ChatStore::new(Arc::new(MemoryTable::new()), defaults, Locale::ZhCn);

    let chat = store.create_new_chat().await.unwrap();
    assert_eq!(chat.title, "Scratchpad");
    assert_eq!(chat.messages[0].content, "Ready.");
    assert_eq!(chat.model, "qwen-max");
    assert_eq!(chat.temperature, 0.2);
}

#[tokio::test]
async fn test_add_message_appends_and_persists() {
    let table = Arc::new(MemoryTable::new());
    let mut store = store_with(table.clone());
    let a = store.create_new_chat().await.unwrap();

    store.add_message(&a.id, Message::user("hi")).await.unwrap();

    let chat = store.chat(&a.id).unwrap();
    assert_eq!(chat.messages.len(), 2);
    assert_eq!(chat.messages[1], Message::user("hi"));

    let stored = table.to_array().await.unwrap();
    assert_eq!(deserialize_chat(&stored[0]), *chat);
}

#[tokio::test]
async fn test_add_message_failure_keeps_in_memory_append() {
    let table = FlakyTable::new();
    let mut store = store_with(table.clone());
    let a = store.create_new_chat().await.unwrap();

    table.fail(StorageOperation::Update);
    assert!(store.add_message(&a.id, Message::user("hi")).await.is_err());

    assert_eq!(store.chat(&a.id).unwrap().messages.len(), 2);
    assert_eq!(store.error(), Some(Locale::EnUs.failure_message(StoreOperation::AddMessage)));

    // A reload brings memory back in line with the table.
    table.recover();
    store.load_chats().await;
    assert_eq!(store.chat(&a.id).unwrap().messages.len(), 1);
}

#[tokio::test]
async fn test_update_message_replaces_last_when_role_matches() {
    let table = Arc::new(MemoryTable::new());
    let mut store = store_with(table.clone());
    let a = store.create_new_chat().await.unwrap();
    store.add_message(&a.id, Message::user("hi")).await.unwrap();
    store.add_message(&a.id, Message::assistant("")).await.unwrap();

    store.update_message(&a.id, Message::assistant("partial")).await.unwrap();
    store.update_message(&a.id, Message::assistant("partial answer")).await.unwrap();

    let chat = store.chat(&a.id).unwrap();
    assert_eq!(chat.messages.len(), 3);
    assert_eq!(chat.messages[2].content, "partial answer");

    let stored = table.to_array().await.unwrap();
    assert_eq!(stored[0].messages[2].content, "partial answer");
}

#[tokio::test]
async fn test_update_message_role_mismatch_is_noop() {
    let mut store = store_with(Arc::new(MemoryTable::new()));
    let a = store.create_new_chat().await.unwrap();
    store.add_message(&a.id, Message::user("hi")).await.unwrap();

    store.update_message(&a.id, Message::assistant("partial")).await.unwrap();

    let chat = store.chat(&a.id).unwrap();
    assert_eq!(chat.messages.len(), 2);
    assert_eq!(chat.messages[1], Message::user("hi"));
}

#[tokio::test]
async fn test_update_message_on_empty_chat_is_noop() {
    let mut store = store_with(Arc::new(MemoryTable::new()));
    let a = store.create_new_chat().await.unwrap();
    store
        .update_chat(&a.id, ChatUpdate::default().with_messages(Vec::new()))
        .await
        .unwrap();

    store.update_message(&a.id, Message::assistant("x")).await.unwrap();
    assert!(store.chat(&a.id).unwrap().messages.is_empty());
}

#[tokio::test]
async fn test_update_chat_merges_fields() {
    let table = Arc::new(MemoryTable::new());
    let mut store = store_with(table.clone());
    let a = store.create_new_chat().await.unwrap();

    store
        .update_chat(&a.id, ChatUpdate::title("Rust questions").with_model("qwen-max"))
        .await
        .unwrap();

    let chat = store.chat(&a.id).unwrap();
    assert_eq!(chat.title, "Rust questions");
    assert_eq!(chat.model, "qwen-max");
    assert_eq!(chat.temperature, a.temperature);
    assert_eq!(chat.created_at, a.created_at);

    let stored = table.to_array().await.unwrap();
    assert_eq!(stored[0].title, "Rust questions");
}

#[tokio::test]
async fn test_update_chat_failure_leaves_memory_unchanged() {
    let table = FlakyTable::new();
    let mut store = store_with(table.clone());
    let a = store.create_new_chat().await.unwrap();

    table.fail(StorageOperation::Update);
    assert!(store.update_chat(&a.id, ChatUpdate::title("nope")).await.is_err());

    assert_eq!(store.chat(&a.id).unwrap().title, a.title);
    assert_eq!(store.error(), Some(Locale::EnUs.failure_message(StoreOperation::UpdateChat)));
}

#[tokio::test]
async fn test_unknown_ids_are_ignored() {
    let table = FlakyTable::new();
    let mut store = store_with(table.clone());
    store.create_new_chat().await.unwrap();
    table.fail(StorageOperation::Update);
    table.fail(StorageOperation::Delete);

    store.update_chat("missing", ChatUpdate::title("x")).await.unwrap();
    store.add_message("missing", Message::user("x")).await.unwrap();
    store.update_message("missing", Message::user("x")).await.unwrap();
    store.delete_chat("missing").await.unwrap();

    assert_eq!(store.chats().len(), 1);
    assert!(store.error().is_none());
}

#[tokio::test]
async fn test_delete_only_chat_creates_replacement() {
    let table = Arc::new(MemoryTable::new());
    let mut store = store_with(table.clone());
    store.load_chats().await;
    let only = store.chats()[0].id.clone();

    store.delete_chat(&only).await.unwrap();

    assert_eq!(store.chats().len(), 1);
    let replacement = store.chats()[0].id.clone();
    assert_ne!(replacement, only);
    assert_eq!(store.current_chat_id(), Some(replacement.as_str()));

    let stored = table.to_array().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, replacement);
}

#[tokio::test]
async fn test_delete_current_selects_new_first() {
    let mut store = store_with(Arc::new(MemoryTable::new()));
    let a = store.create_new_chat().await.unwrap();
    let b = store.create_new_chat().await.unwrap();
    let c = store.create_new_chat().await.unwrap();

    store.delete_chat(&c.id).await.unwrap();
    assert_eq!(store.current_chat_id(), Some(b.id.as_str()));

    store.set_current_chat(&a.id);
    store.delete_chat(&b.id).await.unwrap();
    assert_eq!(store.current_chat_id(), Some(a.id.as_str()));
    assert_eq!(ids(&store), vec![a.id.clone()]);
}

#[tokio::test]
async fn test_delete_failure_leaves_memory_diverged() {
    let table = FlakyTable::new();
    let mut store = store_with(table.clone());
    let a = store.create_new_chat().await.unwrap();
    let b = store.create_new_chat().await.unwrap();

    table.fail(StorageOperation::Delete);
    let err = store.delete_chat(&b.id).await.unwrap_err();

    assert_eq!(err.operation(), StorageOperation::Delete);
    assert_eq!(ids(&store), vec![a.id.clone()]);
    assert_eq!(table.count().await.unwrap(), 2);
    assert_eq!(store.error(), Some(Locale::EnUs.failure_message(StoreOperation::DeleteChat)));

    table.recover();
    store.load_chats().await;
    assert_eq!(store.chats().len(), 2);
}

#[tokio::test]
async fn test_clear_leaves_one_fresh_chat() {
    let table = Arc::new(MemoryTable::new());
    let mut store = store_with(table.clone());
    let a = store.create_new_chat().await.unwrap();
    store.create_new_chat().await.unwrap();

    store.clear_chats().await.unwrap();

    assert_eq!(store.chats().len(), 1);
    let fresh = store.chats()[0].clone();
    assert_ne!(fresh.id, a.id);
    assert_eq!(fresh.messages.len(), 1);
    assert_eq!(store.current_chat_id(), Some(fresh.id.as_str()));

    let stored = table.to_array().await.unwrap();
    assert_eq!(stored, vec![serialize_chat(&fresh)]);
}

#[tokio::test]
async fn test_clear_failure_reports_clear_message() {
    let table = FlakyTable::new();
    let mut store = store_with(table.clone());
    store.create_new_chat().await.unwrap();

    table.fail(StorageOperation::Clear);
    assert!(store.clear_chats().await.is_err());

    assert!(store.chats().is_empty());
    assert!(store.current_chat_id().is_none());
    assert_eq!(store.error(), Some(Locale::EnUs.failure_message(StoreOperation::ClearChats)));
}

#[tokio::test]
async fn test_error_persists_until_cleared() {
    let table = FlakyTable::new();
    let mut store = store_with(table.clone());

    table.fail(StorageOperation::Insert);
    assert!(store.create_new_chat().await.is_err());
    table.recover();
    store.create_new_chat().await.unwrap();

    assert!(store.error().is_some());
    store.clear_error();
    assert!(store.error().is_none());
}

#[tokio::test]
async fn test_subscribers_observe_changes() {
    let mut store = store_with(Arc::new(MemoryTable::new()));
    let mut rx = store.subscribe();
    assert!(rx.borrow_and_update().is_empty());

    let a = store.create_new_chat().await.unwrap();

    assert!(rx.has_changed().unwrap());
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.chats.len(), 1);
    assert_eq!(snapshot.current_chat().map(|c| c.id.as_str()), Some(a.id.as_str()));
}

#[tokio::test]
async fn test_snapshot_is_not_affected_by_later_edits() {
    let mut store = store_with(Arc::new(MemoryTable::new()));
    let a = store.create_new_chat().await.unwrap();
    let before = store.snapshot();

    store.add_message(&a.id, Message::user("later")).await.unwrap();

    assert_eq!(before.chats[0].messages.len(), 1);
    assert_eq!(store.chat(&a.id).unwrap().messages.len(), 2);
}

#[tokio::test]
async fn test_set_current_chat_rejects_unknown_id() {
    let mut store = store_with(Arc::new(MemoryTable::new()));
    let a = store.create_new_chat().await.unwrap();

    assert!(!store.set_current_chat("missing"));
    assert_eq!(store.current_chat_id(), Some(a.id.as_str()));
}

#[tokio::test]
async fn test_update_message_failure_keeps_in_memory_edit() {
    let table = FlakyTable::new();
    let mut store = store_with(table.clone());
    let a = store.create_new_chat().await.unwrap();

    table.fail(StorageOperation::Update);
    let err = store
        .update_message(&a.id, Message::assistant("edited greeting"))
        .await
        .unwrap_err();

    assert_eq!(err.operation(), StorageOperation::Update);
    assert_eq!(store.chat(&a.id).unwrap().messages[0].content, "edited greeting");
    assert_eq!(store.error(), Some(Locale::EnUs.failure_message(StoreOperation::UpdateMessage)));

    let stored = table.inner.to_array().await.unwrap();
    assert_eq!(stored[0].messages[0].content, a.messages[0].content);
}

#[tokio::test]
async fn test_load_reports_failed_seed_chat_as_load_failure() {
    let table = FlakyTable::new();
    table.fail(StorageOperation::Insert);
    let mut store = store_with(table.clone());

    store.load_chats().await;

    assert!(store.chats().is_empty());
    assert!(store.current_chat_id().is_none());
    assert!(!store.is_loading());
    assert_eq!(store.error(), Some(Locale::EnUs.failure_message(StoreOperation::LoadChats)));
    assert_eq!(table.inner.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_last_chat_reports_failed_replacement() {
    let table = FlakyTable::new();
    let mut store = store_with(table.clone());
    let only = store.create_new_chat().await.unwrap();

    table.fail(StorageOperation::Insert);
    let err = store.delete_chat(&only.id).await.unwrap_err();

    assert_eq!(err.operation(), StorageOperation::Insert);
    assert!(store.chats().is_empty());
    assert!(store.current_chat_id().is_none());
    assert_eq!(store.error(), Some(Locale::EnUs.failure_message(StoreOperation::DeleteChat)));
    assert_eq!(table.inner.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_clear_reports_failed_replacement() {
    let table = FlakyTable::new();
    let mut store = store_with(table.clone());
    store.create_new_chat().await.unwrap();
    store.create_new_chat().await.unwrap();

    table.fail(StorageOperation::Insert);
    let err = store.clear_chats().await.unwrap_err();

    assert_eq!(err.operation(), StorageOperation::Insert);
    assert!(store.chats().is_empty());
    assert!(store.current_chat_id().is_none());
    assert_eq!(store.error(), Some(Locale::EnUs.failure_message(StoreOperation::ClearChats)));
    assert_eq!(table.inner.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_held_subscription_keeps_its_version_while_streaming() {
    let mut store = store_with(Arc::new(MemoryTable::new()));
    let a = store.create_new_chat().await.unwrap();
    store.add_message(&a.id, Message::assistant("")).await.unwrap();

    let rx = store.subscribe();
    let held = rx.borrow().clone();

    store.update_message(&a.id, Message::assistant("Hel")).await.unwrap();
    store.update_message(&a.id, Message::assistant("Hello")).await.unwrap();

    assert_eq!(held.chats[0].messages[1].content, "");
    assert_eq!(rx.borrow().chats[0].messages[1].content, "Hello");
    assert_eq!(store.chat(&a.id).unwrap().messages[1].content, "Hello");
}
