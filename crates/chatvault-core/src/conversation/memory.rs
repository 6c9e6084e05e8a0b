//! In-process implementation of [`ConversationStore`].
//!
//! Models one partitioned container: documents are JSON values keyed by
//! `(owner_id, id)`, conversations and messages share the key space, and
//! every write stamps `_ts` in whole seconds. Listings order by `(_ts, id)`
//! like the Cosmos queries, so same-second writes fall back to id order.
//! Used by tests and by hosts that embed the manager without a remote store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use chatvault_types::conversation::{ConversationDoc, MESSAGE_DOC_TYPE, MessageDoc};
use chatvault_types::error::StoreError;

use super::store::ConversationStore;

/// Source of `_ts` values, in Unix seconds.
pub type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

/// Thread-safe in-memory document container.
pub struct InMemoryConversationStore {
    state: Mutex<State>,
    now: Clock,
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::with_clock(Box::new(|| Utc::now().timestamp()))
    }
}

#[derive(Default)]
struct State {
    connected: bool,
    partitions: HashMap<String, HashMap<String, StoredItem>>,
}

struct StoredItem {
    ts: i64,
    id: String,
    body: Value,
}

impl StoredItem {
    fn order_key(&self) -> (i64, &str) {
        (self.ts, &self.id)
    }

    fn is_message(&self) -> bool {
        is_message(&self.body)
    }

    fn belongs_to(&self, conversation_id: &str) -> bool {
        self.body.get("conversation_id").and_then(Value::as_str) == Some(conversation_id)
    }
}

fn is_message(body: &Value) -> bool {
    body.get("type").and_then(Value::as_str) == Some(MESSAGE_DOC_TYPE)
}

fn serialization(e: serde_json::Error) -> StoreError {
    StoreError::Serialization(e.to_string())
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose `_ts` stamps come from `now` instead of the system clock.
    pub fn with_clock(now: Clock) -> Self {
        Self {
            state: Mutex::new(State::default()),
            now,
        }
    }

    /// Total number of documents across all partitions, connected or not.
    pub fn document_count(&self) -> usize {
        self.state
            .lock()
            .map(|s| s.partitions.values().map(HashMap::len).sum())
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Connection("in-memory store lock poisoned".to_string()))
    }

    fn connected(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        let state = self.lock()?;
        if !state.connected {
            return Err(StoreError::NotConnected);
        }
        Ok(state)
    }
}

impl State {
    fn upsert<T: Serialize + DeserializeOwned>(
        &mut self,
        owner_id: &str,
        id: &str,
        doc: &T,
        ts: i64,
    ) -> Result<T, StoreError> {
        let mut body = serde_json::to_value(doc).map_err(serialization)?;
        if let Value::Object(map) = &mut body {
            map.insert("_ts".to_string(), Value::from(ts));
        }
        self.partitions.entry(owner_id.to_string()).or_default().insert(
            id.to_string(),
            StoredItem {
                ts,
                id: id.to_string(),
                body: body.clone(),
            },
        );
        serde_json::from_value(body).map_err(serialization)
    }

    fn partition(&self, owner_id: &str) -> impl Iterator<Item = &StoredItem> {
        self.partitions
            .get(owner_id)
            .into_iter()
            .flat_map(|items| items.values())
    }

    fn messages_of(&self, conversation_id: &str, owner_id: &str) -> Vec<&StoredItem> {
        let mut items: Vec<&StoredItem> = self
            .partition(owner_id)
            .filter(|item| item.is_message() && item.belongs_to(conversation_id))
            .collect();
        items.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        items
    }
}

impl ConversationStore for InMemoryConversationStore {
    async fn connect(&self) -> Result<(), StoreError> {
        self.lock()?.connected = true;
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.lock()?.connected = false;
        Ok(())
    }

    async fn create_conversation(
        &self,
        conversation_id: &str,
        owner_id: &str,
        title: &str,
    ) -> Result<ConversationDoc, StoreError> {
        let doc = ConversationDoc::new(conversation_id, owner_id, title);
        self.connected()?.upsert(owner_id, conversation_id, &doc, (self.now)())
    }

    async fn get_conversation(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> Result<Option<ConversationDoc>, StoreError> {
        let state = self.connected()?;
        let item = state
            .partitions
            .get(owner_id)
            .and_then(|items| items.get(conversation_id))
            .filter(|item| !item.is_message());

        item.map(|item| serde_json::from_value(item.body.clone()).map_err(serialization))
            .transpose()
    }

    async fn upsert_conversation(&self, doc: &ConversationDoc) -> Result<ConversationDoc, StoreError> {
        self.connected()?.upsert(&doc.owner_id, &doc.id, doc, (self.now)())
    }

    async fn delete_conversation(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> Result<bool, StoreError> {
        let mut state = self.connected()?;
        Ok(state
            .partitions
            .get_mut(owner_id)
            .and_then(|items| items.remove(conversation_id))
            .is_some())
    }

    async fn list_conversations(
        &self,
        owner_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ConversationDoc>, StoreError> {
        let state = self.connected()?;
        let mut items: Vec<&StoredItem> = state
            .partition(owner_id)
            .filter(|item| !item.is_message())
            .collect();
        items.sort_by(|a, b| b.order_key().cmp(&a.order_key()));

        items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|item| serde_json::from_value(item.body.clone()).map_err(serialization))
            .collect()
    }

    async fn create_message(
        &self,
        conversation_id: &str,
        owner_id: &str,
        message_id: &str,
        role: &str,
        content: &str,
    ) -> Result<MessageDoc, StoreError> {
        let doc = MessageDoc::new(message_id, owner_id, conversation_id, role, content);
        self.connected()?.upsert(owner_id, message_id, &doc, (self.now)())
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
        owner_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<MessageDoc>, StoreError> {
        let state = self.connected()?;
        let limit = limit.map_or(usize::MAX, |l| l as usize);

        state
            .messages_of(conversation_id, owner_id)
            .into_iter()
            .take(limit)
            .map(|item| serde_json::from_value(item.body.clone()).map_err(serialization))
            .collect()
    }

    async fn delete_messages(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> Result<bool, StoreError> {
        let mut state = self.connected()?;
        let ids: Vec<String> = state
            .messages_of(conversation_id, owner_id)
            .into_iter()
            .map(|item| item.id.clone())
            .collect();

        if let Some(items) = state.partitions.get_mut(owner_id) {
            for id in ids {
                items.remove(&id);
            }
        }
        Ok(true)
    }
}
