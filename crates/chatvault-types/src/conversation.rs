//! Conversation and message document types for ChatVault.
//!
//! Both document kinds live in one container and share the `owner_id`
//! partition key. Message documents carry a `type = "message"` discriminator;
//! conversation documents carry none.
//!
//! Store-assigned system properties (`_rid`, `_self`, `_etag`, `_attachments`)
//! and any fields this crate does not know about are kept in `extra`, so a
//! read-modify-upsert cycle writes them back unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discriminator value stored in the `type` field of every message document.
pub const MESSAGE_DOC_TYPE: &str = "message";

/// Title stored when a conversation is created with an empty title.
pub const UNTITLED_CONVERSATION: &str = "Untitled Conversation";

/// A conversation thread owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDoc {
    pub id: String,
    /// Owning user; also the partition key.
    pub owner_id: String,
    #[serde(default)]
    pub title: String,
    /// Last-modified timestamp assigned by the store (seconds since epoch).
    #[serde(rename = "_ts", default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversationDoc {
    /// Build a fresh document. Empty titles become [`UNTITLED_CONVERSATION`].
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let title = title.into();
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            title: if title.is_empty() {
                UNTITLED_CONVERSATION.to_string()
            } else {
                title
            },
            ts: None,
            extra: Map::new(),
        }
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.ts.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}

/// A single message attached to a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDoc {
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub owner_id: String,
    pub conversation_id: String,
    /// Free-text tag such as "user" or "assistant". Not validated.
    pub role: String,
    pub content: String,
    /// Creation timestamp assigned by the store (seconds since epoch).
    #[serde(rename = "_ts", default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MessageDoc {
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        conversation_id: impl Into<String>,
        role: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            doc_type: MESSAGE_DOC_TYPE.to_string(),
            owner_id: owner_id.into(),
            conversation_id: conversation_id.into(),
            role: role.into(),
            content: content.into(),
            ts: None,
            extra: Map::new(),
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.ts.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}
