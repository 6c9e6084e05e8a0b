//! ConversationStore trait definition.
//!
//! Maps conversation and message operations onto a partitioned document
//! store. Follows the RPITIT pattern used throughout this crate.

use chatvault_types::conversation::{ConversationDoc, MessageDoc};
use chatvault_types::error::StoreError;

/// Persistence port for conversation and message documents.
///
/// Every operation is scoped by `owner_id`, which is also the partition key.
/// Implementations live in chatvault-infra (e.g., `CosmosConversationStore`),
/// plus [`super::memory::InMemoryConversationStore`] in this crate.
///
/// Nothing here retries: every network failure propagates to the caller.
pub trait ConversationStore: Send + Sync {
    /// Open the session and ensure the database and container exist.
    ///
    /// Must be called once before any other operation; operations on a
    /// store that is not connected fail with [`StoreError::NotConnected`].
    fn connect(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Release the session. A no-op when `connect()` never succeeded.
    fn close(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Upsert a new conversation document keyed by `(conversation_id, owner_id)`.
    ///
    /// An empty title is stored as the untitled placeholder.
    fn create_conversation(
        &self,
        conversation_id: &str,
        owner_id: &str,
        title: &str,
    ) -> impl std::future::Future<Output = Result<ConversationDoc, StoreError>> + Send;

    /// Point read. Returns `None` when the owner's partition has no such document.
    fn get_conversation(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<ConversationDoc>, StoreError>> + Send;

    /// Full-document replace-or-insert.
    fn upsert_conversation(
        &self,
        doc: &ConversationDoc,
    ) -> impl std::future::Future<Output = Result<ConversationDoc, StoreError>> + Send;

    /// Delete a conversation document. Returns `false` if it was already absent.
    fn delete_conversation(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// List an owner's conversations, most recently modified first.
    fn list_conversations(
        &self,
        owner_id: &str,
        limit: u32,
        offset: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationDoc>, StoreError>> + Send;

    /// Upsert a message document into the owner's partition.
    fn create_message(
        &self,
        conversation_id: &str,
        owner_id: &str,
        message_id: &str,
        role: &str,
        content: &str,
    ) -> impl std::future::Future<Output = Result<MessageDoc, StoreError>> + Send;

    /// List a conversation's messages, oldest first.
    ///
    /// `limit` is applied client-side; `None` returns every message.
    fn list_messages(
        &self,
        conversation_id: &str,
        owner_id: &str,
        limit: Option<u32>,
    ) -> impl std::future::Future<Output = Result<Vec<MessageDoc>, StoreError>> + Send;

    /// Delete every message of a conversation, one document at a time.
    ///
    /// Not atomic: on failure some messages may already be gone. The first
    /// failure aborts the sweep and is returned.
    fn delete_messages(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;
}
