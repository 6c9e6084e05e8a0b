//! Conversation manager orchestrating conversation and message lifecycle.
//!
//! `ConversationManager` is the single entry point for callers. It generates
//! identifiers, enforces owner-scoped existence checks before mutations,
//! sequences the cascade delete, and asks the optional [`TitleGenerator`]
//! for a title when a conversation is opened with seed messages.

use chatvault_types::conversation::{ConversationDoc, MessageDoc};
use chatvault_types::error::ConversationError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::store::ConversationStore;
use crate::title::TitleGenerator;

/// Title given to conversations created without title generation.
pub const DEFAULT_TITLE: &str = "Chat";

/// Page size used by [`ConversationManager::list_conversations`] when none is given.
pub const DEFAULT_CONVERSATION_LIMIT: u32 = 25;

/// Message count used by [`ConversationManager::get_messages`] when none is given.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 100;

/// Orchestrates conversation and message persistence for many owners.
///
/// Generic over `ConversationStore` to maintain clean architecture
/// (chatvault-core never depends on chatvault-infra).
pub struct ConversationManager<S: ConversationStore> {
    store: S,
    titles: Option<TitleGenerator>,
}

impl<S: ConversationStore> ConversationManager<S> {
    /// Create a manager over `store`, with optional title generation.
    pub fn new(store: S, titles: Option<TitleGenerator>) -> Self {
        Self { store, titles }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // --- Lifecycle ---

    /// Connect the store. Call once before any other operation.
    pub async fn initialize(&self) -> Result<(), ConversationError> {
        info!("Initializing conversation manager");
        self.store.connect().await.map_err(|e| {
            error!(error = %e, "Failed to initialize conversation manager");
            e
        })?;
        info!("Conversation manager initialized");
        Ok(())
    }

    /// Release the store and the title generator.
    ///
    /// Both releases are attempted; the first error encountered is returned.
    pub async fn close(&self) -> Result<(), ConversationError> {
        info!("Closing conversation manager");
        let mut first_error: Option<ConversationError> = None;

        if let Err(e) = self.store.close().await {
            error!(error = %e, "Failed to close conversation store");
            first_error = Some(e.into());
        }

        if let Some(titles) = &self.titles {
            if let Err(e) = titles.close().await {
                error!(error = %e, "Failed to close title generator");
                first_error.get_or_insert(e.into());
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("Conversation manager closed");
                Ok(())
            }
        }
    }

    // --- Conversations ---

    /// Create a conversation for `owner_id`.
    ///
    /// When `user_messages` is non-empty and a title generator is configured,
    /// the title is generated from them; generation never fails the call.
    #[tracing::instrument(skip(self, user_messages), fields(seed_messages = user_messages.len()))]
    pub async fn create_conversation(
        &self,
        owner_id: &str,
        user_messages: &[String],
    ) -> Result<ConversationDoc, ConversationError> {
        let conversation_id = Uuid::now_v7().to_string();
        debug!(conversation_id = %conversation_id, "Generated conversation id");

        let title = match &self.titles {
            Some(titles) if !user_messages.is_empty() => titles.generate_title(user_messages).await,
            _ => DEFAULT_TITLE.to_string(),
        };

        let doc = self
            .store
            .create_conversation(&conversation_id, owner_id, &title)
            .await?;
        info!(conversation_id = %doc.id, title = %doc.title, "Conversation created");
        Ok(doc)
    }

    /// Change a conversation's title, keeping every other field as stored.
    #[tracing::instrument(skip(self, new_title))]
    pub async fn rename_conversation(
        &self,
        conversation_id: &str,
        owner_id: &str,
        new_title: &str,
    ) -> Result<ConversationDoc, ConversationError> {
        let mut conversation = self.require_conversation(conversation_id, owner_id).await?;
        conversation.title = new_title.to_string();

        let updated = self.store.upsert_conversation(&conversation).await?;
        info!("Conversation renamed");
        Ok(updated)
    }

    /// Get a conversation. Returns `None` when absent or owned by someone else.
    #[tracing::instrument(skip(self))]
    pub async fn get_conversation(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> Result<Option<ConversationDoc>, ConversationError> {
        let conversation = self.store.get_conversation(conversation_id, owner_id).await?;
        if conversation.is_none() {
            warn!("Conversation not found");
        }
        Ok(conversation)
    }

    /// List an owner's conversations, most recent first.
    ///
    /// Defaults: 25 per page, starting at offset 0.
    #[tracing::instrument(skip(self))]
    pub async fn list_conversations(
        &self,
        owner_id: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<ConversationDoc>, ConversationError> {
        let conversations = self
            .store
            .list_conversations(
                owner_id,
                limit.unwrap_or(DEFAULT_CONVERSATION_LIMIT),
                offset.unwrap_or(0),
            )
            .await?;
        info!(count = conversations.len(), "Listed conversations");
        Ok(conversations)
    }

    /// Delete a conversation and all of its messages.
    ///
    /// Messages go first; if their cleanup fails the conversation document is
    /// left in place so the whole delete can be retried. Returns `false` when
    /// the conversation document was already absent.
    #[tracing::instrument(skip(self))]
    pub async fn delete_conversation(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> Result<bool, ConversationError> {
        self.store
            .delete_messages(conversation_id, owner_id)
            .await
            .map_err(|e| {
                error!(error = %e, "Message cleanup failed, conversation kept");
                e
            })?;

        let deleted = self.store.delete_conversation(conversation_id, owner_id).await?;
        if deleted {
            info!("Conversation deleted");
        } else {
            warn!("Conversation was already absent");
        }
        Ok(deleted)
    }

    // --- Messages ---

    /// Append a message to an existing conversation of `owner_id`.
    ///
    /// Fails with [`ConversationError::NotFound`] when the conversation does
    /// not exist in the owner's partition; nothing is written in that case.
    #[tracing::instrument(skip(self, content), fields(content_len = content.len()))]
    pub async fn add_message(
        &self,
        conversation_id: &str,
        owner_id: &str,
        role: &str,
        content: &str,
    ) -> Result<MessageDoc, ConversationError> {
        self.require_conversation(conversation_id, owner_id).await?;

        let message_id = Uuid::now_v7().to_string();
        let message = self
            .store
            .create_message(conversation_id, owner_id, &message_id, role, content)
            .await?;
        info!(message_id = %message.id, "Message added");
        Ok(message)
    }

    /// Get a conversation's messages, oldest first. Defaults to 100 messages.
    #[tracing::instrument(skip(self))]
    pub async fn get_messages(
        &self,
        conversation_id: &str,
        owner_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<MessageDoc>, ConversationError> {
        let messages = self
            .store
            .list_messages(
                conversation_id,
                owner_id,
                Some(limit.unwrap_or(DEFAULT_MESSAGE_LIMIT)),
            )
            .await?;
        info!(count = messages.len(), "Retrieved messages");
        Ok(messages)
    }

    async fn require_conversation(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> Result<ConversationDoc, ConversationError> {
        match self.store.get_conversation(conversation_id, owner_id).await? {
            Some(conversation) => Ok(conversation),
            None => {
                warn!("Conversation not found or owned by a different user");
                Err(ConversationError::NotFound {
                    conversation_id: conversation_id.to_string(),
                    owner_id: owner_id.to_string(),
                })
            }
        }
    }
}
