//! Cosmos DB implementation of `ConversationStore`.
//!
//! Conversations and messages share one container partitioned on
//! `/owner_id`. Every call is routed to the owner's partition through the
//! partition key header, so a wrong owner simply sees nothing.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use chatvault_core::conversation::store::ConversationStore;
use chatvault_types::config::CosmosSettings;
use chatvault_types::conversation::{ConversationDoc, MESSAGE_DOC_TYPE, MessageDoc};
use chatvault_types::error::StoreError;

use super::client::{CosmosSession, SqlQuery};

/// Partition key path of the conversations container.
pub const PARTITION_KEY_PATH: &str = "/owner_id";

const LIST_CONVERSATIONS_QUERY: &str = "SELECT * FROM c \
WHERE c.owner_id = @owner_id AND NOT IS_DEFINED(c.type) \
ORDER BY c._ts DESC, c.id DESC OFFSET @offset LIMIT @limit";

const LIST_MESSAGES_QUERY: &str = "SELECT * FROM c \
WHERE c.owner_id = @owner_id AND c.conversation_id = @conversation_id AND c.type = @type \
ORDER BY c._ts ASC, c.id ASC";

/// Indexing policy for a new container. `_ts` only has one-second
/// resolution, so listings break ties on the time-ordered `id`, and a
/// two-property ORDER BY needs a matching composite index.
fn indexing_policy() -> Value {
    serde_json::json!({
        "indexingMode": "consistent",
        "automatic": true,
        "includedPaths": [{ "path": "/*" }],
        "excludedPaths": [{ "path": "/\"_etag\"/?" }],
        "compositeIndexes": [
            [
                { "path": "/_ts", "order": "ascending" },
                { "path": "/id", "order": "ascending" },
            ],
            [
                { "path": "/_ts", "order": "descending" },
                { "path": "/id", "order": "descending" },
            ],
        ],
    })
}

/// Cosmos DB-backed conversation store.
///
/// The session is created by `connect()` and dropped by `close()`. Calls
/// clone the session handle out of the lock before going to the network.
pub struct CosmosConversationStore {
    endpoint: String,
    key: SecretString,
    database: String,
    container: String,
    session: RwLock<Option<Arc<CosmosSession>>>,
}

impl CosmosConversationStore {
    pub fn new(settings: &CosmosSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            key: SecretString::from(settings.key.expose_secret().to_string()),
            database: settings.database.clone(),
            container: settings.container.clone(),
            session: RwLock::new(None),
        }
    }

    async fn session(&self) -> Result<Arc<CosmosSession>, StoreError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(StoreError::NotConnected)
    }

    async fn upsert<T: Serialize + DeserializeOwned>(
        &self,
        owner_id: &str,
        doc: &T,
    ) -> Result<T, StoreError> {
        let body = to_value(doc)?;
        let stored = self.session().await?.upsert_document(owner_id, &body).await?;
        from_value(stored)
    }

    async fn query_messages(
        &self,
        conversation_id: &str,
        owner_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<MessageDoc>, StoreError> {
        let query = SqlQuery::new(LIST_MESSAGES_QUERY)
            .param("@owner_id", owner_id)
            .param("@conversation_id", conversation_id)
            .param("@type", MESSAGE_DOC_TYPE);

        self.session()
            .await?
            .query_documents(owner_id, &query, limit.map(|l| l as usize))
            .await?
            .into_iter()
            .map(from_value)
            .collect()
    }
}

fn to_value<T: Serialize>(doc: &T) -> Result<Value, StoreError> {
    serde_json::to_value(doc).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl ConversationStore for CosmosConversationStore {
    #[tracing::instrument(skip(self), fields(database = %self.database, container = %self.container))]
    async fn connect(&self) -> Result<(), StoreError> {
        info!(endpoint = %self.endpoint, "Connecting to Cosmos DB");
        let session = CosmosSession::new(&self.endpoint, &self.key, &self.database, &self.container)?;

        session.ensure_database().await.map_err(|e| {
            error!(error = %e, "Failed to ensure database");
            e
        })?;
        session
            .ensure_container(PARTITION_KEY_PATH, &indexing_policy())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to ensure container");
                e
            })?;

        *self.session.write().await = Some(Arc::new(session));
        info!("Cosmos DB session ready");
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.session.write().await.take().is_some() {
            info!("Cosmos DB session closed");
        } else {
            debug!("Cosmos DB session was never opened");
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, title))]
    async fn create_conversation(
        &self,
        conversation_id: &str,
        owner_id: &str,
        title: &str,
    ) -> Result<ConversationDoc, StoreError> {
        let doc = ConversationDoc::new(conversation_id, owner_id, title);
        let stored = self.upsert(owner_id, &doc).await?;
        debug!(title = %stored.title, "Conversation document upserted");
        Ok(stored)
    }

    #[tracing::instrument(skip(self))]
    async fn get_conversation(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> Result<Option<ConversationDoc>, StoreError> {
        let Some(raw) = self
            .session()
            .await?
            .read_document(owner_id, conversation_id)
            .await?
        else {
            debug!("Conversation document not found");
            return Ok(None);
        };

        // Message ids live in the same partition; they are not conversations.
        if raw.get("type").and_then(Value::as_str) == Some(MESSAGE_DOC_TYPE) {
            warn!("Id refers to a message document, not a conversation");
            return Ok(None);
        }
        from_value(raw).map(Some)
    }

    #[tracing::instrument(skip(self, doc), fields(conversation_id = %doc.id, owner_id = %doc.owner_id))]
    async fn upsert_conversation(&self, doc: &ConversationDoc) -> Result<ConversationDoc, StoreError> {
        self.upsert(&doc.owner_id, doc).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_conversation(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> Result<bool, StoreError> {
        let deleted = self
            .session()
            .await?
            .delete_document(owner_id, conversation_id)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to delete conversation document");
                e
            })?;
        debug!(deleted, "Conversation delete finished");
        Ok(deleted)
    }

    #[tracing::instrument(skip(self))]
    async fn list_conversations(
        &self,
        owner_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ConversationDoc>, StoreError> {
        let query = SqlQuery::new(LIST_CONVERSATIONS_QUERY)
            .param("@owner_id", owner_id)
            .param("@offset", offset)
            .param("@limit", limit);

        let conversations: Vec<ConversationDoc> = self
            .session()
            .await?
            .query_documents(owner_id, &query, None)
            .await?
            .into_iter()
            .map(from_value)
            .collect::<Result<_, _>>()?;
        debug!(count = conversations.len(), "Conversations queried");
        Ok(conversations)
    }

    #[tracing::instrument(skip(self, content), fields(content_len = content.len()))]
    async fn create_message(
        &self,
        conversation_id: &str,
        owner_id: &str,
        message_id: &str,
        role: &str,
        content: &str,
    ) -> Result<MessageDoc, StoreError> {
        let doc = MessageDoc::new(message_id, owner_id, conversation_id, role, content);
        self.upsert(owner_id, &doc).await
    }

    #[tracing::instrument(skip(self))]
    async fn list_messages(
        &self,
        conversation_id: &str,
        owner_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<MessageDoc>, StoreError> {
        let messages = self.query_messages(conversation_id, owner_id, limit).await?;
        debug!(count = messages.len(), "Messages queried");
        Ok(messages)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_messages(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> Result<bool, StoreError> {
        let messages = self.query_messages(conversation_id, owner_id, None).await?;
        let session = self.session().await?;

        for message in &messages {
            let deleted = session
                .delete_document(owner_id, &message.id)
                .await
                .map_err(|e| {
                    error!(message_id = %message.id, error = %e, "Message delete failed, sweep aborted");
                    e
                })?;
            if !deleted {
                debug!(message_id = %message.id, "Message already absent");
            }
        }

        info!(count = messages.len(), "Deleted conversation messages");
        Ok(true)
    }
}
