use thiserror::Error;

use crate::llm::LlmError;

/// Errors raised while loading or validating configuration.
///
/// Raised eagerly at startup, never at call time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },
}

/// Errors from document store operations (used by the `ConversationStore` trait).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The endpoint is unreachable, or `connect()` itself failed.
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("store client is not connected; call connect() first")]
    NotConnected,

    #[error("store rejected the request credentials (HTTP {status})")]
    Unauthorized { status: u16 },

    /// Non-success status other than an authentication failure.
    #[error("store request failed with HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("document serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Connection-class errors: unreachable store, bad credentials, or a
    /// client used before `connect()`.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            StoreError::Connection(_) | StoreError::NotConnected | StoreError::Unauthorized { .. }
        )
    }
}

/// Errors surfaced by the conversation manager.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("conversation {conversation_id} not found for owner {owner_id}")]
    NotFound {
        conversation_id: String,
        owner_id: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Only produced while releasing the completion client on `close()`.
    #[error("completion client error: {0}")]
    Completion(#[from] LlmError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Missing("COSMOS_DB_KEY");
        assert_eq!(err.to_string(), "missing required configuration: COSMOS_DB_KEY");
    }

    #[test]
    fn test_store_error_classes() {
        assert!(StoreError::NotConnected.is_connection());
        assert!(StoreError::Connection("refused".into()).is_connection());
        assert!(StoreError::Unauthorized { status: 401 }.is_connection());
        assert!(
            !StoreError::Remote {
                status: 500,
                message: "boom".into()
            }
            .is_connection()
        );
    }

    #[test]
    fn test_not_found_display() {
        let err = ConversationError::NotFound {
            conversation_id: "c1".into(),
            owner_id: "u1".into(),
        };
        assert_eq!(err.to_string(), "conversation c1 not found for owner u1");
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: ConversationError = StoreError::Remote {
            status: 503,
            message: "unavailable".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "store request failed with HTTP 503: unavailable"
        );
    }
}
