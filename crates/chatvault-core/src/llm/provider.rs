//! LlmProvider trait definition.
//!
//! This is the core abstraction that completion backends implement.
//! Uses RPITIT for `complete` and `close`.

use chatvault_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for completion provider backends (Azure OpenAI, test stubs).
///
/// Implementations live in chatvault-infra (e.g., `AzureOpenAiProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "azure_openai").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Release the underlying client. Later `complete` calls fail with
    /// [`LlmError::Closed`].
    fn close(&self) -> impl std::future::Future<Output = Result<(), LlmError>> + Send;
}
