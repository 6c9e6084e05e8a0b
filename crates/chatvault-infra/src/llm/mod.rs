//! Completion provider implementations.
//!
//! Contains the concrete implementation of the [`LlmProvider`] trait defined
//! in `chatvault-core` used for title generation, plus a factory that wraps
//! it for the manager.
//!
//! [`LlmProvider`]: chatvault_core::llm::provider::LlmProvider

pub mod azure_openai;

use chatvault_core::llm::box_provider::BoxLlmProvider;
use chatvault_core::title::TitleGenerator;
use chatvault_types::config::AzureOpenAiSettings;

pub use self::azure_openai::AzureOpenAiProvider;

/// Build a [`TitleGenerator`] over an Azure OpenAI deployment.
pub fn create_title_generator(settings: &AzureOpenAiSettings) -> TitleGenerator {
    let provider = BoxLlmProvider::new(AzureOpenAiProvider::new(settings));
    TitleGenerator::new(provider, settings.deployment.clone())
}
