//! Conversation title generation via a completion provider.
//!
//! `TitleGenerator::generate_title` turns a conversation's opening user
//! messages into a short title. It never fails: a provider error yields
//! [`FAILED_TITLE`] and a response without usable text yields
//! [`UNTITLED_CHAT`], so the two cases stay distinguishable in storage and logs.

use chatvault_types::llm::{CompletionRequest, LlmError};
use tracing::{debug, error, info, warn};

use crate::llm::box_provider::BoxLlmProvider;

/// System prompt for the title generation call.
const TITLE_SYSTEM_PROMPT: &str = "You are a system that provides short, concise chat conversation titles. \
Take the user's messages and produce a 4-word max title. No punctuation. \
No quotes. If insufficient context, output 'New Chat'.";

/// Title used when the provider returns no usable completion.
pub const UNTITLED_CHAT: &str = "Untitled Chat";

/// Title used when the provider call fails.
pub const FAILED_TITLE: &str = "Chat";

const MAX_TITLE_WORDS: usize = 4;
const TITLE_MAX_TOKENS: u32 = 20;
const TITLE_TEMPERATURE: f64 = 0.9;

const QUOTE_CHARS: [char; 7] = ['"', '\'', '`', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}'];

/// Stateless adapter between the manager and a completion provider.
pub struct TitleGenerator {
    provider: BoxLlmProvider,
    model: String,
}

impl TitleGenerator {
    /// `model` is the model or deployment identifier sent with each request.
    pub fn new(provider: BoxLlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn build_request(&self, user_messages: &[String]) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            user_messages: user_messages.to_vec(),
            system: Some(TITLE_SYSTEM_PROMPT.to_string()),
            max_tokens: TITLE_MAX_TOKENS,
            temperature: Some(TITLE_TEMPERATURE),
        }
    }

    /// Generate a title of at most four words with no quotes or punctuation.
    #[tracing::instrument(
        name = "generate_title",
        skip(self, user_messages),
        fields(provider = %self.provider.name(), messages = user_messages.len())
    )]
    pub async fn generate_title(&self, user_messages: &[String]) -> String {
        let request = self.build_request(user_messages);
        debug!(model = %request.model, "Requesting conversation title");

        match self.provider.complete(&request).await {
            Ok(response) => {
                debug!(
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Title completion received"
                );
                match response.content.as_deref().and_then(clean_title) {
                    Some(title) => {
                        info!(title = %title, "Generated conversation title");
                        title
                    }
                    None => {
                        warn!("No usable title in completion response, using '{UNTITLED_CHAT}'");
                        UNTITLED_CHAT.to_string()
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Title generation failed, using '{FAILED_TITLE}'");
                FAILED_TITLE.to_string()
            }
        }
    }

    /// Release the provider's client.
    pub async fn close(&self) -> Result<(), LlmError> {
        self.provider.close().await
    }
}

/// Strip quotes and edge punctuation from each word and keep the first four.
fn clean_title(raw: &str) -> Option<String> {
    let unquoted: String = raw.chars().filter(|c| !QUOTE_CHARS.contains(c)).collect();
    let words: Vec<&str> = unquoted
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .take(MAX_TITLE_WORDS)
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::stub::{Reply, StubProvider};

    fn generator(provider: StubProvider) -> TitleGenerator {
        TitleGenerator::new(BoxLlmProvider::new(provider), "gpt-4o-mini")
    }

    fn sales_messages() -> Vec<String> {
        vec!["Hello, I'd like to discuss sales figures.".to_string()]
    }

    #[test]
    fn test_clean_title_strips_quotes_and_punctuation() {
        assert_eq!(
            clean_title("  \"Sales Figures Discussion.\"  ").as_deref(),
            Some("Sales Figures Discussion")
        );
        assert_eq!(clean_title("'Planning a Trip!'").as_deref(), Some("Planning a Trip"));
        assert_eq!(
            clean_title("\u{201C}Quarterly Review\u{201D}").as_deref(),
            Some("Quarterly Review")
        );
    }

    #[test]
    fn test_clean_title_limits_words() {
        assert_eq!(
            clean_title("Discussing the quarterly sales figures today").as_deref(),
            Some("Discussing the quarterly sales")
        );
    }

    #[test]
    fn test_clean_title_rejects_empty_text() {
        assert!(clean_title("").is_none());
        assert!(clean_title("  ... \"\" ").is_none());
    }

    #[test]
    fn test_system_prompt_constraints() {
        assert!(TITLE_SYSTEM_PROMPT.contains("4-word max"));
        assert!(TITLE_SYSTEM_PROMPT.contains("No punctuation"));
        assert!(TITLE_SYSTEM_PROMPT.contains("No quotes"));
    }

    #[tokio::test]
    async fn test_generate_title_from_sales_message() {
        let titles = generator(StubProvider::text("\"Sales Figures Discussion.\""));
        let title = titles.generate_title(&sales_messages()).await;

        assert!(!title.is_empty());
        assert!(title.split_whitespace().count() <= 4);
        assert!(!title.contains(|c: char| QUOTE_CHARS.contains(&c)));
        assert!(!title.ends_with(|c: char| c.is_ascii_punctuation()));
        assert_eq!(title, "Sales Figures Discussion");
    }

    #[test]
    fn test_request_shape() {
        let provider = StubProvider::text("Sales Talk");
        let titles = TitleGenerator::new(BoxLlmProvider::new(provider), "titles-deployment");
        let messages = vec!["first".to_string(), "second".to_string()];
        let request = titles.build_request(&messages);

        assert_eq!(request.model, "titles-deployment");
        assert_eq!(request.user_messages, messages);
        assert_eq!(request.system.as_deref(), Some(TITLE_SYSTEM_PROMPT));
        assert_eq!(request.max_tokens, 20);
        assert_eq!(request.temperature, Some(0.9));
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_chat() {
        let titles = generator(StubProvider::new(Reply::Fail));
        assert_eq!(titles.generate_title(&sales_messages()).await, "Chat");
    }

    #[tokio::test]
    async fn test_missing_choice_falls_back_to_untitled() {
        let titles = generator(StubProvider::new(Reply::NoChoice));
        assert_eq!(titles.generate_title(&sales_messages()).await, "Untitled Chat");

        let titles = generator(StubProvider::text("   "));
        assert_eq!(titles.generate_title(&sales_messages()).await, "Untitled Chat");
    }

    #[tokio::test]
    async fn test_close_delegates_to_provider() {
        let titles = generator(StubProvider::text("x"));
        titles.close().await.unwrap();
        assert_eq!(titles.provider_name(), "stub");
    }
}
