//! Azure OpenAI completion provider.
//!
//! Uses [`async_openai`] with an [`AzureConfig`], so requests go to
//! `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...`
//! and authenticate with the `api-key` header.
//!
//! The client makes a single attempt per call. A 5xx or 429 response comes
//! back as an error instead of being retried inside `async_openai`.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::AzureConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use secrecy::ExposeSecret;
use tokio::sync::RwLock;
use tracing::{debug, info};

use chatvault_core::llm::provider::LlmProvider;
use chatvault_types::config::AzureOpenAiSettings;
use chatvault_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};

/// Completion provider backed by an Azure OpenAI deployment.
///
/// Does NOT derive Debug: the `async_openai::Client` holds the API key.
pub struct AzureOpenAiProvider {
    client: RwLock<Option<Client<AzureConfig>>>,
    deployment: String,
}

impl AzureOpenAiProvider {
    pub fn new(settings: &AzureOpenAiSettings) -> Self {
        let config = AzureConfig::new()
            .with_api_base(settings.endpoint.trim_end_matches('/'))
            .with_api_key(settings.api_key.expose_secret())
            .with_deployment_id(&settings.deployment)
            .with_api_version(&settings.api_version);

        let client = Client::with_config(config).with_backoff(single_attempt());

        info!(deployment = %settings.deployment, "Azure OpenAI client initialized");
        Self {
            client: RwLock::new(Some(client)),
            deployment: settings.deployment.clone(),
        }
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic [`CompletionRequest`].
    fn build_request(&self, request: &CompletionRequest) -> CreateChatCompletionRequest {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(request.user_messages.len() + 1);

        if let Some(ref system) = request.system {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(system.clone()),
                    name: None,
                },
            ));
        }

        messages.extend(request.user_messages.iter().map(|content| {
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(content.clone()),
                name: None,
            })
        }));

        // Azure routes by deployment; the model field only needs to name it.
        let model = if request.model.is_empty() {
            self.deployment.clone()
        } else {
            request.model.clone()
        };

        CreateChatCompletionRequest {
            model,
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        }
    }
}

/// Backoff policy that gives up after the first failed attempt.
fn single_attempt() -> backoff::ExponentialBackoff {
    backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

impl LlmProvider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        "azure_openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let client = self.client.read().await.clone().ok_or(LlmError::Closed)?;
        let oai_request = self.build_request(request);
        debug!(model = %oai_request.model, messages = oai_request.messages.len(), "Sending chat completion");

        let response = client
            .chat()
            .create(oai_request)
            .await
            .map_err(map_openai_error)?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone());

        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: response.id,
            content,
            model: response.model,
            usage,
        })
    }

    async fn close(&self) -> Result<(), LlmError> {
        if self.client.write().await.take().is_some() {
            info!("Azure OpenAI client closed");
        }
        Ok(())
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "401" || code == "invalid_api_key" || error_type == "authentication_error" {
                LlmError::AuthenticationFailed
            } else if code == "429" || code == "rate_limit_exceeded" {
                LlmError::RateLimited {
                    retry_after_ms: None,
                }
            } else if code == "context_length_exceeded" {
                LlmError::ContextLengthExceeded
            } else if code == "server_error" {
                LlmError::Overloaded(api_err.message.clone())
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status().map(|s| s.as_u16()) {
            Some(401) => LlmError::AuthenticationFailed,
            Some(429) => LlmError::RateLimited {
                retry_after_ms: None,
            },
            _ => LlmError::Provider {
                message: err.to_string(),
            },
        },
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const COMPLETIONS: &str = "/openai/deployments/titles/chat/completions";

    fn settings(endpoint: &str) -> AzureOpenAiSettings {
        AzureOpenAiSettings {
            endpoint: endpoint.to_string(),
            api_key: SecretString::from("azure-test-key".to_string()),
            deployment: "titles".to_string(),
            ..AzureOpenAiSettings::default()
        }
    }

    fn title_request() -> CompletionRequest {
        CompletionRequest {
            model: "titles".to_string(),
            user_messages: vec!["Hello, I'd like to discuss sales figures.".to_string()],
            system: Some("Produce a short title.".to_string()),
            max_tokens: 20,
            temperature: Some(0.9),
        }
    }

    fn completion_body(choices: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4o-mini",
            "choices": choices,
            "usage": { "prompt_tokens": 30, "completion_tokens": 4, "total_tokens": 34 },
        })
    }

    #[test]
    fn test_build_request_puts_system_first() {
        let provider = AzureOpenAiProvider::new(&settings("https://acct.openai.azure.com"));
        let oai_req = provider.build_request(&title_request());

        assert_eq!(oai_req.model, "titles");
        assert_eq!(oai_req.messages.len(), 2);
        assert!(matches!(oai_req.messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(oai_req.messages[1], ChatCompletionRequestMessage::User(_)));
        assert_eq!(oai_req.max_completion_tokens, Some(20));
        assert_eq!(oai_req.temperature, Some(0.9));
    }

    #[test]
    fn test_build_request_empty_model_uses_deployment() {
        let provider = AzureOpenAiProvider::new(&settings("https://acct.openai.azure.com"));
        let mut request = title_request();
        request.model = String::new();
        assert_eq!(provider.build_request(&request).model, "titles");
    }

    #[tokio::test]
    async fn test_complete_calls_deployment_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .and(query_param("api-version", "2024-10-15-preview"))
            .and(header("api-key", "azure-test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!([{
                "index": 0,
                "message": { "role": "assistant", "content": "Sales Figures Discussion" },
                "finish_reason": "stop",
                "logprobs": null,
            }]))))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AzureOpenAiProvider::new(&settings(&server.uri()));
        let response = provider.complete(&title_request()).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("Sales Figures Discussion"));
        assert_eq!(response.usage.input_tokens, 30);
        assert_eq!(response.usage.output_tokens, 4);
    }

    #[tokio::test]
    async fn test_complete_without_choices_has_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!([]))))
            .mount(&server)
            .await;

        let provider = AzureOpenAiProvider::new(&settings(&server.uri()));
        let response = provider.complete(&title_request()).await.unwrap();
        assert!(response.content.is_none());
    }

    #[tokio::test]
    async fn test_api_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "message": "The deployment is not ready.",
                    "type": "invalid_request_error",
                    "param": null,
                    "code": "DeploymentNotReady",
                },
            })))
            .mount(&server)
            .await;

        let provider = AzureOpenAiProvider::new(&settings(&server.uri()));
        let err = provider.complete(&title_request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": {
                    "message": "The server had an error while processing your request.",
                    "type": "server_error",
                    "param": null,
                    "code": "server_error",
                },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AzureOpenAiProvider::new(&settings(&server.uri()));
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            provider.complete(&title_request()),
        )
        .await
        .expect("completion should fail without retrying");

        assert!(matches!(result, Err(LlmError::Overloaded(_))));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "message": "Requests have exceeded the rate limit.",
                    "type": "requests",
                    "param": null,
                    "code": "429",
                },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AzureOpenAiProvider::new(&settings(&server.uri()));
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            provider.complete(&title_request()),
        )
        .await
        .expect("completion should fail without retrying");

        assert!(matches!(result, Err(LlmError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_complete_after_close_fails() {
        let provider = AzureOpenAiProvider::new(&settings("https://acct.openai.azure.com"));
        provider.close().await.unwrap();
        provider.close().await.unwrap();

        let err = provider.complete(&title_request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Closed));
    }
}
