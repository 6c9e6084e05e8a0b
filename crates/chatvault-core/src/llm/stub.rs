//! Scripted provider for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chatvault_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};

use super::provider::LlmProvider;

#[derive(Clone)]
pub enum Reply {
    Text(String),
    NoChoice,
    Fail,
}

pub struct StubProvider {
    reply: Reply,
    fail_close: bool,
    closed: Arc<AtomicBool>,
}

impl StubProvider {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            fail_close: false,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(Reply::Text(text.to_string()))
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Set once `close()` has been called, whether or not it failed.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

impl LlmProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let content = match &self.reply {
            Reply::Text(text) => Some(text.clone()),
            Reply::NoChoice => None,
            Reply::Fail => {
                return Err(LlmError::Provider {
                    message: "HTTP 500: upstream unavailable".to_string(),
                });
            }
        };
        Ok(CompletionResponse {
            id: "cmpl-1".to_string(),
            content,
            model: request.model.clone(),
            usage: Usage::default(),
        })
    }

    async fn close(&self) -> Result<(), LlmError> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            return Err(LlmError::Provider {
                message: "close failed".to_string(),
            });
        }
        Ok(())
    }
}
