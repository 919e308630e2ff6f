//! LLM client trait and the scripted mock client
//!
//! This module defines the `LlmClient` trait: a single capability,
//! `generate(prompt, prior_turns) -> text`, implemented by the Gemini HTTP client
//! and by [`MockLlmClient`] for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::{LlmError, LlmResult};

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One earlier message of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Trait for LLM client implementations
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to `prompt`, continuing the conversation in `prior_turns`
    ///
    /// # Arguments
    /// * `prompt` - The new user message
    /// * `prior_turns` - Earlier turns, oldest first; empty for a one-shot request
    ///
    /// # Returns
    /// The generated text response
    async fn generate(&self, prompt: &str, prior_turns: &[ChatTurn]) -> LlmResult<String>;

    /// Get the model name being used
    fn model_name(&self) -> &str;

    /// Check if the client is configured and able to send requests
    async fn is_ready(&self) -> bool;
}

#[async_trait]
impl<C: LlmClient + ?Sized> LlmClient for Arc<C> {
    async fn generate(&self, prompt: &str, prior_turns: &[ChatTurn]) -> LlmResult<String> {
        (**self).generate(prompt, prior_turns).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    async fn is_ready(&self) -> bool {
        (**self).is_ready().await
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fail(String),
}

/// A request received by [`MockLlmClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub prompt: String,
    pub prior_turns: Vec<ChatTurn>,
}

/// A mock LLM client for testing
///
/// Replies are taken from a script in order; once the script is used up the
/// fallback response is returned, or an error when there is none.
#[derive(Debug)]
pub struct MockLlmClient {
    model: String,
    script: Mutex<VecDeque<MockReply>>,
    fallback: Option<String>,
    should_fail: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockLlmClient {
    /// Create a new mock client that always returns the given response
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            model: "mock-model".to_string(),
            script: Mutex::new(VecDeque::new()),
            fallback: Some(response.into()),
            should_fail: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock client with an empty script and no fallback
    pub fn scripted() -> Self {
        Self {
            fallback: None,
            ..Self::new("")
        }
    }

    /// Create a mock client that fails every request with a connection error
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::scripted()
        }
    }

    /// Queue a successful reply
    pub fn then_respond(self, response: impl Into<String>) -> Self {
        self.lock_script().push_back(MockReply::Text(response.into()));
        self
    }

    /// Queue a connection failure
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.lock_script().push_back(MockReply::Fail(message.into()));
        self
    }

    /// Sleep before answering, to exercise timeouts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request received so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.prompt).collect()
    }

    /// Number of requests received
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<MockReply>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, prompt: &str, prior_turns: &[ChatTurn]) -> LlmResult<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(MockCall {
                prompt: prompt.to_string(),
                prior_turns: prior_turns.to_vec(),
            });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail {
            return Err(LlmError::ConnectionError("Mock failure".to_string()));
        }

        let next = self.lock_script().pop_front();
        match next {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(LlmError::ConnectionError(message)),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| LlmError::InvalidResponse("mock script exhausted".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn is_ready(&self) -> bool {
        !self.should_fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_client_success() {
        let client = MockLlmClient::new("Test response");
        assert!(client.is_ready().await);
        assert_eq!(client.model_name(), "mock-model");

        let response = client.generate("Test prompt", &[]).await.unwrap();
        assert_eq!(response, "Test response");
        assert_eq!(client.prompts(), vec!["Test prompt"]);
    }

    #[tokio::test]
    async fn test_mock_client_failure() {
        let client = MockLlmClient::failing();
        assert!(!client.is_ready().await);

        let result = client.generate("Test prompt", &[]).await;
        assert!(matches!(result, Err(LlmError::ConnectionError(_))));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_script_order_and_exhaustion() {
        let client = MockLlmClient::scripted()
            .then_fail("flaky")
            .then_respond("second");

        assert!(client.generate("a", &[]).await.is_err());
        assert_eq!(client.generate("b", &[]).await.unwrap(), "second");
        assert!(matches!(
            client.generate("c", &[]).await,
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_records_prior_turns() {
        let client = Arc::new(MockLlmClient::new("ok"));
        let history = vec![ChatTurn::user("hi"), ChatTurn::model("hello")];
        client.generate("next", &history).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls[0].prior_turns, history);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let turn = ChatTurn::model("x");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "model");
    }
}
