//! Timeout and retry around a single LLM request

use std::time::Duration;

use super::client::{ChatTurn, LlmClient};
use super::config::LlmConfig;
use super::error::{LlmError, LlmResult};

/// How long to wait for one request and how often to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Send one request with an explicit timeout, retrying retryable failures.
///
/// Non-retryable errors are returned immediately. When every attempt fails with a
/// retryable error the result is [`LlmError::MaxRetriesExceeded`], or the last error
/// itself when no retries were allowed.
pub async fn generate_with_retry<C: LlmClient + ?Sized>(
    client: &C,
    prompt: &str,
    prior_turns: &[ChatTurn],
    policy: &RetryPolicy,
) -> LlmResult<String> {
    let attempts = policy.max_retries + 1;
    let mut last_error = None;

    for attempt in 1..=attempts {
        let result = tokio::time::timeout(policy.timeout, client.generate(prompt, prior_turns))
            .await
            .unwrap_or(Err(LlmError::Timeout(policy.timeout.as_secs())));

        match result {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    model = client.model_name(),
                    attempt,
                    attempts,
                    error = %e,
                    "LLM request failed"
                );
                last_error = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(policy.delay * attempt as u32).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    match last_error {
        Some(e) if attempts == 1 => Err(e),
        Some(e) => Err(LlmError::MaxRetriesExceeded {
            attempts,
            last_error: e.to_string(),
        }),
        None => Err(LlmError::InvalidResponse("no attempt was made".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn fast_policy(retries: usize) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(retries)
            .with_delay(Duration::from_millis(1))
            .with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let client = MockLlmClient::scripted()
            .then_fail("flaky")
            .then_respond("ok");
        let text = generate_with_retry(&client, "p", &[], &fast_policy(2))
            .await
            .unwrap();
        assert_eq!(text, "ok");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let client = MockLlmClient::failing();
        let result = generate_with_retry(&client, "p", &[], &fast_policy(2)).await;
        assert!(matches!(
            result,
            Err(LlmError::MaxRetriesExceeded { attempts: 3, .. })
        ));
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_is_not_retried() {
        let client = MockLlmClient::scripted();
        let result = generate_with_retry(&client, "p", &[], &fast_policy(3)).await;
        assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_without_retries() {
        let client = MockLlmClient::new("late").with_delay(Duration::from_millis(200));
        let policy = fast_policy(0).with_timeout(Duration::from_millis(10));
        let result = generate_with_retry(&client, "p", &[], &policy).await;
        assert!(matches!(result, Err(LlmError::Timeout(_))));
    }
}
