//! Error types for LLM operations

use thiserror::Error;

/// Errors that can occur while talking to a language model
#[derive(Error, Debug)]
pub enum LlmError {
    /// Failed to connect to LLM service
    #[error("Failed to connect to LLM service: {0}")]
    ConnectionError(String),

    /// Request timeout
    #[error("LLM request timed out after {0} seconds")]
    Timeout(u64),

    /// The service answered but the payload was unusable
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    /// Failed to parse LLM output as JSON
    #[error("Failed to parse LLM output as JSON: {0}")]
    ParseError(String),

    /// Retryable failures persisted past the retry budget
    #[error("Maximum retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: usize, last_error: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Rate limiting
    #[error("Rate limited by LLM service, retry after {0} seconds")]
    RateLimited(u64),

    /// Feature not available
    #[error("LLM feature not available: {0}. Enable with --features {1}")]
    FeatureNotAvailable(String, String),
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::ParseError(err.to_string())
    }
}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            LlmError::ConnectionError(msg) => {
                format!(
                    "Failed to connect to LLM service: {msg}\n\n\
                    Hints:\n\
                    - Check your internet connection\n\
                    - Verify the API key with 'tabular-insight config show'"
                )
            }
            LlmError::Timeout(secs) => {
                format!(
                    "LLM request timed out after {secs} seconds.\n\n\
                    Hint: The model may be overloaded, try again later or raise llm.timeout_seconds."
                )
            }
            LlmError::RateLimited(secs) => {
                format!(
                    "Rate limited by LLM service. Retry after {secs} seconds.\n\n\
                    Hint: Wait and try again, or use a different API key."
                )
            }
            LlmError::ConfigError(msg) => {
                format!(
                    "LLM configuration error: {msg}\n\n\
                    Hints:\n\
                    - Set TABULAR_INSIGHT_API_KEY or GEMINI_API_KEY\n\
                    - Or store a key with 'tabular-insight config set-key <KEY>'"
                )
            }
            LlmError::FeatureNotAvailable(feature, flag) => {
                format!(
                    "LLM feature '{feature}' not available.\n\n\
                    Hint: Rebuild with --features {flag}"
                )
            }
            LlmError::MaxRetriesExceeded { attempts, .. } => {
                format!(
                    "Failed after {attempts} attempts.\n\n\
                    Hints:\n\
                    - Check your network connection\n\
                    - The LLM service may be experiencing issues\n\
                    - Try again later"
                )
            }
            _ => self.to_string(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::ConnectionError(_) | LlmError::Timeout(_) | LlmError::RateLimited(_)
        )
    }

    /// Get suggested wait time before retry (in seconds)
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            LlmError::RateLimited(secs) => Some(*secs),
            LlmError::Timeout(_) => Some(5),
            LlmError::ConnectionError(_) => Some(2),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LlmError::ConnectionError("Connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to connect to LLM service: Connection refused"
        );

        let err = LlmError::Timeout(30);
        assert_eq!(err.to_string(), "LLM request timed out after 30 seconds");

        let err = LlmError::MaxRetriesExceeded {
            attempts: 3,
            last_error: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Maximum retries exceeded after 3 attempts: boom"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::RateLimited(60).is_retryable());
        assert!(LlmError::Timeout(10).is_retryable());
        assert!(!LlmError::ParseError("x".to_string()).is_retryable());
        assert!(!LlmError::ConfigError("no key".to_string()).is_retryable());
        assert_eq!(LlmError::RateLimited(7).retry_after(), Some(7));
    }

    #[test]
    fn test_config_error_hints_at_api_key() {
        let msg = LlmError::ConfigError("missing API key".to_string()).user_message();
        assert!(msg.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let llm_err: LlmError = json_err.into();
        assert!(matches!(llm_err, LlmError::ParseError(_)));
    }
}
