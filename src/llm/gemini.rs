//! Gemini API client
//!
//! Sends the conversation to the `generateContent` endpoint and returns the text of
//! the first candidate.
//!
//! # Example
//!
//! ```ignore
//! use tabular_insight::llm::{GeminiClient, LlmClient, LlmConfig};
//!
//! let config = LlmConfig::default().with_api_key(std::env::var("GEMINI_API_KEY")?);
//! let client = GeminiClient::from_config(&config)?;
//! let text = client.generate("Describe these columns...", &[]).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::{ChatTurn, LlmClient, Role};
use super::config::LlmConfig;
use super::error::{LlmError, LlmResult};

/// Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    timeout_seconds: u64,
    temperature: f32,
    system_instruction: Option<String>,
    #[cfg(feature = "llm-online")]
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: Role,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> LlmResult<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| LlmError::InvalidResponse("response contained no candidate text".to_string()))
    }
}

impl GeminiClient {
    /// Create a client from configuration; fails when no API key is configured
    pub fn from_config(config: &LlmConfig) -> LlmResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::ConfigError("no API key configured".to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            timeout_seconds: config.timeout_seconds,
            temperature: config.temperature,
            system_instruction: None,
            #[cfg(feature = "llm-online")]
            client: reqwest::Client::new(),
        })
    }

    /// Set a system instruction sent with every request
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Endpoint URL, without the key
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_request<'a>(
        &'a self,
        prompt: &'a str,
        prior_turns: &'a [ChatTurn],
    ) -> GenerateContentRequest<'a> {
        let mut contents: Vec<Content<'a>> = prior_turns
            .iter()
            .map(|turn| Content {
                role: turn.role,
                parts: vec![Part { text: &turn.text }],
            })
            .collect();
        contents.push(Content {
            role: Role::User,
            parts: vec![Part { text: prompt }],
        });

        GenerateContentRequest {
            contents,
            system_instruction: self.system_instruction.as_deref().map(|text| SystemInstruction {
                parts: vec![Part { text }],
            }),
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }
}

#[cfg(feature = "llm-online")]
#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str, prior_turns: &[ChatTurn]) -> LlmResult<String> {
        let url = self.endpoint();
        let request = self.build_request(prompt, prior_turns);

        tracing::debug!(model = %self.model, turns = prior_turns.len() + 1, "Sending request to Gemini");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .timeout(std::time::Duration::from_secs(self.timeout_seconds))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout_seconds)
                } else if e.is_connect() {
                    LlmError::ConnectionError(format!(
                        "Failed to connect to {}: {}",
                        self.base_url,
                        e.without_url()
                    ))
                } else {
                    LlmError::ConnectionError(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited(60));
            }
            return Err(LlmError::ConnectionError(format!(
                "Gemini API error (HTTP {}): {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        body.first_text()
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[cfg(not(feature = "llm-online"))]
#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, _prompt: &str, _prior_turns: &[ChatTurn]) -> LlmResult<String> {
        Err(LlmError::FeatureNotAvailable(
            "Online LLM".to_string(),
            "llm-online".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn is_ready(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::from_config(&LlmConfig::default().with_api_key("test-key")).unwrap()
    }

    #[test]
    fn test_requires_api_key() {
        let result = GeminiClient::from_config(&LlmConfig::default());
        assert!(matches!(result, Err(LlmError::ConfigError(_))));

        let result = GeminiClient::from_config(&LlmConfig::default().with_api_key("  "));
        assert!(matches!(result, Err(LlmError::ConfigError(_))));
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            client().endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_serializes_history_then_prompt() {
        let client = client().with_system_instruction("You are a database architect.");
        let history = vec![ChatTurn::user("first"), ChatTurn::model("reply")];
        let request = client.build_request("second", &history);

        let json = serde_json::to_value(&request).unwrap();
        let contents = json["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "second");
        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "You are a database architect."
        );
        assert!(json["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn test_request_omits_missing_system_instruction() {
        let client = client();
        let request = client.build_request("hi", &[]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_first_text() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"hello"}],"role":"model"}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.first_text().unwrap(), "hello");
    }

    #[test]
    fn test_response_without_candidates() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            response.first_text(),
            Err(LlmError::InvalidResponse(_))
        ));
    }
}
