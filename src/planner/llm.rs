//! Planner backed by a language model
//!
//! Each operation builds a prompt, sends it with a timeout and retries, extracts the
//! JSON from the answer and validates it structurally before returning.
//!
//! # Example
//!
//! ```ignore
//! use tabular_insight::llm::{GeminiClient, LlmConfig};
//! use tabular_insight::planner::{LlmPlanner, Planner};
//!
//! let config = LlmConfig::default().with_api_key(key);
//! let planner = LlmPlanner::new(GeminiClient::from_config(&config)?, &config);
//! let plan = planner.infer_schema(&headers, &preview).await?;
//! ```

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::{PlannerError, PlannerResult};
use super::{Planner, SummaryContext};
use crate::llm::prompt::{analyst_prompt, architect_prompt, extract_json, summarizer_prompt};
use crate::llm::{ChatTurn, LlmClient, LlmConfig, RetryPolicy, generate_with_retry};
use crate::models::{ReportSuggestion, Row, SchemaPlan};
use crate::validation::{suggestion_problems, validate_plan};

/// Planner that asks a language model
pub struct LlmPlanner<C: LlmClient> {
    client: C,
    policy: RetryPolicy,
    // Present when prior turns are replayed on every request
    history: Option<Mutex<Vec<ChatTurn>>>,
}

impl<C: LlmClient> LlmPlanner<C> {
    /// Create a planner using the timeout, retry and history settings of `config`
    pub fn new(client: C, config: &LlmConfig) -> Self {
        Self {
            client,
            policy: RetryPolicy::from_config(config),
            history: config
                .conversation_history
                .then(|| Mutex::new(Vec::new())),
        }
    }

    /// Replace the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The underlying client
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Forget the conversation so far
    pub async fn reset_history(&self) {
        if let Some(history) = &self.history {
            history.lock().await.clear();
        }
    }

    async fn ask(&self, prompt: &str) -> PlannerResult<String> {
        debug!(
            model = self.client.model_name(),
            prompt_chars = prompt.len(),
            "Sending planner prompt"
        );

        let Some(history) = &self.history else {
            return Ok(generate_with_retry(&self.client, prompt, &[], &self.policy).await?);
        };

        // Held for the whole request so turns stay paired
        let mut turns = history.lock().await;
        let text = generate_with_retry(&self.client, prompt, &turns, &self.policy).await?;
        turns.push(ChatTurn::user(prompt));
        turns.push(ChatTurn::model(text.clone()));
        Ok(text)
    }
}

fn parse_json(text: &str) -> PlannerResult<Value> {
    let json = extract_json(text);
    serde_json::from_str(&json).map_err(|e| {
        let preview: String = text.chars().take(200).collect();
        PlannerError::InvalidResponse(format!("{}. Response was: {}", e, preview))
    })
}

/// Parse a schema plan answer: an object with a `schema` mapping
pub fn parse_schema_response(text: &str) -> PlannerResult<SchemaPlan> {
    let value = parse_json(text)?;
    match value.get("schema") {
        Some(Value::Object(_)) => {}
        Some(_) => {
            return Err(PlannerError::InvalidResponse(
                "'schema' is not an object".to_string(),
            ));
        }
        None => {
            return Err(PlannerError::InvalidResponse(
                "response has no 'schema' key".to_string(),
            ));
        }
    }
    SchemaPlan::from_value(value).map_err(|e| PlannerError::InvalidResponse(e.to_string()))
}

/// Parse a report suggestion answer: a bare array, or an object holding one under
/// `reports` or `suggestions`. Entries that do not deserialize are skipped.
pub fn parse_suggestions_response(text: &str) -> PlannerResult<Vec<ReportSuggestion>> {
    let value = parse_json(text)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("reports").or_else(|| map.remove("suggestions")) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(PlannerError::InvalidResponse(
                    "expected an array of reports".to_string(),
                ));
            }
        },
        _ => {
            return Err(PlannerError::InvalidResponse(
                "expected an array of reports".to_string(),
            ));
        }
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(suggestion) => Some(suggestion),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed report suggestion");
                None
            }
        })
        .collect())
}

#[async_trait]
impl<C: LlmClient> Planner for LlmPlanner<C> {
    async fn infer_schema(&self, columns: &[String], sample: &[Row]) -> PlannerResult<SchemaPlan> {
        let prompt = architect_prompt(columns, sample);
        let text = self.ask(&prompt).await?;
        let plan = parse_schema_response(&text)?;

        let validation = validate_plan(&plan, columns);
        for warning in &validation.warnings {
            warn!("{}", warning);
        }
        validation
            .into_result()
            .map_err(PlannerError::InvalidPlan)?;

        info!(tables = plan.len(), "Schema plan received");
        Ok(plan)
    }

    async fn suggest_reports(&self, plan: &SchemaPlan) -> PlannerResult<Vec<ReportSuggestion>> {
        let schema_json = serde_json::to_string_pretty(plan)
            .map_err(|e| PlannerError::InvalidResponse(e.to_string()))?;
        let text = self.ask(&analyst_prompt(&schema_json)).await?;

        let suggestions: Vec<ReportSuggestion> = parse_suggestions_response(&text)?
            .into_iter()
            .filter(|suggestion| {
                let problems = suggestion_problems(suggestion, plan);
                if !problems.is_empty() {
                    warn!(
                        title = %suggestion.title,
                        problems = %problems.join("; "),
                        "Dropping report suggestion"
                    );
                }
                problems.is_empty()
            })
            .collect();

        if suggestions.is_empty() {
            return Err(PlannerError::InvalidResponse(
                "no usable report suggestions".to_string(),
            ));
        }
        info!(count = suggestions.len(), "Report suggestions received");
        Ok(suggestions)
    }

    async fn summarize(&self, context: &SummaryContext) -> PlannerResult<String> {
        let prompt = summarizer_prompt(&context.title, &context.description, &context.data);
        let text = self.ask(&prompt).await?;
        let summary = text.trim();
        if summary.is_empty() {
            return Err(PlannerError::InvalidResponse("empty summary".to_string()));
        }
        Ok(summary.to_string())
    }
}
