//! Error types for planner operations

use thiserror::Error;

use crate::llm::LlmError;
use crate::validation::PlanValidationError;

/// Errors returned by a [`Planner`](super::Planner)
#[derive(Error, Debug)]
pub enum PlannerError {
    /// The model could not be reached or kept failing
    #[error("LLM error: {0}")]
    Llm(LlmError),

    /// The model answered with something that is not the expected JSON
    #[error("Invalid planner response: {0}")]
    InvalidResponse(String),

    /// The schema plan failed structural validation
    #[error("Schema plan rejected: {}", join_errors(.0))]
    InvalidPlan(Vec<PlanValidationError>),

    /// The model did not answer in time
    #[error("Planner timed out after {0} seconds")]
    Timeout(u64),
}

fn join_errors(errors: &[PlanValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<LlmError> for PlannerError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(secs) => PlannerError::Timeout(secs),
            other => PlannerError::Llm(other),
        }
    }
}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

impl PlannerError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            PlannerError::Llm(e) => e.user_message(),
            PlannerError::InvalidPlan(errors) => {
                let list = errors
                    .iter()
                    .map(|e| format!("- {}", e))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "The proposed schema was rejected:\n{list}\n\n\
                    Hint: Retry the import, or store the file as one table with --table NAME."
                )
            }
            PlannerError::InvalidResponse(msg) => format!(
                "The model returned an unusable answer: {msg}\n\n\
                Hint: Retry, or store the file as one table with --table NAME."
            ),
            PlannerError::Timeout(_) => format!(
                "{self}\n\nHint: Try again later or raise llm.timeout_seconds."
            ),
        }
    }
}
