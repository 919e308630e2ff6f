//! Schema planning, report suggestion and report summaries
//!
//! The [`Planner`] trait is the boundary to everything model-backed. The pipeline
//! and the report executor only consume its outputs; [`LlmPlanner`] implements it on
//! top of any [`LlmClient`](crate::llm::LlmClient).

pub mod error;
pub mod llm;

pub use error::{PlannerError, PlannerResult};
pub use llm::LlmPlanner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{ReportSuggestion, Row, SchemaPlan};

/// Input of the report summarizer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryContext {
    pub title: String,
    pub description: String,
    /// Leading rows of the generated report
    pub data: Vec<Row>,
}

/// Model-backed planning operations
#[async_trait]
pub trait Planner: Send + Sync {
    /// Propose a normalized schema for a file with the given header row
    async fn infer_schema(&self, columns: &[String], sample: &[Row]) -> PlannerResult<SchemaPlan>;

    /// Propose reports over a stored schema
    async fn suggest_reports(&self, plan: &SchemaPlan) -> PlannerResult<Vec<ReportSuggestion>>;

    /// Write a short narrative summary of a generated report
    async fn summarize(&self, context: &SummaryContext) -> PlannerResult<String>;
}
