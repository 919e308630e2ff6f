//! Tabular Insight - turn flat CSV exports into related tables and reports
//!
//! Provides:
//! - Row sources reading CSV files with type inference
//! - A language-model planner proposing a normalized schema and report suggestions
//! - A pipeline splitting rows into deduplicated tables with resolved foreign keys
//! - A report executor with joins, grouping and chart series
//! - File-backed and in-memory table stores
//!
//! # Feature Flags
//!
//! - `llm-online` (default): HTTP transport for the Gemini client
//! - `cli`: the `tabular-insight` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tabular_insight::{AppConfig, CsvRowSource, FileSystemStore, GeminiClient, LlmPlanner, Session};
//!
//! let config = AppConfig::default().with_env();
//! let store = FileSystemStore::new(&config.data_dir);
//! let llm = config.resolve_llm(&store).await?;
//! let planner = LlmPlanner::new(GeminiClient::from_config(&llm)?, &llm);
//! let session = Session::new(planner, store).with_config(config);
//!
//! let outcome = session.import_csv(Arc::new(CsvRowSource::from_path("sales.csv")), Some("sales")).await?;
//! let suggestions = session.suggest_reports().await?;
//! let report = session.run_report(&suggestions[0]).await?;
//! ```

pub mod config;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod report;
pub mod session;
pub mod source;
pub mod storage;
pub mod validation;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use config::{AppConfig, ConfigError};
pub use llm::{GeminiClient, LlmClient, LlmConfig, LlmError, MockLlmClient};
pub use models::{ReportSuggestion, Row, SchemaPlan, TableSpec};
pub use pipeline::{
    PipelineConfig, PipelineError, PipelineExecutor, PipelineReport, UnresolvedFkPolicy,
};
pub use planner::{LlmPlanner, Planner, PlannerError};
pub use progress::{NoopProgress, ProgressSink, TracingProgress};
pub use report::{GeneratedReport, ReportError, execute_report};
pub use session::{ImportOutcome, Session, SessionError, TableOverview};
pub use source::{CsvRowSource, RowSource, SourceError, VecRowSource};
pub use storage::{FileSystemStore, MemoryStore, StorageError, TableStore};
pub use validation::{PlanValidation, validate_plan};
