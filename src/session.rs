//! Import and reporting session
//!
//! A [`Session`] ties a planner, a table store and the application settings together
//! and exposes the user-level operations: import a file, browse the stored tables,
//! ask for report suggestions and generate reports. It keeps no "current table";
//! every operation returns what it produced.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tabular_insight::session::{ImportOutcome, Session};
//! use tabular_insight::source::CsvRowSource;
//!
//! let session = Session::new(planner, store).with_config(config);
//! let source = Arc::new(CsvRowSource::from_path("sales.csv"));
//! match session.import_csv(source, Some("sales")).await? {
//!     ImportOutcome::Normalized(report) => println!("{} tables", report.tables.len()),
//!     ImportOutcome::Flat { reason, .. } => println!("stored as one table: {reason}"),
//! }
//! ```

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::models::{ReportSuggestion, Row, SchemaPlan};
use crate::pipeline::{PipelineError, PipelineExecutor, PipelineReport};
use crate::planner::{Planner, PlannerError};
use crate::progress::{NoopProgress, ProgressSink};
use crate::report::{GeneratedReport, ReportError, ReportRunner};
use crate::source::{RowSource, SourceError, collect_headers, read_blocking};
use crate::storage::{StorageError, TableStore};

/// Errors returned by session operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No schema has been stored yet
    #[error("No schema is stored")]
    NoSchema,
}

impl SessionError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Source(e) => e.user_message(),
            SessionError::Planner(e) => e.user_message(),
            SessionError::Pipeline(e) => e.user_message(),
            SessionError::Report(e) => e.user_message(),
            SessionError::Storage(e) => e.user_message(),
            SessionError::NoSchema => "No schema is stored yet.\n\n\
                Hint: Import a CSV file first with 'tabular-insight import FILE'."
                .to_string(),
        }
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// How an imported file was stored
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportOutcome {
    /// Split into the tables of the planned schema
    Normalized(PipelineReport),
    /// Stored unchanged as one table because planning failed
    Flat {
        report: PipelineReport,
        /// Why the planner result could not be used
        reason: String,
    },
}

impl ImportOutcome {
    pub fn report(&self) -> &PipelineReport {
        match self {
            ImportOutcome::Normalized(report) => report,
            ImportOutcome::Flat { report, .. } => report,
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, ImportOutcome::Flat { .. })
    }

    /// Table a viewer should show first
    pub fn selected_table(&self) -> Option<&str> {
        self.report().selected_table.as_deref()
    }
}

/// Headline figures of one stored table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableOverview {
    pub name: String,
    pub row_count: usize,
    pub columns: Vec<String>,
    /// First column after the identifier whose first value is a number
    pub numeric_column: Option<String>,
    /// Sum of the numeric values of `numeric_column`
    pub numeric_total: Option<f64>,
}

impl TableOverview {
    /// Compute the overview of `rows`
    pub fn from_rows(name: impl Into<String>, rows: &[Row]) -> Self {
        let columns = collect_headers(rows);
        let numeric_column = rows.first().and_then(|first| {
            columns
                .iter()
                .skip(1)
                .find(|column| matches!(first.get(column.as_str()), Some(Value::Number(_))))
                .cloned()
        });
        let numeric_total = numeric_column.as_ref().map(|column| {
            rows.iter()
                .filter_map(|row| row.get(column).and_then(Value::as_f64))
                .sum::<f64>()
        });

        Self {
            name: name.into(),
            row_count: rows.len(),
            columns,
            numeric_column,
            numeric_total,
        }
    }
}

/// User-level operations over one planner and one store
pub struct Session<P: Planner, S: TableStore> {
    planner: P,
    store: S,
    config: AppConfig,
    progress: Box<dyn ProgressSink>,
}

impl<P: Planner, S: TableStore> Session<P, S> {
    /// Create a session with default settings
    pub fn new(planner: P, store: S) -> Self {
        Self {
            planner,
            store,
            config: AppConfig::default(),
            progress: Box::new(NoopProgress),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Send progress messages of every operation to `progress`
    pub fn with_progress(mut self, progress: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn executor(&self) -> PipelineExecutor<'_, S> {
        PipelineExecutor::new(&self.store)
            .with_config(self.config.pipeline.clone())
            .with_progress(self.progress.as_ref())
    }

    /// Plan and normalize a file.
    ///
    /// The first `preview_rows` records go to the planner; the whole file is read
    /// only once a plan is accepted. When planning fails and `fallback_table` is
    /// given, the file is stored unchanged under that name. Without a fallback the
    /// planner error is returned so the caller can pick a name and call
    /// [`import_flat`](Self::import_flat). Reads run on the blocking thread pool.
    pub async fn import_csv(
        &self,
        source: Arc<dyn RowSource>,
        fallback_table: Option<&str>,
    ) -> SessionResult<ImportOutcome> {
        self.progress
            .update(&format!("Reading preview of '{}'", source.name()));
        let preview_rows = self.config.preview_rows;
        let (headers, preview) = read_blocking(source.clone(), move |s| {
            Ok((s.headers()?, s.preview(preview_rows)?))
        })
        .await?;
        info!(
            source = %source.name(),
            columns = headers.len(),
            preview_rows = preview.len(),
            "Planning schema"
        );

        self.progress.update("Asking the planner for a schema");
        let plan = match self.planner.infer_schema(&headers, &preview).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(source = %source.name(), error = %e, "Schema planning failed");
                self.progress
                    .error(&format!("Schema planning failed: {}", e));
                let Some(table) = fallback_table else {
                    return Err(SessionError::Planner(e));
                };
                let report = self.import_flat(source, table).await?;
                return Ok(ImportOutcome::Flat {
                    report,
                    reason: e.to_string(),
                });
            }
        };

        for line in plan.summary_lines() {
            self.progress.update(&line);
        }

        self.progress.update("Reading full file");
        let rows = read_blocking(source, |s| s.read_all()).await?;
        let report = self.executor().run(&rows, &plan).await?;
        Ok(ImportOutcome::Normalized(report))
    }

    /// Store a file unchanged as one table
    pub async fn import_flat(
        &self,
        source: Arc<dyn RowSource>,
        table_name: &str,
    ) -> SessionResult<PipelineReport> {
        self.progress.update(&format!(
            "Storing '{}' as table '{}'",
            source.name(),
            table_name
        ));
        let rows = read_blocking(source, |s| s.read_all()).await?;
        Ok(self.executor().run_flat(&rows, table_name).await?)
    }

    /// Rows of a stored table
    pub async fn load_table(&self, name: &str) -> SessionResult<Vec<Row>> {
        Ok(self.store.get_table(name).await?)
    }

    /// Delete a stored table and drop it from the table list
    pub async fn delete_table(&self, name: &str) -> SessionResult<()> {
        self.store.delete_table(name).await?;
        info!(table = %name, "Table deleted");
        Ok(())
    }

    /// Names in the table list
    pub async fn list_tables(&self) -> SessionResult<Vec<String>> {
        Ok(self.store.list_tables().await?)
    }

    /// Schema of the last successful normalized import
    pub async fn schema(&self) -> SessionResult<Option<SchemaPlan>> {
        Ok(self.store.get_schema().await?)
    }

    /// Ask the planner for reports over the stored schema
    pub async fn suggest_reports(&self) -> SessionResult<Vec<ReportSuggestion>> {
        let plan = self.schema().await?.ok_or(SessionError::NoSchema)?;
        self.progress.update("Asking the planner for report suggestions");
        match self.planner.suggest_reports(&plan).await {
            Ok(suggestions) => Ok(suggestions),
            Err(e) => {
                self.progress
                    .error(&format!("Report suggestion failed: {}", e));
                Err(e.into())
            }
        }
    }

    /// Execute a report and summarize it
    pub async fn run_report(&self, suggestion: &ReportSuggestion) -> SessionResult<GeneratedReport> {
        let runner = ReportRunner::new(&self.planner, &self.store)
            .with_summary_sample_rows(self.config.summary_sample_rows)
            .with_progress(self.progress.as_ref());
        Ok(runner.run(suggestion).await?)
    }

    /// Headline figures of a stored table
    pub async fn table_overview(&self, name: &str) -> SessionResult<TableOverview> {
        let rows = self.load_table(name).await?;
        Ok(TableOverview::from_rows(name, &rows))
    }
}
