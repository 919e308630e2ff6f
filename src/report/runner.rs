//! Report generation: execution plus narrative summary

use serde::Serialize;
use tracing::warn;

use super::chart::ChartData;
use super::error::ReportResult;
use super::executor::execute_report;
use crate::models::{ReportSuggestion, Row};
use crate::planner::{Planner, SummaryContext};
use crate::progress::{NOOP_PROGRESS, ProgressSink};
use crate::storage::TableStore;

/// Summary used when the summarizer fails
pub const FALLBACK_SUMMARY: &str = "Could not generate summary.";

/// A finished report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedReport {
    pub title: String,
    pub description: String,
    pub summary: String,
    pub chart: ChartData,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl GeneratedReport {
    /// Whether the summary came from the summarizer
    pub fn has_summary(&self) -> bool {
        self.summary != FALLBACK_SUMMARY
    }
}

/// Executes suggestions and asks the planner for a summary of the result
pub struct ReportRunner<'a, P: Planner + ?Sized, S: TableStore + ?Sized> {
    planner: &'a P,
    store: &'a S,
    summary_sample_rows: usize,
    progress: &'a dyn ProgressSink,
}

impl<'a, P: Planner + ?Sized, S: TableStore + ?Sized> ReportRunner<'a, P, S> {
    pub fn new(planner: &'a P, store: &'a S) -> Self {
        Self {
            planner,
            store,
            summary_sample_rows: 20,
            progress: &NOOP_PROGRESS,
        }
    }

    /// Number of leading rows handed to the summarizer
    pub fn with_summary_sample_rows(mut self, rows: usize) -> Self {
        self.summary_sample_rows = rows;
        self
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Execute `suggestion` and summarize the result.
    ///
    /// Execution errors are returned; a failed summary is replaced by
    /// [`FALLBACK_SUMMARY`].
    pub async fn run(&self, suggestion: &ReportSuggestion) -> ReportResult<GeneratedReport> {
        self.progress
            .update(&format!("Generating report '{}'", suggestion.title));
        let data = execute_report(self.store, suggestion).await?;

        self.progress.update("Generating summary");
        let context = SummaryContext {
            title: suggestion.title.clone(),
            description: suggestion.description.clone(),
            data: data
                .rows
                .iter()
                .take(self.summary_sample_rows)
                .cloned()
                .collect(),
        };
        let summary = match self.planner.summarize(&context).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(title = %suggestion.title, error = %e, "Summary generation failed");
                self.progress
                    .error(&format!("Summary generation failed: {}", e));
                FALLBACK_SUMMARY.to_string()
            }
        };

        Ok(GeneratedReport {
            title: suggestion.title.clone(),
            description: suggestion.description.clone(),
            summary,
            chart: data.chart,
            columns: data.columns,
            rows: data.rows,
        })
    }
}
