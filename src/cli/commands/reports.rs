//! Report commands
//!
//! `reports suggest` keeps the last suggestions in `<data_dir>/suggestions.json`
//! so `reports run --index N` can refer to them by their printed number.

use std::path::{Path, PathBuf};

use crate::cli::commands::CliContext;
use crate::cli::error::CliError;
use crate::cli::output::{format_report, format_suggestions, render_json};
use crate::models::ReportSuggestion;

/// File in the data directory holding the last suggestions
pub const SUGGESTIONS_FILE: &str = "suggestions.json";

/// Where `run` takes its suggestion from
#[derive(Debug, Clone)]
pub enum SuggestionSelector {
    /// 1-based position in the saved suggestions
    Index(usize),
    /// A JSON file with one suggestion or a list of them
    File { path: PathBuf, index: usize },
}

fn write_suggestions(path: &Path, suggestions: &[ReportSuggestion]) -> Result<(), CliError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| CliError::FileWriteError(parent.to_path_buf(), e.to_string()))?;
    }
    std::fs::write(path, render_json(suggestions)?)
        .map_err(|e| CliError::FileWriteError(path.to_path_buf(), e.to_string()))
}

/// Read suggestions from a file holding a list or a single suggestion
pub fn read_suggestions(path: &Path) -> Result<Vec<ReportSuggestion>, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::FileReadError(path.to_path_buf(), e.to_string()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| CliError::InvalidJson(path.to_path_buf(), e.to_string()))?;
    let parsed = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|one| vec![one])
    };
    parsed.map_err(|e| CliError::InvalidJson(path.to_path_buf(), e.to_string()))
}

/// Pick the `index`-th (1-based) suggestion
pub fn pick(suggestions: Vec<ReportSuggestion>, index: usize) -> Result<ReportSuggestion, CliError> {
    let count = suggestions.len();
    if index == 0 || index > count {
        return Err(CliError::InvalidArgument(format!(
            "Suggestion {} does not exist; {} available",
            index, count
        )));
    }
    suggestions
        .into_iter()
        .nth(index - 1)
        .ok_or_else(|| CliError::InvalidArgument(format!("Suggestion {} does not exist", index)))
}

/// Handle `reports suggest`
pub async fn handle_suggest(ctx: &CliContext, save: Option<&Path>) -> Result<(), CliError> {
    let session = ctx.session().await?;
    let suggestions = session.suggest_reports().await?;

    write_suggestions(&ctx.config.data_dir.join(SUGGESTIONS_FILE), &suggestions)?;
    if let Some(path) = save {
        write_suggestions(path, &suggestions)?;
    }

    ctx.emit(&suggestions, || {
        let mut output = format_suggestions(&suggestions);
        if suggestions.is_empty() {
            output.push_str("No reports were suggested.\n");
        } else {
            output.push_str("\nRun one with: tabular-insight reports run --index N\n");
        }
        output
    })
}

/// Handle `reports run`
pub async fn handle_run(ctx: &CliContext, selector: SuggestionSelector, limit: usize) -> Result<(), CliError> {
    let suggestion = match selector {
        SuggestionSelector::Index(index) => {
            let path = ctx.config.data_dir.join(SUGGESTIONS_FILE);
            if !path.is_file() {
                return Err(CliError::InvalidArgument(
                    "No saved suggestions; run 'tabular-insight reports suggest' first".to_string(),
                ));
            }
            pick(read_suggestions(&path)?, index)?
        }
        SuggestionSelector::File { path, index } => pick(read_suggestions(&path)?, index)?,
    };

    let session = ctx.session().await?;
    let report = session.run_report(&suggestion).await?;
    ctx.emit(&report, || format_report(&report, limit))
}
