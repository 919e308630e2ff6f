//! Output formatting for CLI

use serde::Serialize;
use serde_json::Value;

use super::error::CliError;
use crate::models::{ReportSuggestion, Row, SchemaPlan};
use crate::progress::ProgressSink;
use crate::report::GeneratedReport;
use crate::session::{ImportOutcome, TableOverview};

// Wider cells are cut and end with an ellipsis
const MAX_CELL_WIDTH: usize = 40;

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Pretty JSON for `--json` output
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::InvalidArgument(e.to_string()))
}

/// Progress messages on stderr, so stdout stays parseable
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn update(&self, message: &str) {
        eprintln!("  {}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("⚠️  {}", message);
    }
}

fn cell_text(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    if text.chars().count() > MAX_CELL_WIDTH {
        let cut: String = text.chars().take(MAX_CELL_WIDTH - 1).collect();
        format!("{}…", cut)
    } else {
        text
    }
}

/// Render rows as a plain table with aligned columns
pub fn format_rows(columns: &[String], rows: &[Row]) -> String {
    if columns.is_empty() {
        return "(no columns)\n".to_string();
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| columns.iter().map(|c| cell_text(row.get(c))).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: &[String]| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut output = String::new();
    output.push_str(&line(columns));
    output.push('\n');
    output.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    output.push('\n');
    for row in &cells {
        output.push_str(&line(row));
        output.push('\n');
    }
    output
}

/// Summary of an import
pub fn format_import(outcome: &ImportOutcome) -> String {
    let report = outcome.report();
    let mut output = String::new();

    if let ImportOutcome::Flat { reason, .. } = outcome {
        output.push_str(&format!("\n⚠️  Schema planning failed: {}\n", reason));
        output.push_str("   The file was stored as a single table.\n");
    }

    output.push_str(&format!(
        "\n✅ Stored {} table(s) in {} (run {})\n",
        report.tables.len(),
        report.duration_formatted(),
        report.run_id
    ));
    for table in &report.tables {
        output.push_str(&format!(
            "  - {}: {} rows ({} read",
            table.name, table.stats.unique_rows, table.stats.input_rows
        ));
        if table.stats.resolved_fks + table.stats.unresolved_fks > 0 {
            output.push_str(&format!(
                ", {} foreign keys resolved, {} unresolved",
                table.stats.resolved_fks, table.stats.unresolved_fks
            ));
        }
        output.push_str(")\n");
    }
    for table in &report.skipped_tables {
        output.push_str(&format!("  - {}: skipped, no definition\n", table));
    }
    for warning in &report.warnings {
        output.push_str(&format!("⚠️  {}\n", warning));
    }
    if let Some(selected) = &report.selected_table {
        output.push_str(&format!("\nShow it with: tabular-insight tables show {}\n", selected));
    }
    output
}

/// Table list
pub fn format_table_list(names: &[String]) -> String {
    if names.is_empty() {
        return "No tables stored.\n".to_string();
    }
    names.iter().map(|name| format!("{}\n", name)).collect()
}

/// Overview figures of one table
pub fn format_overview(overview: &TableOverview) -> String {
    let mut output = format!(
        "Table: {}\n  Total Records: {}\n  Columns: {}\n",
        overview.name,
        overview.row_count,
        overview.columns.join(", ")
    );
    if let (Some(column), Some(total)) = (&overview.numeric_column, overview.numeric_total) {
        output.push_str(&format!("  Total {}: {:.2}\n", column, total));
    }
    output
}

/// Stored schema, one block per table
pub fn format_schema(plan: &SchemaPlan) -> String {
    let mut output = String::new();
    for (name, spec) in &plan.tables {
        output.push_str(&format!("\nTable: {}\n", name));
        output.push_str(&format!("  Primary key: {}\n", spec.primary_key));
        output.push_str(&format!(
            "  Natural key: {}\n",
            spec.natural_key_for_uniqueness.join(", ")
        ));
        output.push_str(&format!("  Columns: {}\n", spec.columns.join(", ")));
        for (column, reference) in &spec.foreign_keys {
            output.push_str(&format!("  FK: {} -> {}\n", column, reference));
        }
    }
    output
}

/// Numbered suggestion list; numbers are what `reports run --index` takes
pub fn format_suggestions(suggestions: &[ReportSuggestion]) -> String {
    let mut output = String::new();
    for (index, suggestion) in suggestions.iter().enumerate() {
        output.push_str(&format!("\n[{}] {}\n", index + 1, suggestion.title));
        if !suggestion.description.is_empty() {
            output.push_str(&format!("    {}\n", suggestion.description));
        }
        output.push_str(&format!(
            "    Tables: {}  Chart: {}\n",
            suggestion.query.tables.join(", "),
            suggestion.chart_config.chart_type
        ));
    }
    output
}

/// Report with summary, chart series and rows
pub fn format_report(report: &GeneratedReport, limit: usize) -> String {
    let mut output = format!("\n{}\n{}\n", report.title, "=".repeat(report.title.chars().count()));
    if !report.description.is_empty() {
        output.push_str(&format!("{}\n", report.description));
    }
    output.push_str(&format!("\n{}\n", report.summary));

    if !report.chart.is_empty() {
        output.push_str(&format!(
            "\nChart ({}): {}\n",
            report.chart.chart_type, report.chart.label
        ));
        for (label, value) in report.chart.points().take(limit) {
            let value = value.map(|v| v.to_string()).unwrap_or_default();
            output.push_str(&format!("  {}: {}\n", cell_text(Some(label)), value));
        }
    }

    output.push('\n');
    let shown = report.rows.len().min(limit);
    output.push_str(&format_rows(&report.columns, &report.rows[..shown]));
    if report.rows.len() > shown {
        output.push_str(&format!("... {} more rows\n", report.rows.len() - shown));
    }
    output
}
