//! Table browsing commands

use serde::Serialize;

use crate::cli::commands::CliContext;
use crate::cli::error::CliError;
use crate::cli::output::{format_overview, format_rows, format_table_list};
use crate::models::Row;
use crate::session::TableOverview;
use crate::source::collect_headers;
use crate::storage::TableStore;

#[derive(Serialize)]
struct TableView<'a> {
    overview: &'a TableOverview,
    rows: &'a [Row],
}

/// Handle `tables list`
pub async fn handle_list(ctx: &CliContext) -> Result<(), CliError> {
    let names = ctx.store().list_tables().await?;
    ctx.emit(&names, || format_table_list(&names))
}

/// Handle `tables show`: overview plus the first `limit` rows
pub async fn handle_show(ctx: &CliContext, name: &str, limit: usize) -> Result<(), CliError> {
    let rows = ctx.store().get_table(name).await?;
    let overview = TableOverview::from_rows(name, &rows);
    let shown = &rows[..rows.len().min(limit)];

    ctx.emit(
        &TableView {
            overview: &overview,
            rows: shown,
        },
        || {
            let mut output = format_overview(&overview);
            output.push('\n');
            output.push_str(&format_rows(&collect_headers(shown), shown));
            if rows.len() > shown.len() {
                output.push_str(&format!("... {} more rows\n", rows.len() - shown.len()));
            }
            output
        },
    )
}

/// Handle `tables delete`
pub async fn handle_delete(ctx: &CliContext, name: &str) -> Result<(), CliError> {
    ctx.store().delete_table(name).await?;
    ctx.emit(&serde_json::json!({ "deleted": name }), || {
        format!("Deleted table '{}'\n", name)
    })
}
