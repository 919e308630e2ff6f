//! Schema command implementation

use crate::cli::commands::CliContext;
use crate::cli::error::CliError;
use crate::cli::output::format_schema;
use crate::session::SessionError;
use crate::storage::TableStore;

/// Handle `schema`: print the schema of the last normalized import
pub async fn handle_schema(ctx: &CliContext) -> Result<(), CliError> {
    let plan = ctx
        .store()
        .get_schema()
        .await?
        .ok_or(SessionError::NoSchema)?;
    ctx.emit(&plan, || format_schema(&plan))
}
