//! Import command implementation

use std::path::Path;
use std::sync::Arc;

use crate::cli::commands::CliContext;
use crate::cli::error::CliError;
use crate::cli::output::{StderrProgress, format_import};
use crate::pipeline::PipelineExecutor;
use crate::session::{ImportOutcome, SessionError};
use crate::source::{CsvRowSource, RowSource, read_blocking};

/// Options of `import`
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Table name used when the file is stored unchanged
    pub table: Option<String>,
    /// Store the file under its stem when planning fails and no `table` is given
    pub fallback: bool,
    /// Skip planning and store the file as one table
    pub flat: bool,
    pub delimiter: Option<u8>,
}

/// Parse a one-character delimiter argument; `\t` and `tab` mean a tab
pub fn parse_delimiter(value: &str) -> Result<u8, CliError> {
    match value {
        "\\t" | "tab" => Ok(b'\t'),
        _ if value.len() == 1 && value.is_ascii() => Ok(value.as_bytes()[0]),
        _ => Err(CliError::InvalidArgument(format!(
            "Delimiter must be a single ASCII character, got '{}'",
            value
        ))),
    }
}

/// Handle the import command
pub async fn handle_import(ctx: &CliContext, file: &Path, options: &ImportOptions) -> Result<(), CliError> {
    if !file.is_file() {
        return Err(CliError::FileReadError(
            file.to_path_buf(),
            "no such file".to_string(),
        ));
    }

    let mut source = CsvRowSource::from_path(file);
    if let Some(delimiter) = options.delimiter {
        source = source.with_delimiter(delimiter);
    }
    let stem = source.name().to_string();
    let source: Arc<dyn RowSource> = Arc::new(source);

    let outcome = if options.flat {
        // No planner involved, so no API key is needed
        let rows = read_blocking(source, |s| s.read_all())
            .await
            .map_err(SessionError::from)?;
        let store = ctx.store();
        let progress = StderrProgress;
        let report = PipelineExecutor::new(&store)
            .with_config(ctx.config.pipeline.clone())
            .with_progress(&progress)
            .run_flat(&rows, options.table.as_deref().unwrap_or(&stem))
            .await
            .map_err(SessionError::from)?;
        ImportOutcome::Flat {
            report,
            reason: "requested with --flat".to_string(),
        }
    } else {
        let session = ctx.session().await?;
        let fallback = match &options.table {
            Some(table) => Some(table.as_str()),
            None => options.fallback.then_some(stem.as_str()),
        };
        session.import_csv(source, fallback).await?
    };

    ctx.emit(&outcome, || format_import(&outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter("\\t").unwrap(), b'\t');
        assert!(matches!(parse_delimiter(";;"), Err(CliError::InvalidArgument(_))));
        assert!(parse_delimiter("").is_err());
    }
}
