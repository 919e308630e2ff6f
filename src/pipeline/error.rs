//! Error types for pipeline operations
//!
//! A pipeline run stops at the first error. Tables written before the failure stay
//! stored; the error says which table was being processed when that matters.

use thiserror::Error;

use crate::storage::StorageError;
use crate::validation::PlanValidationError;

/// Errors that can occur during a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No schema plan, or a plan without tables
    #[error("Schema plan is missing or has no tables")]
    MissingSchema,

    /// The resolved execution order contains no table
    #[error("Execution order is empty")]
    EmptyExecutionOrder,

    /// Foreign keys form a cycle
    #[error("Schema is not a DAG: foreign keys form a cycle between {}", .tables.join(", "))]
    NotADag { tables: Vec<String> },

    /// A table definition cannot be processed
    #[error("Table '{table}' is invalid: {reason}")]
    InvalidTableSpec { table: String, reason: String },

    /// The plan does not match the input columns
    #[error("Schema plan rejected: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    InvalidPlan(Vec<PlanValidationError>),

    /// The input had no data rows
    #[error("Input contains no rows")]
    NoRows,

    /// Writing the schema or the table list failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Writing a table failed
    #[error("Failed to store table '{table}'")]
    TableFailed {
        table: String,
        #[source]
        source: StorageError,
    },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Create an invalid table error
    pub fn invalid_table(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTableSpec {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Get the table name if this error concerns one table
    pub fn table_name(&self) -> Option<&str> {
        match self {
            PipelineError::InvalidTableSpec { table, .. } => Some(table),
            PipelineError::TableFailed { table, .. } => Some(table),
            _ => None,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::MissingSchema => "No schema plan is available for this file.\n\n\
                Hint: Retry the import, or store the file as one table with --table NAME."
                .to_string(),
            PipelineError::NotADag { tables } => format!(
                "The proposed schema has circular foreign keys between: {}\n\n\
                Hint: Retry the import to get a different plan.",
                tables.join(", ")
            ),
            PipelineError::InvalidPlan(errors) => format!(
                "The proposed schema does not match the file:\n{}\n\n\
                Hint: Retry the import, or store the file as one table with --table NAME.",
                errors
                    .iter()
                    .map(|e| format!("- {}", e))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
            PipelineError::NoRows => "The file has a header row but no data.\n\n\
                Hint: Check that the right file was selected."
                .to_string(),
            PipelineError::TableFailed { table, source } => {
                format!("Failed to store table '{table}': {}", source.user_message())
            }
            PipelineError::Storage(e) => e.user_message(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = PipelineError::NotADag {
            tables: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Schema is not a DAG: foreign keys form a cycle between a, b"
        );

        let err = PipelineError::invalid_table("orders", "natural key is empty");
        assert_eq!(err.table_name(), Some("orders"));
        assert!(err.to_string().contains("natural key is empty"));
    }

    #[test]
    fn test_table_failed_keeps_source() {
        let err = PipelineError::TableFailed {
            table: "orders".to_string(),
            source: StorageError::Io("disk full".to_string()),
        };
        assert!(err.source().is_some());
        assert!(err.user_message().contains("disk full"));
    }

    #[test]
    fn test_user_message_hints() {
        assert!(PipelineError::MissingSchema.user_message().contains("Hint:"));
        assert!(PipelineError::NoRows.user_message().contains("Hint:"));
    }
}
