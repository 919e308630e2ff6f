//! Error types for report execution

use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur while executing a report
#[derive(Error, Debug)]
pub enum ReportError {
    /// The query names no table
    #[error("Report query names no tables")]
    NoTables,

    /// A table named by the query is not stored
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// More than one table without a join description
    #[error("Report query uses tables {} but has no join", .tables.join(", "))]
    MissingJoin { tables: Vec<String> },

    /// The join names a table the query does not list
    #[error("Join table '{table}' is not part of the report query")]
    JoinTableNotInQuery { table: String },

    /// No row of a joined table carries the join key
    #[error("Join key '{key}' not found in table '{table}'")]
    JoinKeyNotFound { table: String, key: String },

    /// Loading a table failed
    #[error("Storage error: {0}")]
    Storage(StorageError),
}

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

impl From<StorageError> for ReportError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TableNotFound(table) => ReportError::TableNotFound(table),
            other => ReportError::Storage(other),
        }
    }
}

impl ReportError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ReportError::TableNotFound(table) => format!(
                "The report needs table '{table}', which is not stored.\n\n\
                Hint: Re-import the file, then run 'tabular-insight reports suggest' again."
            ),
            ReportError::MissingJoin { .. }
            | ReportError::JoinTableNotInQuery { .. }
            | ReportError::JoinKeyNotFound { .. } => format!(
                "{self}\n\n\
                Hint: Ask for new suggestions with 'tabular-insight reports suggest'."
            ),
            ReportError::Storage(e) => e.user_message(),
            ReportError::NoTables => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_table_maps_from_storage() {
        let err: ReportError = StorageError::TableNotFound("orders".to_string()).into();
        assert!(matches!(err, ReportError::TableNotFound(ref t) if t == "orders"));

        let err: ReportError = StorageError::Io("denied".to_string()).into();
        assert!(matches!(err, ReportError::Storage(_)));
    }

    #[test]
    fn test_user_message() {
        let err = ReportError::JoinKeyNotFound {
            table: "orders".to_string(),
            key: "customer_id".to_string(),
        };
        let message = err.user_message();
        assert!(message.starts_with("Join key 'customer_id' not found in table 'orders'"));
        assert!(message.contains("Hint:"));
    }
}
