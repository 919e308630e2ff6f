//! Durable table storage
//!
//! Defines the [`TableStore`] trait consumed by the pipeline, the report executor and
//! the session, with two implementations:
//! - [`MemoryStore`]: process-local maps, used by tests and one-shot runs
//! - [`FileSystemStore`]: JSON documents under a base directory, used by the CLI
//!
//! Writes are table-granular with full-overwrite semantics. No operation spans more
//! than one table, so there is no cross-table transaction.

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{Row, SchemaPlan};

pub mod filesystem;
pub mod memory;

pub use filesystem::FileSystemStore;
pub use memory::MemoryStore;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid table name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl StorageError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            StorageError::TableNotFound(name) => format!(
                "Table '{name}' does not exist.\n\n\
                Hint: Run 'tabular-insight tables list' to see the stored tables."
            ),
            StorageError::Io(msg) => format!(
                "Storage IO error: {msg}\n\n\
                Hint: Check that the data directory exists and is writable."
            ),
            _ => self.to_string(),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Key/table store used by every component that persists data
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Store the rows of a table, replacing any previous contents
    async fn put_table(&self, name: &str, rows: &[Row]) -> StorageResult<()>;

    /// Load the rows of a table
    ///
    /// Returns [`StorageError::TableNotFound`] when the table was never written or was deleted.
    async fn get_table(&self, name: &str) -> StorageResult<Vec<Row>>;

    /// Names in the table list, in registration order
    async fn list_tables(&self) -> StorageResult<Vec<String>>;

    /// Merge names into the table list, keeping existing order and skipping duplicates
    async fn register_tables(&self, names: &[String]) -> StorageResult<()>;

    /// Delete a table and remove it from the table list. Deleting a missing table is not an error.
    async fn delete_table(&self, name: &str) -> StorageResult<()>;

    /// Store the schema plan of the last successful normalization run
    async fn put_schema(&self, plan: &SchemaPlan) -> StorageResult<()>;

    /// Load the stored schema plan, if any
    async fn get_schema(&self) -> StorageResult<Option<SchemaPlan>>;

    /// Store a configuration value
    async fn put_config(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Load a configuration value
    async fn get_config(&self, key: &str) -> StorageResult<Option<Value>>;
}

/// Merge `names` into `list` in order, skipping names already present
pub(crate) fn merge_table_names(list: &mut Vec<String>, names: &[String]) {
    for name in names {
        if !list.iter().any(|existing| existing == name) {
            list.push(name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_table_names() {
        let mut list = vec!["customers".to_string(), "orders".to_string()];
        merge_table_names(
            &mut list,
            &["products".to_string(), "customers".to_string(), "products".to_string()],
        );
        assert_eq!(list, vec!["customers", "orders", "products"]);
    }

    #[test]
    fn test_user_message_has_hint() {
        let err = StorageError::TableNotFound("orders".to_string());
        assert!(err.user_message().contains("Hint"));
    }
}
