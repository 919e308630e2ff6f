//! CLI error type

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::llm::LlmError;
use crate::session::SessionError;
use crate::storage::StorageError;

/// Errors reported by CLI commands
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read {0}: {1}")]
    FileReadError(PathBuf, String),

    #[error("Failed to write {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Invalid JSON in {0}: {1}")]
    InvalidJson(PathBuf, String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CliError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CliError::Config(e) => e.user_message(),
            CliError::Llm(e) => e.user_message(),
            CliError::Session(e) => e.user_message(),
            CliError::Storage(e) => e.user_message(),
            CliError::InvalidJson(..) => format!(
                "{self}\n\n\
                Hint: Save suggestions with 'tabular-insight reports suggest --save FILE'."
            ),
            _ => self.to_string(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::InvalidArgument("x".to_string()).exit_code(), 2);
        assert_eq!(
            CliError::FileReadError(PathBuf::from("a.csv"), "missing".to_string()).exit_code(),
            1
        );
    }

    #[test]
    fn test_nested_user_message() {
        let err = CliError::Session(SessionError::NoSchema);
        assert!(err.user_message().contains("Hint:"));
    }
}
