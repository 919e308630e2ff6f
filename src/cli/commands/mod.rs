//! Command implementations
//!
//! Each handler receives a [`CliContext`] holding the resolved settings. Handlers
//! that only read the store never build a language model client, so browsing
//! tables works without an API key.

pub mod config;
pub mod import;
pub mod reports;
pub mod schema;
pub mod tables;

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::error::CliError;
use crate::cli::output::{OutputFormat, StderrProgress, render_json};
use crate::config::AppConfig;
use crate::llm::GeminiClient;
use crate::planner::LlmPlanner;
use crate::session::Session;
use crate::storage::FileSystemStore;

/// Session type used by the binary
pub type CliSession = Session<LlmPlanner<GeminiClient>, FileSystemStore>;

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct CliContext {
    pub config: AppConfig,
    /// File the settings were read from, if any
    pub config_path: Option<PathBuf>,
    pub format: OutputFormat,
}

impl CliContext {
    pub fn new(config: AppConfig, format: OutputFormat) -> Self {
        Self {
            config,
            config_path: None,
            format,
        }
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Store rooted at the configured data directory
    pub fn store(&self) -> FileSystemStore {
        FileSystemStore::new(&self.config.data_dir)
    }

    /// Session with a Gemini-backed planner; needs an API key
    pub async fn session(&self) -> Result<CliSession, CliError> {
        let store = self.store();
        let llm = self.config.resolve_llm(&store).await?;
        let client = GeminiClient::from_config(&llm)?;
        let planner = LlmPlanner::new(client, &llm);
        Ok(Session::new(planner, store)
            .with_config(self.config.clone())
            .with_progress(StderrProgress))
    }

    /// Print `value` as JSON, or `text()` in text mode
    pub fn emit<T: Serialize + ?Sized>(
        &self,
        value: &T,
        text: impl FnOnce() -> String,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Json => println!("{}", render_json(value)?),
            OutputFormat::Text => print!("{}", text()),
        }
        Ok(())
    }
}
