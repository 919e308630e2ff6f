//! Application configuration
//!
//! Settings are read from an optional TOML file and then from the environment:
//!
//! ```toml
//! data_dir = "/var/lib/tabular-insight"
//! preview_rows = 10
//! summary_sample_rows = 20
//!
//! [llm]
//! model = "gemini-2.5-flash"
//! timeout_seconds = 60
//!
//! [pipeline]
//! unresolved_fk_policy = "null"
//! ```
//!
//! The API key is looked up in the file first, then in `TABULAR_INSIGHT_API_KEY` or
//! `GEMINI_API_KEY`, and finally in the store's config area under `apiKey`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::llm::LlmConfig;
use crate::pipeline::PipelineConfig;
use crate::storage::{StorageResult, TableStore};

/// Store config key holding the API key
pub const API_KEY_CONFIG_KEY: &str = "apiKey";

/// Environment variables checked for the API key, in order
pub const API_KEY_ENV_VARS: [&str; 2] = ["TABULAR_INSIGHT_API_KEY", "GEMINI_API_KEY"];

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV_VAR: &str = "TABULAR_INSIGHT_DATA_DIR";

/// Errors reading or writing the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Cannot serialize config: {0}")]
    Serialize(String),
}

impl ConfigError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Parse { .. } => format!(
                "{self}\n\n\
                Hint: The file must be TOML with optional [llm] and [pipeline] sections."
            ),
            _ => self.to_string(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory of the file-backed table store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Rows read before planning, to get headers and a sample
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Leading report rows handed to the summarizer
    #[serde(default = "default_summary_sample_rows")]
    pub summary_sample_rows: usize,

    /// Language model backend
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".tabular-insight")
}

fn default_preview_rows() -> usize {
    10
}

fn default_summary_sample_rows() -> usize {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            preview_rows: default_preview_rows(),
            summary_sample_rows: default_summary_sample_rows(),
            llm: LlmConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read a TOML config file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Read `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Write the config as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// The data directory is replaced when set; the API key only fills a gap, so a
    /// key in the file wins over the environment.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(dir) = present(DATA_DIR_ENV_VAR) {
            self.data_dir = PathBuf::from(dir);
        }
        if !self.llm.has_api_key()
            && let Some(key) = API_KEY_ENV_VARS.iter().find_map(|name| present(*name))
        {
            self.llm.api_key = Some(key);
        }
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_llm(mut self, llm: LlmConfig) -> Self {
        self.llm = llm;
        self
    }

    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows.max(1);
        self
    }

    pub fn with_summary_sample_rows(mut self, rows: usize) -> Self {
        self.summary_sample_rows = rows;
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// LLM settings with the API key filled from the store when still missing
    pub async fn resolve_llm<S: TableStore + ?Sized>(&self, store: &S) -> StorageResult<LlmConfig> {
        let mut llm = self.llm.clone();
        if !llm.has_api_key()
            && let Some(key) = stored_api_key(store).await?
        {
            llm.api_key = Some(key);
        }
        Ok(llm)
    }
}

/// API key saved in the store's config area
pub async fn stored_api_key<S: TableStore + ?Sized>(store: &S) -> StorageResult<Option<String>> {
    Ok(match store.get_config(API_KEY_CONFIG_KEY).await? {
        Some(Value::String(key)) if !key.trim().is_empty() => Some(key),
        _ => None,
    })
}

/// Save the API key in the store's config area
pub async fn store_api_key<S: TableStore + ?Sized>(store: &S, key: &str) -> StorageResult<()> {
    store
        .put_config(API_KEY_CONFIG_KEY, Value::String(key.trim().to_string()))
        .await
}
