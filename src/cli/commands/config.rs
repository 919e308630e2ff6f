//! Configuration commands

use serde::Serialize;

use crate::cli::commands::CliContext;
use crate::cli::error::CliError;
use crate::config::{store_api_key, stored_api_key};

#[derive(Serialize)]
struct ConfigView {
    config_file: Option<String>,
    data_dir: String,
    model: String,
    api_key: String,
    preview_rows: usize,
    summary_sample_rows: usize,
    unresolved_fk_policy: String,
}

/// Show only the last four characters of a key
pub fn redact(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

/// Handle `config set-key`: save the API key in the data directory
pub async fn handle_set_key(ctx: &CliContext, key: &str) -> Result<(), CliError> {
    if key.trim().is_empty() {
        return Err(CliError::InvalidArgument("API key must not be empty".to_string()));
    }
    store_api_key(&ctx.store(), key).await?;
    ctx.emit(&serde_json::json!({ "saved": true }), || {
        format!("API key saved in {}\n", ctx.config.data_dir.display())
    })
}

/// Handle `config show`
pub async fn handle_show(ctx: &CliContext) -> Result<(), CliError> {
    let store = ctx.store();
    let api_key = match ctx.config.llm.api_key.as_deref() {
        Some(key) => redact(key),
        None => match stored_api_key(&store).await? {
            Some(key) => format!("{} (stored)", redact(&key)),
            None => "not set".to_string(),
        },
    };

    let view = ConfigView {
        config_file: ctx.config_path.as_ref().map(|p| p.display().to_string()),
        data_dir: ctx.config.data_dir.display().to_string(),
        model: ctx.config.llm.model.clone(),
        api_key,
        preview_rows: ctx.config.preview_rows,
        summary_sample_rows: ctx.config.summary_sample_rows,
        unresolved_fk_policy: ctx.config.pipeline.unresolved_fk_policy.to_string(),
    };

    ctx.emit(&view, || {
        format!(
            "Config file:          {}\n\
             Data directory:       {}\n\
             Model:                {}\n\
             API key:              {}\n\
             Preview rows:         {}\n\
             Summary sample rows:  {}\n\
             Unresolved FK policy: {}\n",
            view.config_file.as_deref().unwrap_or("(defaults)"),
            view.data_dir,
            view.model,
            view.api_key,
            view.preview_rows,
            view.summary_sample_rows,
            view.unresolved_fk_policy
        )
    })
}
