//! `tabular-insight`: turn a CSV file into normalized tables and report on them.
//!
//! ## Usage
//!
//! ```sh
//! tabular-insight config set-key "$GEMINI_API_KEY"
//! tabular-insight import sales.csv --fallback
//! tabular-insight tables list
//! tabular-insight tables show orders --limit 20
//! tabular-insight reports suggest
//! tabular-insight reports run --index 1
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tabular_insight::cli::commands::import::{ImportOptions, parse_delimiter};
use tabular_insight::cli::commands::reports::SuggestionSelector;
use tabular_insight::cli::commands::{CliContext, config, import, reports, schema, tables};
use tabular_insight::cli::{CliError, OutputFormat};
use tabular_insight::config::AppConfig;

#[derive(Parser, Debug)]
#[command(
    name = "tabular-insight",
    version,
    about = "Normalize CSV files into related tables and generate reports"
)]
struct Args {
    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Directory holding stored tables (overrides config and environment).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a CSV file, splitting it into tables when planning succeeds.
    Import {
        file: PathBuf,

        /// Store the file unchanged under this name when planning fails.
        #[arg(long)]
        table: Option<String>,

        /// Store the file unchanged under its file name when planning fails.
        #[arg(long)]
        fallback: bool,

        /// Store the file as one table without planning.
        #[arg(long)]
        flat: bool,

        /// Field delimiter, one character or "tab".
        #[arg(long)]
        delimiter: Option<String>,
    },

    /// Browse stored tables.
    #[command(subcommand)]
    Tables(TablesCommand),

    /// Inspect the schema of the last import.
    #[command(subcommand)]
    Schema(SchemaCommand),

    /// Suggest and run reports.
    #[command(subcommand)]
    Reports(ReportsCommand),

    /// Inspect settings and store the API key.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum TablesCommand {
    /// List stored tables.
    List,

    /// Show headline figures and leading rows of a table.
    Show {
        name: String,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Delete a table.
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum SchemaCommand {
    /// Show tables, keys and references.
    Show,
}

#[derive(Subcommand, Debug)]
enum ReportsCommand {
    /// Ask for report suggestions over the stored schema.
    Suggest {
        /// Also write the suggestions to this file.
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Generate a report from a suggestion.
    Run {
        /// 1-based suggestion number.
        #[arg(long, default_value_t = 1)]
        index: usize,

        /// Read suggestions from this file instead of the last `suggest` output.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Rows and chart points to print.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Show effective settings.
    Show,

    /// Save the API key in the data directory.
    SetKey { key: String },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "tabular_insight=debug"
    } else {
        "tabular_insight=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_context(args: &Args) -> Result<CliContext, CliError> {
    let mut config = AppConfig::load_or_default(args.config.as_deref())?.with_env();
    if let Some(dir) = &args.data_dir {
        config = config.with_data_dir(dir);
    }
    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    Ok(CliContext::new(config, format).with_config_path(args.config.clone()))
}

async fn run(args: Args) -> Result<(), CliError> {
    let ctx = load_context(&args)?;

    match args.command {
        Command::Import {
            file,
            table,
            fallback,
            flat,
            delimiter,
        } => {
            let options = ImportOptions {
                table,
                fallback,
                flat,
                delimiter: delimiter.as_deref().map(parse_delimiter).transpose()?,
            };
            import::handle_import(&ctx, &file, &options).await
        }
        Command::Tables(TablesCommand::List) => tables::handle_list(&ctx).await,
        Command::Tables(TablesCommand::Show { name, limit }) => {
            tables::handle_show(&ctx, &name, limit).await
        }
        Command::Tables(TablesCommand::Delete { name }) => tables::handle_delete(&ctx, &name).await,
        Command::Schema(SchemaCommand::Show) => schema::handle_schema(&ctx).await,
        Command::Reports(ReportsCommand::Suggest { save }) => {
            reports::handle_suggest(&ctx, save.as_deref()).await
        }
        Command::Reports(ReportsCommand::Run { index, file, limit }) => {
            let selector = match file {
                Some(path) => SuggestionSelector::File { path, index },
                None => SuggestionSelector::Index(index),
            };
            reports::handle_run(&ctx, selector, limit).await
        }
        Command::Config(ConfigCommand::Show) => config::handle_show(&ctx).await,
        Command::Config(ConfigCommand::SetKey { key }) => config::handle_set_key(&ctx, &key).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e.user_message());
        std::process::exit(e.exit_code());
    }
    Ok(())
}
