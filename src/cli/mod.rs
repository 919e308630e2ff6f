//! Command-line front end of the `tabular-insight` binary

pub mod commands;
pub mod error;
pub mod output;

pub use error::CliError;
pub use output::{OutputFormat, StderrProgress};
