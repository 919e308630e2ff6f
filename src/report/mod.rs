//! Report execution
//!
//! Turns a [`ReportSuggestion`](crate::models::ReportSuggestion) into uniform rows and
//! chart data ([`execute_report`]), and adds a narrative summary on top
//! ([`ReportRunner`]). Only stored tables are read; the schema plan is not needed.

mod chart;
mod error;
mod executor;
mod runner;

pub use chart::{ChartData, build_chart};
pub use error::{ReportError, ReportResult};
pub use executor::{ReportData, aggregate, execute_report, join_tables, project_uniform};
pub use runner::{FALLBACK_SUMMARY, GeneratedReport, ReportRunner};
