//! Normalization pipeline
//!
//! Turns a flat row set and a schema plan into stored, normalized tables:
//! - **Order**: tables are sorted so every referenced table comes first
//! - **Process**: each table is deduplicated on its natural key, numbered, and its
//!   foreign keys are replaced with the identifiers of the parent rows
//! - **Store**: every table is written as soon as it is done; the schema and the
//!   table list follow once the whole run succeeded
//!
//! # Example
//!
//! ```rust,ignore
//! use tabular_insight::pipeline::{PipelineConfig, PipelineExecutor};
//! use tabular_insight::storage::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let mut executor = PipelineExecutor::new(&store).with_config(PipelineConfig::new());
//! let report = executor.run(&rows, &plan).await?;
//!
//! println!("Pipeline completed in {}", report.duration_formatted());
//! ```

mod config;
mod error;
mod executor;
mod order;
mod processor;

pub use config::{PipelineConfig, UnresolvedFkPolicy};
pub use error::{PipelineError, PipelineResult};
pub use executor::{PipelineExecutor, PipelineReport, RunMode, TableReport};
pub use order::execution_order;
pub use processor::{ProcessedTable, TableStats, process_child_table, process_parent_table};
