//! Validation functionality
//!
//! Provides structural validation for model-authored inputs:
//! - Schema plans, checked against the input header row
//! - Report suggestions, checked against the stored schema plan

pub mod plan;
pub mod report;

pub use plan::{PlanValidation, PlanValidationError, validate_plan};
pub use report::suggestion_problems;
