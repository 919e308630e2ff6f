//! Structural validation of schema plans
//!
//! A plan returned by the schema planner is checked against the header row of the
//! input before any row is processed. Errors make the plan unusable; warnings are
//! tolerated at runtime and only logged.

use std::collections::HashSet;

use crate::models::SchemaPlan;
use crate::storage::StorageError;
use crate::storage::filesystem::validate_table_name;

/// Result of schema plan validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanValidation {
    /// Whether the plan can be executed
    pub is_valid: bool,
    /// Problems that reject the plan
    pub errors: Vec<PlanValidationError>,
    /// Non-fatal issues
    pub warnings: Vec<String>,
}

impl PlanValidation {
    /// Turn into a `Result`, keeping warnings on success
    pub fn into_result(self) -> Result<Vec<String>, Vec<PlanValidationError>> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(self.errors)
        }
    }
}

/// Types of plan validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanValidationError {
    /// The plan has no tables
    EmptyPlan,
    /// A table has an empty name
    EmptyTableName,
    /// A table name cannot be stored or referenced
    InvalidTableName { table: String, reason: String },
    /// A table has no natural key columns
    EmptyNaturalKey { table: String },
    /// A table has no primary key column
    EmptyPrimaryKey { table: String },
    /// A `columns` entry is neither an input header, the primary key, nor a foreign key column
    UnknownColumn { table: String, column: String },
    /// A natural key column is neither an input header nor a foreign key column
    UnknownNaturalKeyColumn { table: String, column: String },
}

impl std::fmt::Display for PlanValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanValidationError::EmptyPlan => write!(f, "Schema plan contains no tables"),
            PlanValidationError::EmptyTableName => {
                write!(f, "Schema plan contains a table with an empty name")
            }
            PlanValidationError::InvalidTableName { table, reason } => {
                write!(f, "Table name '{}' is not usable: {}", table, reason)
            }
            PlanValidationError::EmptyNaturalKey { table } => {
                write!(f, "Table '{}' has an empty natural_key_for_uniqueness", table)
            }
            PlanValidationError::EmptyPrimaryKey { table } => {
                write!(f, "Table '{}' has no primary_key", table)
            }
            PlanValidationError::UnknownColumn { table, column } => write!(
                f,
                "Table '{}' lists column '{}' which is not in the input file",
                table, column
            ),
            PlanValidationError::UnknownNaturalKeyColumn { table, column } => write!(
                f,
                "Table '{}' uses natural key column '{}' which is not in the input file",
                table, column
            ),
        }
    }
}

/// Validate a plan against the input header row
///
/// Checks that:
/// 1. The plan has at least one table and every table name is storable and referenceable
/// 2. Every table has a primary key and a non-empty natural key
/// 3. Every listed column is an input header, the table's primary key or one of its FK columns
/// 4. Every natural key column is an input header or one of the table's FK columns
///
/// References to tables outside the plan, malformed references, self references and
/// primary keys missing from `columns` are reported as warnings.
pub fn validate_plan(plan: &SchemaPlan, headers: &[String]) -> PlanValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if plan.is_empty() {
        errors.push(PlanValidationError::EmptyPlan);
    }

    let headers: HashSet<&str> = headers.iter().map(String::as_str).collect();

    for (name, spec) in &plan.tables {
        if name.trim().is_empty() {
            errors.push(PlanValidationError::EmptyTableName);
            continue;
        }

        if let Some(reason) = table_name_problem(name) {
            errors.push(PlanValidationError::InvalidTableName {
                table: name.clone(),
                reason,
            });
        }

        if spec.primary_key.trim().is_empty() {
            errors.push(PlanValidationError::EmptyPrimaryKey {
                table: name.clone(),
            });
        } else if !spec.columns.contains(&spec.primary_key) {
            warnings.push(format!(
                "Table '{}' does not list its primary key '{}' in columns",
                name, spec.primary_key
            ));
        }

        if spec.natural_key_for_uniqueness.is_empty() {
            errors.push(PlanValidationError::EmptyNaturalKey {
                table: name.clone(),
            });
        }

        for column in &spec.natural_key_for_uniqueness {
            if !headers.contains(column.as_str()) && !spec.is_foreign_key(column) {
                errors.push(PlanValidationError::UnknownNaturalKeyColumn {
                    table: name.clone(),
                    column: column.clone(),
                });
            }
        }

        for column in &spec.columns {
            let known = headers.contains(column.as_str())
                || *column == spec.primary_key
                || spec.is_foreign_key(column);
            if !known {
                errors.push(PlanValidationError::UnknownColumn {
                    table: name.clone(),
                    column: column.clone(),
                });
            }
        }

        for (column, reference) in spec.foreign_key_refs() {
            if !reference.is_well_formed() {
                warnings.push(format!(
                    "Table '{}' has a malformed foreign key reference '{}' on column '{}'",
                    name, spec.foreign_keys[column], column
                ));
            }
            if reference.table == *name {
                warnings.push(format!(
                    "Table '{}' references itself through column '{}'",
                    name, column
                ));
            } else if plan.table(&reference.table).is_none() {
                warnings.push(format!(
                    "Table '{}' references unknown table '{}' through column '{}'",
                    name, reference.table, column
                ));
            }
        }
    }

    PlanValidation {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

// Stored tables use the file store's name rules; foreign key references split on the first dot
fn table_name_problem(name: &str) -> Option<String> {
    match validate_table_name(name) {
        Err(StorageError::InvalidName { reason, .. }) => Some(reason),
        Err(other) => Some(other.to_string()),
        Ok(()) if name.contains('.') => {
            Some("name contains a dot, so foreign keys cannot reference it".to_string())
        }
        Ok(()) => None,
    }
}
