//! Schema plan types
//!
//! A [`SchemaPlan`] is the normalized relational layout proposed for a flat CSV file:
//! an ordered mapping of table name to [`TableSpec`]. On the wire it is the JSON
//! object `{"schema": {"<table>": {...}}}` returned by the schema planner.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Natural key text to generated identifier, for one processed table
pub type LookupMap = IndexMap<String, String>;

/// Lookup maps of every table processed so far in a pipeline run, keyed by table name
pub type LookupMaps = HashMap<String, LookupMap>;

/// Normalized schema plan: table name to table definition, in plan order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaPlan {
    /// Tables in the order the planner listed them
    #[serde(rename = "schema")]
    pub tables: IndexMap<String, TableSpec>,
}

impl SchemaPlan {
    /// Create an empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table (builder style)
    pub fn with_table(mut self, name: impl Into<String>, spec: TableSpec) -> Self {
        self.tables.insert(name.into(), spec);
        self
    }

    /// Parse a plan from a JSON value shaped like `{"schema": {...}}`
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Look up a table definition
    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.get(name)
    }

    /// Table names in plan order
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check whether the plan has no tables
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// One line per table, used for progress output and logs
    pub fn summary_lines(&self) -> Vec<String> {
        self.tables
            .iter()
            .map(|(name, spec)| {
                format!(
                    "Table '{}' (PK: {}, Natural Key: [{}], FKs: {})",
                    name,
                    spec.primary_key,
                    spec.natural_key_for_uniqueness.join(", "),
                    spec.foreign_keys.len()
                )
            })
            .collect()
    }
}

/// Definition of one normalized table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Every column the table's final rows may contain, in output order
    #[serde(default)]
    pub columns: Vec<String>,
    /// Column holding the generated identifier
    #[serde(default)]
    pub primary_key: String,
    /// Columns whose pipe-joined values form the deduplication key
    #[serde(default)]
    pub natural_key_for_uniqueness: Vec<String>,
    /// Local column to `"<parent_table>.<parent_column>"`
    #[serde(default)]
    pub foreign_keys: IndexMap<String, String>,
}

impl TableSpec {
    /// Create a table spec with the given columns and primary key
    pub fn new(primary_key: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            primary_key: primary_key.into(),
            natural_key_for_uniqueness: Vec::new(),
            foreign_keys: IndexMap::new(),
        }
    }

    /// Set the natural key columns
    pub fn with_natural_key(mut self, columns: &[&str]) -> Self {
        self.natural_key_for_uniqueness = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add a foreign key from `column` to `reference` (`"table.column"`)
    pub fn with_foreign_key(mut self, column: impl Into<String>, reference: impl Into<String>) -> Self {
        self.foreign_keys.insert(column.into(), reference.into());
        self
    }

    /// A table without foreign keys is a parent (root) table
    pub fn is_parent(&self) -> bool {
        self.foreign_keys.is_empty()
    }

    /// Foreign keys with their references parsed
    pub fn foreign_key_refs(&self) -> impl Iterator<Item = (&String, ForeignKeyRef)> {
        self.foreign_keys
            .iter()
            .map(|(column, reference)| (column, ForeignKeyRef::parse(reference)))
    }

    /// Check whether `column` is one of this table's foreign key columns
    pub fn is_foreign_key(&self, column: &str) -> bool {
        self.foreign_keys.contains_key(column)
    }
}

/// A parsed `"<parent_table>.<parent_column>"` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRef {
    /// Referenced table
    pub table: String,
    /// Referenced column, absent when the reference names only a table
    pub column: Option<String>,
}

impl ForeignKeyRef {
    /// Parse a reference string; the table is everything before the first dot
    pub fn parse(reference: &str) -> Self {
        match reference.split_once('.') {
            Some((table, column)) => Self {
                table: table.trim().to_string(),
                column: Some(column.trim().to_string()).filter(|c| !c.is_empty()),
            },
            None => Self {
                table: reference.trim().to_string(),
                column: None,
            },
        }
    }

    /// Whether the reference had the expected `table.column` shape
    pub fn is_well_formed(&self) -> bool {
        !self.table.is_empty() && self.column.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_deserializes_in_order() {
        let value = json!({
            "schema": {
                "orders": {
                    "columns": ["order_id", "customer_id", "amount"],
                    "primary_key": "order_id",
                    "natural_key_for_uniqueness": ["Order Number"],
                    "foreign_keys": {"customer_id": "customers.customer_id"}
                },
                "customers": {
                    "columns": ["customer_id", "Customer Name"],
                    "primary_key": "customer_id",
                    "natural_key_for_uniqueness": ["Customer Name"],
                    "foreign_keys": {}
                }
            }
        });

        let plan = SchemaPlan::from_value(value).unwrap();
        assert_eq!(plan.table_names(), vec!["orders", "customers"]);
        assert!(!plan.table("orders").unwrap().is_parent());
        assert!(plan.table("customers").unwrap().is_parent());
    }

    #[test]
    fn test_plan_missing_schema_key_is_an_error() {
        let result = SchemaPlan::from_value(json!({"tables": {}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_table_spec_defaults() {
        let spec: TableSpec = serde_json::from_value(json!({"columns": ["a"]})).unwrap();
        assert!(spec.natural_key_for_uniqueness.is_empty());
        assert!(spec.foreign_keys.is_empty());
        assert!(spec.is_parent());
    }

    #[test]
    fn test_foreign_key_ref_parse() {
        let r = ForeignKeyRef::parse("customers.customer_id");
        assert_eq!(r.table, "customers");
        assert_eq!(r.column.as_deref(), Some("customer_id"));
        assert!(r.is_well_formed());

        let r = ForeignKeyRef::parse("customers");
        assert_eq!(r.table, "customers");
        assert!(r.column.is_none());
        assert!(!r.is_well_formed());
    }

    #[test]
    fn test_summary_lines() {
        let plan = SchemaPlan::new().with_table(
            "customers",
            TableSpec::new("customer_id", &["customer_id", "name"]).with_natural_key(&["name"]),
        );
        let lines = plan.summary_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("customers"));
        assert!(lines[0].contains("Natural Key: [name]"));
    }
}
