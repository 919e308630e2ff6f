//! Report suggestion types
//!
//! A [`ReportSuggestion`] is produced by the report planner from the stored schema and
//! consumed by the report executor. The JSON shape is:
//!
//! ```json
//! {
//!   "title": "Revenue by customer",
//!   "description": "Total order value per customer",
//!   "query": {
//!     "tables": ["orders", "customers"],
//!     "columns": {"customers": ["Customer Name"], "orders": ["amount"]},
//!     "join": {"parent_table": "customers", "parent_key": "customer_id",
//!              "child_table": "orders", "child_key": "customer_id"},
//!     "aggregation": {"groupBy": "Customer Name", "column": "amount",
//!                     "method": "SUM", "newColumnName": "total"}
//!   },
//!   "chart_config": {"type": "bar"}
//! }
//! ```

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A report proposed by the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSuggestion {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub query: ReportQuery,
    #[serde(default)]
    pub chart_config: ChartConfig,
}

impl ReportSuggestion {
    /// Create a suggestion for the given query
    pub fn new(title: impl Into<String>, query: ReportQuery) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            query,
            chart_config: ChartConfig::default(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the chart type
    pub fn with_chart_type(mut self, chart_type: impl Into<String>) -> Self {
        self.chart_config.chart_type = chart_type.into();
        self
    }
}

/// Tables, columns, join and aggregation of a report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub columns: ReportColumns,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<JoinSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
}

impl ReportQuery {
    /// Query over a single table
    pub fn single(table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            tables: vec![table.into()],
            columns: ReportColumns::List(columns.iter().map(|c| c.to_string()).collect()),
            join: None,
            aggregation: None,
        }
    }

    /// Query over a parent/child pair joined by `join`
    pub fn joined(join: JoinSpec, columns: ReportColumns) -> Self {
        Self {
            tables: vec![join.child_table.clone(), join.parent_table.clone()],
            columns,
            join: Some(join),
            aggregation: None,
        }
    }

    /// Set the aggregation
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }
}

/// Requested output columns
///
/// Planners return either a flat list or a mapping of table name to column list;
/// both flatten to one ordered list without duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportColumns {
    List(Vec<String>),
    PerTable(IndexMap<String, Vec<String>>),
}

impl Default for ReportColumns {
    fn default() -> Self {
        ReportColumns::List(Vec::new())
    }
}

impl ReportColumns {
    /// Flattened, de-duplicated column names in request order
    pub fn flatten(&self) -> Vec<String> {
        let set: IndexSet<&String> = match self {
            ReportColumns::List(columns) => columns.iter().collect(),
            ReportColumns::PerTable(map) => map.values().flatten().collect(),
        };
        set.into_iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ReportColumns::List(columns) => columns.is_empty(),
            ReportColumns::PerTable(map) => map.values().all(|c| c.is_empty()),
        }
    }
}

/// Parent/child join description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub parent_table: String,
    pub parent_key: String,
    pub child_table: String,
    pub child_key: String,
}

impl JoinSpec {
    pub fn new(
        parent_table: impl Into<String>,
        parent_key: impl Into<String>,
        child_table: impl Into<String>,
        child_key: impl Into<String>,
    ) -> Self {
        Self {
            parent_table: parent_table.into(),
            parent_key: parent_key.into(),
            child_table: child_table.into(),
            child_key: child_key.into(),
        }
    }
}

/// Group-by aggregation over one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    #[serde(rename = "groupBy", alias = "group_by")]
    pub group_by: String,
    pub column: String,
    pub method: AggregationMethod,
    #[serde(rename = "newColumnName", alias = "new_column_name")]
    pub new_column_name: String,
}

impl Aggregation {
    pub fn new(
        group_by: impl Into<String>,
        column: impl Into<String>,
        method: AggregationMethod,
        new_column_name: impl Into<String>,
    ) -> Self {
        Self {
            group_by: group_by.into(),
            column: column.into(),
            method,
            new_column_name: new_column_name.into(),
        }
    }
}

/// Aggregation method, parsed case-insensitively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AggregationMethod {
    Sum,
    Count,
    Avg,
}

impl AggregationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::Sum => "SUM",
            AggregationMethod::Count => "COUNT",
            AggregationMethod::Avg => "AVG",
        }
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for AggregationMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUM" => Ok(AggregationMethod::Sum),
            "COUNT" => Ok(AggregationMethod::Count),
            "AVG" | "AVERAGE" | "MEAN" => Ok(AggregationMethod::Avg),
            _ => Err(format!(
                "unknown aggregation method '{}', expected SUM, COUNT or AVG",
                value
            )),
        }
    }
}

impl From<AggregationMethod> for String {
    fn from(method: AggregationMethod) -> Self {
        method.as_str().to_string()
    }
}

/// Chart rendering hint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(rename = "type", default = "default_chart_type")]
    pub chart_type: String,
}

fn default_chart_type() -> String {
    "bar".to_string()
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            chart_type: default_chart_type(),
        }
    }
}
