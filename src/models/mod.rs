//! Data model shared by the pipeline, the planner and the report executor

pub mod report;
pub mod schema;
pub mod value;

pub use report::{
    Aggregation, AggregationMethod, ChartConfig, JoinSpec, ReportColumns, ReportQuery,
    ReportSuggestion,
};
pub use schema::{ForeignKeyRef, LookupMap, LookupMaps, SchemaPlan, TableSpec};
pub use value::{KEY_SEPARATOR, Row, key_fragment, natural_key, number_value, parse_float};
