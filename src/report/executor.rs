//! Report execution: load, join, aggregate, project
//!
//! A report reads one stored table, or a parent/child pair joined on one key. The
//! rows may then be grouped and aggregated, and are finally projected so every row
//! has exactly the same columns, with null standing in for missing values.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::chart::{ChartData, build_chart};
use super::error::{ReportError, ReportResult};
use crate::models::{
    Aggregation, AggregationMethod, JoinSpec, ReportSuggestion, Row, key_fragment, number_value,
    parse_float,
};
use crate::source::collect_headers;
use crate::storage::TableStore;

/// Uniform rows of an executed report with their chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    /// Column order shared by every row
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub chart: ChartData,
}

/// Execute a report suggestion against the stored tables.
pub async fn execute_report<S>(store: &S, suggestion: &ReportSuggestion) -> ReportResult<ReportData>
where
    S: TableStore + ?Sized,
{
    let query = &suggestion.query;
    let tables: IndexSet<&str> = query.tables.iter().map(String::as_str).collect();
    if tables.is_empty() {
        return Err(ReportError::NoTables);
    }

    // A single-table query reads that table as stored; any join on it is ignored
    let joined = match &query.join {
        _ if tables.len() == 1 => {
            if query.join.is_some() {
                debug!(table = %query.tables[0], "Ignoring join on single-table report");
            }
            store.get_table(&query.tables[0]).await?
        }
        Some(join) => {
            for table in [&join.parent_table, &join.child_table] {
                if !tables.contains(table.as_str()) {
                    return Err(ReportError::JoinTableNotInQuery {
                        table: table.clone(),
                    });
                }
            }
            let parent = store.get_table(&join.parent_table).await?;
            let child = if join.child_table == join.parent_table {
                parent.clone()
            } else {
                store.get_table(&join.child_table).await?
            };
            ensure_join_key(&parent, &join.parent_table, &join.parent_key)?;
            ensure_join_key(&child, &join.child_table, &join.child_key)?;
            join_tables(&parent, &child, join)
        }
        None => {
            return Err(ReportError::MissingJoin {
                tables: tables.iter().map(|t| t.to_string()).collect(),
            });
        }
    };
    debug!(rows = joined.len(), "Report rows loaded");

    let (rows, columns) = match &query.aggregation {
        Some(aggregation) => (
            aggregate(&joined, aggregation),
            vec![
                aggregation.group_by.clone(),
                aggregation.new_column_name.clone(),
            ],
        ),
        None => {
            let requested = query.columns.flatten();
            let columns = if requested.is_empty() {
                collect_headers(&joined)
            } else {
                requested
            };
            (joined, columns)
        }
    };

    let rows = project_uniform(&rows, &columns);
    let chart = build_chart(
        &rows,
        &columns,
        query.aggregation.as_ref(),
        &suggestion.chart_config.chart_type,
    );

    info!(
        title = %suggestion.title,
        rows = rows.len(),
        columns = columns.len(),
        "Report executed"
    );
    Ok(ReportData {
        columns,
        rows,
        chart,
    })
}

fn ensure_join_key(rows: &[Row], table: &str, key: &str) -> ReportResult<()> {
    if !rows.is_empty() && !rows.iter().any(|row| row.contains_key(key)) {
        return Err(ReportError::JoinKeyNotFound {
            table: table.to_string(),
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Join every child row with the parent row whose `parent_key` matches its `child_key`.
///
/// Keys compare by their text form, so `1` matches `"1"`. When several parent rows
/// share a key the last one wins. Parent fields override child fields of the same
/// name; child rows without a match keep only their own fields. Null or missing keys
/// never match.
pub fn join_tables(parent: &[Row], child: &[Row], join: &JoinSpec) -> Vec<Row> {
    let parents: IndexMap<String, &Row> = parent
        .iter()
        .filter_map(|row| join_key(row, &join.parent_key).map(|key| (key, row)))
        .collect();

    child
        .iter()
        .map(|row| {
            let mut merged = row.clone();
            if let Some(parent_row) = join_key(row, &join.child_key).and_then(|key| parents.get(&key)) {
                for (column, value) in parent_row.iter() {
                    merged.insert(column.clone(), value.clone());
                }
            }
            merged
        })
        .collect()
}

fn join_key(row: &Row, column: &str) -> Option<String> {
    match row.get(column) {
        None | Some(Value::Null) => None,
        Some(value) => Some(key_fragment(value)),
    }
}

/// Group rows by `aggregation.group_by` and aggregate one column per group.
///
/// Groups appear in the order they were first seen. Every output row holds exactly
/// the group value and the aggregated value. Null and missing group values form one
/// group labelled null, separate from the empty string.
pub fn aggregate(rows: &[Row], aggregation: &Aggregation) -> Vec<Row> {
    #[derive(Default)]
    struct Accumulator {
        sum: f64,
        count: u64,
    }

    let mut groups: IndexMap<Option<String>, (Value, Accumulator)> = IndexMap::new();

    for row in rows {
        let group_value = row.get(&aggregation.group_by).cloned().unwrap_or(Value::Null);
        let group_key = (!group_value.is_null()).then(|| key_fragment(&group_value));
        let (_, acc) = groups
            .entry(group_key)
            .or_insert_with(|| (group_value, Accumulator::default()));

        let value = row.get(&aggregation.column).and_then(parse_float);
        match aggregation.method {
            AggregationMethod::Sum => acc.sum += value.unwrap_or(0.0),
            AggregationMethod::Count => acc.count += 1,
            AggregationMethod::Avg => {
                if let Some(value) = value {
                    acc.sum += value;
                    acc.count += 1;
                }
            }
        }
    }

    groups
        .into_values()
        .map(|(group_value, acc)| {
            let result = match aggregation.method {
                AggregationMethod::Sum => acc.sum,
                AggregationMethod::Count => acc.count as f64,
                AggregationMethod::Avg if acc.count > 0 => acc.sum / acc.count as f64,
                AggregationMethod::Avg => 0.0,
            };
            let mut out = Row::new();
            out.insert(aggregation.group_by.clone(), group_value);
            out.insert(aggregation.new_column_name.clone(), number_value(result));
            out
        })
        .collect()
}

/// Project rows onto `columns`, filling missing values with null.
pub fn project_uniform(rows: &[Row], columns: &[String]) -> Vec<Row> {
    rows.iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| {
                    let value = row.get(column).cloned().unwrap_or(Value::Null);
                    (column.clone(), value)
                })
                .collect()
        })
        .collect()
}
