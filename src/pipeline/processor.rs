//! Table processing: deduplication, identifier generation and foreign key resolution
//!
//! Both variants deduplicate on the table's natural key (first row wins, input order
//! kept) and number the surviving rows `<table>_1`, `<table>_2`, ... in the order
//! their keys were first seen. The child variant first replaces every foreign key
//! value with the identifier of the matching parent row, then deduplicates the
//! enriched rows, so composite natural keys may include resolved foreign keys.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::config::UnresolvedFkPolicy;
use super::error::{PipelineError, PipelineResult};
use crate::models::{
    ForeignKeyRef, KEY_SEPARATOR, LookupMap, LookupMaps, Row, SchemaPlan, TableSpec, key_fragment,
    natural_key,
};

// Bounds natural key recursion through chains of parent tables
const MAX_REFERENCE_DEPTH: usize = 16;

/// Counters collected while processing one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableStats {
    /// Rows handed to the processor
    pub input_rows: usize,
    /// Rows left after deduplication
    pub unique_rows: usize,
    /// Foreign key cells replaced by a parent identifier
    pub resolved_fks: usize,
    /// Foreign key cells whose parent row was not found
    pub unresolved_fks: usize,
}

/// Output of processing one table
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedTable {
    pub name: String,
    /// Final rows, projected to the table's columns
    pub rows: Vec<Row>,
    /// Natural key to generated identifier, for tables that reference this one
    pub lookup: LookupMap,
    pub stats: TableStats,
}

/// Process a table without foreign keys.
pub fn process_parent_table(
    name: &str,
    spec: &TableSpec,
    rows: &[Row],
) -> PipelineResult<ProcessedTable> {
    check_spec(name, spec)?;

    let unique = dedup(rows.iter(), spec, |row| row.clone());
    Ok(finish(name, spec, rows.len(), unique, 0, 0))
}

/// Process a table with foreign keys against the lookup maps of the tables done so far.
///
/// A foreign key resolves when the row's values at the parent's natural key columns
/// form a key present in the parent's lookup map. If the parent's own natural key
/// includes one of its foreign keys, that part is resolved the same way, so the key
/// matches the one built when the parent was processed. Unresolved cells follow
/// `policy`; they never drop the row.
pub fn process_child_table(
    name: &str,
    spec: &TableSpec,
    rows: &[Row],
    lookups: &LookupMaps,
    plan: &SchemaPlan,
    policy: UnresolvedFkPolicy,
) -> PipelineResult<ProcessedTable> {
    check_spec(name, spec)?;

    let references: Vec<(&String, ForeignKeyRef)> = spec.foreign_key_refs().collect();
    let resolver = Resolver {
        plan,
        lookups,
        policy,
    };

    let mut resolved = 0;
    let mut unresolved: IndexMap<&str, (usize, &'static str)> = IndexMap::new();

    let enriched: Vec<Row> = rows
        .iter()
        .map(|row| {
            let mut enriched = row.clone();
            for (column, reference) in &references {
                let outcome = if reference.table == name {
                    Err("self reference")
                } else {
                    resolver.resolve(row, &reference.table, 0)
                };
                match outcome {
                    Ok(id) => {
                        enriched.insert(column.to_string(), Value::String(id));
                        resolved += 1;
                    }
                    Err(reason) => {
                        let entry = unresolved.entry(column.as_str()).or_insert((0, reason));
                        entry.0 += 1;
                        if policy == UnresolvedFkPolicy::Null {
                            enriched.insert(column.to_string(), Value::Null);
                        }
                    }
                }
            }
            enriched
        })
        .collect();

    for (column, (count, reason)) in &unresolved {
        warn!(
            table = %name,
            column = %column,
            rows = count,
            reason = %reason,
            policy = %policy,
            "Unresolved foreign keys"
        );
    }
    let unresolved_total: usize = unresolved.values().map(|(count, _)| count).sum();

    let unique = dedup(enriched.into_iter(), spec, |row| row);
    Ok(finish(name, spec, rows.len(), unique, resolved, unresolved_total))
}

fn check_spec(name: &str, spec: &TableSpec) -> PipelineResult<()> {
    if spec.natural_key_for_uniqueness.is_empty() {
        return Err(PipelineError::invalid_table(
            name,
            "natural_key_for_uniqueness is empty",
        ));
    }
    if spec.primary_key.trim().is_empty() {
        return Err(PipelineError::invalid_table(name, "primary_key is empty"));
    }
    Ok(())
}

/// First row per natural key, in first-seen order
fn dedup<R>(
    rows: impl Iterator<Item = R>,
    spec: &TableSpec,
    into_row: impl Fn(R) -> Row,
) -> IndexMap<String, Row>
where
    R: std::borrow::Borrow<Row>,
{
    let mut unique: IndexMap<String, Row> = IndexMap::new();
    for row in rows {
        let key = natural_key(row.borrow(), &spec.natural_key_for_uniqueness);
        if !unique.contains_key(&key) {
            unique.insert(key, into_row(row));
        }
    }
    unique
}

fn finish(
    name: &str,
    spec: &TableSpec,
    input_rows: usize,
    unique: IndexMap<String, Row>,
    resolved_fks: usize,
    unresolved_fks: usize,
) -> ProcessedTable {
    let mut lookup = LookupMap::with_capacity(unique.len());
    let mut rows = Vec::with_capacity(unique.len());

    for (index, (key, row)) in unique.into_iter().enumerate() {
        let id = format!("{}_{}", name, index + 1);
        rows.push(project(&row, spec, &id));
        lookup.insert(key, id);
    }

    let stats = TableStats {
        input_rows,
        unique_rows: rows.len(),
        resolved_fks,
        unresolved_fks,
    };
    debug!(
        table = %name,
        rows = input_rows,
        unique = stats.unique_rows,
        "Table processed"
    );

    ProcessedTable {
        name: name.to_string(),
        rows,
        lookup,
        stats,
    }
}

/// Keep only the table's columns; the primary key holds the generated identifier
fn project(row: &Row, spec: &TableSpec, id: &str) -> Row {
    let mut out = Row::new();
    for column in &spec.columns {
        if *column == spec.primary_key {
            out.insert(column.clone(), Value::String(id.to_string()));
        } else if let Some(value) = row.get(column) {
            out.insert(column.clone(), value.clone());
        }
    }
    out
}

struct Resolver<'a> {
    plan: &'a SchemaPlan,
    lookups: &'a LookupMaps,
    policy: UnresolvedFkPolicy,
}

impl Resolver<'_> {
    /// Identifier of the `table` row matching `row`
    fn resolve(&self, row: &Row, table: &str, depth: usize) -> Result<String, &'static str> {
        let lookup = self
            .lookups
            .get(table)
            .ok_or("parent table has no lookup map")?;
        let spec = self.plan.table(table).ok_or("parent table is not in the plan")?;
        let key = self.reference_key(row, table, spec, depth);
        lookup
            .get(&key)
            .cloned()
            .ok_or("no parent row with a matching natural key")
    }

    /// Natural key of `table` as it was built when that table was processed
    fn reference_key(&self, row: &Row, table: &str, spec: &TableSpec, depth: usize) -> String {
        spec.natural_key_for_uniqueness
            .iter()
            .map(|column| {
                let raw = || row.get(column).map(key_fragment).unwrap_or_default();
                let Some(reference) = spec.foreign_keys.get(column) else {
                    return raw();
                };
                let reference = ForeignKeyRef::parse(reference);
                if reference.table == table || depth >= MAX_REFERENCE_DEPTH {
                    return self.unresolved_fragment(raw());
                }
                match self.resolve(row, &reference.table, depth + 1) {
                    Ok(id) => id,
                    Err(_) => self.unresolved_fragment(raw()),
                }
            })
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR)
    }

    fn unresolved_fragment(&self, raw: String) -> String {
        match self.policy {
            UnresolvedFkPolicy::Null => String::new(),
            UnresolvedFkPolicy::KeepRaw => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn customers() -> TableSpec {
        TableSpec::new("customer_id", &["customer_id", "Customer"]).with_natural_key(&["Customer"])
    }

    fn orders() -> TableSpec {
        TableSpec::new("order_id", &["order_id", "Order", "customer_id"])
            .with_natural_key(&["Order"])
            .with_foreign_key("customer_id", "customers.customer_id")
    }

    fn input() -> Vec<Row> {
        vec![
            row(json!({"Order": 1, "Customer": "A", "Amount": 10})),
            row(json!({"Order": 2, "Customer": "B", "Amount": 20})),
            row(json!({"Order": 3, "Customer": "A", "Amount": 30})),
        ]
    }

    #[test]
    fn test_parent_dedup_keeps_first_row() {
        let spec = TableSpec::new("customer_id", &["customer_id", "Customer", "Amount"])
            .with_natural_key(&["Customer"]);
        let table = process_parent_table("customers", &spec, &input()).unwrap();

        assert_eq!(
            table.rows,
            vec![
                row(json!({"customer_id": "customers_1", "Customer": "A", "Amount": 10})),
                row(json!({"customer_id": "customers_2", "Customer": "B", "Amount": 20})),
            ]
        );
        assert_eq!(table.lookup.get("A").map(String::as_str), Some("customers_1"));
        assert_eq!(table.lookup.get("B").map(String::as_str), Some("customers_2"));
        assert_eq!(table.stats.input_rows, 3);
        assert_eq!(table.stats.unique_rows, 2);
    }

    #[test]
    fn test_composite_natural_key() {
        let spec = TableSpec::new("id", &["id", "City", "Zip"]).with_natural_key(&["City", "Zip"]);
        let rows = vec![
            row(json!({"City": "Oslo", "Zip": 150})),
            row(json!({"City": "Oslo", "Zip": "150"})),
            row(json!({"City": "Oslo", "Zip": null})),
        ];
        let table = process_parent_table("places", &spec, &rows).unwrap();

        let keys: Vec<&String> = table.lookup.keys().collect();
        assert_eq!(keys, vec!["Oslo|150", "Oslo|"]);
    }

    #[test]
    fn test_missing_columns_are_omitted() {
        let spec = TableSpec::new("id", &["id", "Name", "Phone"]).with_natural_key(&["Name"]);
        let table = process_parent_table("people", &spec, &[row(json!({"Name": "Ada"}))]).unwrap();
        assert_eq!(table.rows[0], row(json!({"id": "people_1", "Name": "Ada"})));
    }

    #[test]
    fn test_empty_natural_key_is_rejected() {
        let spec = TableSpec::new("id", &["id"]);
        let result = process_parent_table("things", &spec, &input());
        assert!(matches!(
            result,
            Err(PipelineError::InvalidTableSpec { ref table, .. }) if table == "things"
        ));
    }

    #[test]
    fn test_child_resolves_foreign_keys() {
        let plan = SchemaPlan::new()
            .with_table("customers", customers())
            .with_table("orders", orders());
        let parent = process_parent_table("customers", &customers(), &input()).unwrap();
        let mut lookups = LookupMaps::new();
        lookups.insert("customers".to_string(), parent.lookup);

        let table = process_child_table(
            "orders",
            &orders(),
            &input(),
            &lookups,
            &plan,
            UnresolvedFkPolicy::Null,
        )
        .unwrap();

        let fks: Vec<&Value> = table.rows.iter().map(|r| &r["customer_id"]).collect();
        assert_eq!(
            fks,
            vec![&json!("customers_1"), &json!("customers_2"), &json!("customers_1")]
        );
        assert_eq!(table.stats.resolved_fks, 3);
        assert_eq!(table.stats.unresolved_fks, 0);
        assert_eq!(table.rows[0]["order_id"], json!("orders_1"));
    }

    #[test]
    fn test_unresolved_policy() {
        let plan = SchemaPlan::new()
            .with_table("customers", customers())
            .with_table("orders", orders());
        let rows = vec![row(json!({"Order": 1, "Customer": "A", "customer_id": "C-9"}))];

        let nulled = process_child_table(
            "orders",
            &orders(),
            &rows,
            &LookupMaps::new(),
            &plan,
            UnresolvedFkPolicy::Null,
        )
        .unwrap();
        assert_eq!(nulled.rows[0]["customer_id"], Value::Null);
        assert_eq!(nulled.stats.unresolved_fks, 1);

        let kept = process_child_table(
            "orders",
            &orders(),
            &rows,
            &LookupMaps::new(),
            &plan,
            UnresolvedFkPolicy::KeepRaw,
        )
        .unwrap();
        assert_eq!(kept.rows[0]["customer_id"], json!("C-9"));
    }

    #[test]
    fn test_dedup_runs_on_enriched_rows() {
        // Same order number under two customers: the resolved key tells them apart
        let spec = TableSpec::new("order_id", &["order_id", "Order", "customer_id"])
            .with_natural_key(&["Order", "customer_id"])
            .with_foreign_key("customer_id", "customers.customer_id");
        let plan = SchemaPlan::new()
            .with_table("customers", customers())
            .with_table("orders", spec.clone());
        let rows = vec![
            row(json!({"Order": 1, "Customer": "A", "customer_id": "x"})),
            row(json!({"Order": 1, "Customer": "B", "customer_id": "x"})),
            row(json!({"Order": 1, "Customer": "A", "customer_id": "y"})),
        ];
        let parent = process_parent_table("customers", &customers(), &rows).unwrap();
        let mut lookups = LookupMaps::new();
        lookups.insert("customers".to_string(), parent.lookup);

        let table = process_child_table(
            "orders",
            &spec,
            &rows,
            &lookups,
            &plan,
            UnresolvedFkPolicy::Null,
        )
        .unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.lookup.keys().collect::<Vec<_>>(),
            vec!["1|customers_1", "1|customers_2"]
        );
    }

    #[test]
    fn test_parent_natural_key_through_foreign_key() {
        // lines -> orders, where the order key includes its customer
        let orders_spec = TableSpec::new("order_id", &["order_id", "Order", "customer_id"])
            .with_natural_key(&["Order", "customer_id"])
            .with_foreign_key("customer_id", "customers.customer_id");
        let lines_spec = TableSpec::new("line_id", &["line_id", "Sku", "order_id"])
            .with_natural_key(&["Sku", "order_id"])
            .with_foreign_key("order_id", "orders.order_id");
        let plan = SchemaPlan::new()
            .with_table("customers", customers())
            .with_table("orders", orders_spec.clone())
            .with_table("lines", lines_spec.clone());
        let rows = vec![
            row(json!({"Order": 1, "Customer": "A", "Sku": "p1"})),
            row(json!({"Order": 1, "Customer": "B", "Sku": "p1"})),
        ];

        let mut lookups = LookupMaps::new();
        let customers = process_parent_table("customers", &customers(), &rows).unwrap();
        lookups.insert("customers".to_string(), customers.lookup);
        let orders = process_child_table(
            "orders",
            &orders_spec,
            &rows,
            &lookups,
            &plan,
            UnresolvedFkPolicy::Null,
        )
        .unwrap();
        lookups.insert("orders".to_string(), orders.lookup);

        let lines = process_child_table(
            "lines",
            &lines_spec,
            &rows,
            &lookups,
            &plan,
            UnresolvedFkPolicy::Null,
        )
        .unwrap();

        assert_eq!(lines.stats.resolved_fks, 2);
        assert_eq!(lines.rows[0]["order_id"], json!("orders_1"));
        assert_eq!(lines.rows[1]["order_id"], json!("orders_2"));
    }
}
