//! Execution order of the tables in a schema plan
//!
//! Tables are processed parents first so that every foreign key can be resolved
//! against a lookup map built earlier in the same run. The order is a layered
//! topological sort: the first layer holds the tables without foreign keys, every
//! later layer holds the tables whose referenced tables are all done. Within a layer
//! tables keep their plan order, so a one-level plan yields all parents in plan
//! order followed by all children in plan order.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, warn};

use super::error::{PipelineError, PipelineResult};
use crate::models::SchemaPlan;

/// Compute the processing order of the tables in `plan`.
///
/// References to tables that are not in the plan and self references do not
/// constrain the order. A cycle between tables is rejected with
/// [`PipelineError::NotADag`] naming the tables on the cycle.
pub fn execution_order(plan: &SchemaPlan) -> PipelineResult<Vec<String>> {
    if plan.is_empty() {
        return Err(PipelineError::MissingSchema);
    }

    let dependencies = dependencies(plan);

    let mut done: HashSet<&str> = HashSet::new();
    let mut order: Vec<String> = Vec::with_capacity(plan.len());

    // Tables without any foreign key go first
    for (name, spec) in &plan.tables {
        if spec.is_parent() {
            done.insert(name.as_str());
            order.push(name.clone());
        }
    }

    let mut remaining: Vec<&str> = plan
        .tables
        .keys()
        .map(String::as_str)
        .filter(|name| !done.contains(name))
        .collect();

    while !remaining.is_empty() {
        let layer: Vec<&str> = remaining
            .iter()
            .copied()
            .filter(|name| dependencies[name].iter().all(|dep| done.contains(dep)))
            .collect();

        if layer.is_empty() {
            return Err(PipelineError::NotADag {
                tables: cycle_members(plan, &remaining, &dependencies),
            });
        }

        debug!(layer = ?layer, "Execution layer resolved");
        for name in &layer {
            done.insert(*name);
            order.push(name.to_string());
        }
        remaining.retain(|name| !layer.contains(name));
    }

    Ok(order)
}

/// Tables each table must wait for, restricted to other tables of the plan
fn dependencies(plan: &SchemaPlan) -> HashMap<&str, IndexSet<&str>> {
    plan.tables
        .iter()
        .map(|(name, spec)| {
            let mut deps = IndexSet::new();
            for (column, reference) in spec.foreign_key_refs() {
                if reference.table == *name {
                    debug!(table = %name, column = %column, "Ignoring self reference for ordering");
                    continue;
                }
                match plan.tables.get_key_value(reference.table.as_str()) {
                    Some((parent, _)) => {
                        deps.insert(parent.as_str());
                    }
                    None => warn!(
                        table = %name,
                        column = %column,
                        referenced = %reference.table,
                        "Foreign key references a table that is not in the plan"
                    ),
                }
            }
            (name.as_str(), deps)
        })
        .collect()
}

/// Tables that sit on a cycle among the unresolved ones, in plan order
fn cycle_members(
    plan: &SchemaPlan,
    remaining: &[&str],
    dependencies: &HashMap<&str, IndexSet<&str>>,
) -> Vec<String> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for &name in remaining {
        graph.add_node(name);
    }
    for &name in remaining {
        for &dep in &dependencies[name] {
            if graph.contains_node(dep) {
                graph.add_edge(dep, name, ());
            }
        }
    }

    let on_cycle: HashSet<&str> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .flatten()
        .collect();

    let members: Vec<String> = plan
        .tables
        .keys()
        .filter(|name| on_cycle.contains(name.as_str()))
        .cloned()
        .collect();
    if members.is_empty() {
        remaining.iter().map(|name| name.to_string()).collect()
    } else {
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableSpec;

    fn parent(columns: &[&str]) -> TableSpec {
        TableSpec::new(columns[0], columns).with_natural_key(&columns[1..])
    }

    #[test]
    fn test_one_level_plan_lists_parents_then_children() {
        let plan = SchemaPlan::new()
            .with_table(
                "orders",
                parent(&["order_id", "Order"]).with_foreign_key("customer_id", "customers.customer_id"),
            )
            .with_table("customers", parent(&["customer_id", "Customer"]))
            .with_table(
                "lines",
                parent(&["line_id", "Line"]).with_foreign_key("product_id", "products.product_id"),
            )
            .with_table("products", parent(&["product_id", "Product"]));

        assert_eq!(
            execution_order(&plan).unwrap(),
            vec!["customers", "products", "orders", "lines"]
        );
    }

    #[test]
    fn test_multi_level_chain() {
        let plan = SchemaPlan::new()
            .with_table(
                "lines",
                parent(&["line_id", "Line"]).with_foreign_key("order_id", "orders.order_id"),
            )
            .with_table(
                "orders",
                parent(&["order_id", "Order"]).with_foreign_key("customer_id", "customers.customer_id"),
            )
            .with_table("customers", parent(&["customer_id", "Customer"]));

        assert_eq!(
            execution_order(&plan).unwrap(),
            vec!["customers", "orders", "lines"]
        );
    }

    #[test]
    fn test_unknown_and_self_references_do_not_block() {
        let plan = SchemaPlan::new()
            .with_table(
                "employees",
                parent(&["employee_id", "Name"]).with_foreign_key("manager_id", "employees.employee_id"),
            )
            .with_table(
                "visits",
                parent(&["visit_id", "Visit"]).with_foreign_key("site_id", "sites.site_id"),
            )
            .with_table("teams", parent(&["team_id", "Team"]));

        assert_eq!(
            execution_order(&plan).unwrap(),
            vec!["teams", "employees", "visits"]
        );
    }

    #[test]
    fn test_cycle_is_rejected() {
        let plan = SchemaPlan::new()
            .with_table("root", parent(&["root_id", "Root"]))
            .with_table(
                "a",
                parent(&["a_id", "A"]).with_foreign_key("b_id", "b.b_id"),
            )
            .with_table(
                "b",
                parent(&["b_id", "B"]).with_foreign_key("a_id", "a.a_id"),
            )
            .with_table(
                "c",
                parent(&["c_id", "C"]).with_foreign_key("a_id", "a.a_id"),
            );

        match execution_order(&plan) {
            Err(PipelineError::NotADag { tables }) => assert_eq!(tables, vec!["a", "b"]),
            other => panic!("expected NotADag, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_plan() {
        assert!(matches!(
            execution_order(&SchemaPlan::new()),
            Err(PipelineError::MissingSchema)
        ));
    }
}
