//! Structural checks for report suggestions
//!
//! Suggestions come from the model and may name tables that do not exist or combine
//! tables without saying how to join them. Those are dropped before they reach a user.

use std::collections::HashSet;

use crate::models::{ReportSuggestion, SchemaPlan};

/// Problems that make a suggestion unusable; empty when it is structurally sound
pub fn suggestion_problems(suggestion: &ReportSuggestion, plan: &SchemaPlan) -> Vec<String> {
    let mut problems = Vec::new();
    let query = &suggestion.query;

    if suggestion.title.trim().is_empty() {
        problems.push("title is empty".to_string());
    }

    if query.tables.is_empty() {
        problems.push("query names no tables".to_string());
    }

    for table in &query.tables {
        if plan.table(table).is_none() {
            problems.push(format!("table '{}' is not in the schema", table));
        }
    }

    // A join only matters when the query combines distinct tables; the executor ignores it otherwise
    let distinct: HashSet<&String> = query.tables.iter().collect();
    match &query.join {
        _ if distinct.len() <= 1 => {}
        None => {
            problems.push("query names several tables but has no join".to_string());
        }
        Some(join) => {
            for table in [&join.parent_table, &join.child_table] {
                if !query.tables.contains(table) {
                    problems.push(format!("join table '{}' is not in the query", table));
                }
            }
            if join.parent_key.trim().is_empty() || join.child_key.trim().is_empty() {
                problems.push("join key is empty".to_string());
            }
        }
    }

    if let Some(aggregation) = &query.aggregation
        && (aggregation.group_by.trim().is_empty() || aggregation.new_column_name.trim().is_empty())
    {
        problems.push("aggregation needs groupBy and newColumnName".to_string());
    }

    problems
}
