//! Report execution tests over normalized tables

use serde_json::{Value, json};
use tabular_insight::models::{
    Aggregation, AggregationMethod, JoinSpec, ReportColumns, ReportQuery, ReportSuggestion, Row,
    SchemaPlan, TableSpec,
};
use tabular_insight::pipeline::PipelineExecutor;
use tabular_insight::report::{ReportError, execute_report};
use tabular_insight::source::{CsvRowSource, RowSource};
use tabular_insight::storage::{MemoryStore, TableStore};

const SALES_CSV: &str = "Order,Customer,Amount\n\
1,Alice,10\n\
2,Bob,20\n\
3,Alice,5.5\n\
4,Carol,n/a\n";

async fn normalized_store() -> MemoryStore {
    let plan = SchemaPlan::new()
        .with_table(
            "customers",
            TableSpec::new("customer_id", &["customer_id", "Customer"]).with_natural_key(&["Customer"]),
        )
        .with_table(
            "orders",
            TableSpec::new("order_id", &["order_id", "Order", "Amount", "customer_id"])
                .with_natural_key(&["Order"])
                .with_foreign_key("customer_id", "customers.customer_id"),
        );
    let rows = CsvRowSource::from_bytes("sales", SALES_CSV).read_all().unwrap();
    let store = MemoryStore::new();
    PipelineExecutor::new(&store).run(&rows, &plan).await.unwrap();
    store
}

fn customer_join() -> JoinSpec {
    JoinSpec::new("customers", "customer_id", "orders", "customer_id")
}

fn as_f64(row: &Row, column: &str) -> Option<f64> {
    row.get(column).and_then(Value::as_f64)
}

mod join_tests {
    use super::*;

    #[tokio::test]
    async fn test_sum_per_customer_over_join() {
        let store = normalized_store().await;
        let query = ReportQuery::joined(customer_join(), ReportColumns::default()).with_aggregation(
            Aggregation::new("Customer", "Amount", AggregationMethod::Sum, "Revenue"),
        );
        let suggestion = ReportSuggestion::new("Revenue by customer", query).with_chart_type("bar");

        let data = execute_report(&store, &suggestion).await.unwrap();
        assert_eq!(data.columns, vec!["Customer", "Revenue"]);
        let totals: Vec<(&Value, Option<f64>)> = data
            .rows
            .iter()
            .map(|r| (&r["Customer"], as_f64(r, "Revenue")))
            .collect();
        assert_eq!(
            totals,
            vec![
                (&json!("Alice"), Some(15.5)),
                (&json!("Bob"), Some(20.0)),
                (&json!("Carol"), Some(0.0)),
            ]
        );

        assert_eq!(data.chart.chart_type, "bar");
        assert_eq!(data.chart.labels, vec![json!("Alice"), json!("Bob"), json!("Carol")]);
        assert_eq!(data.chart.data, vec![Some(15.5), Some(20.0), Some(0.0)]);
    }

    #[tokio::test]
    async fn test_average_skips_unparseable_values() {
        let store = normalized_store().await;
        let query = ReportQuery::joined(customer_join(), ReportColumns::default()).with_aggregation(
            Aggregation::new("Customer", "Amount", AggregationMethod::Avg, "Average"),
        );
        let data = execute_report(&store, &ReportSuggestion::new("Average order", query))
            .await
            .unwrap();

        let averages: Vec<Option<f64>> = data.rows.iter().map(|r| as_f64(r, "Average")).collect();
        assert_eq!(averages, vec![Some(7.75), Some(20.0), Some(0.0)]);
    }

    #[tokio::test]
    async fn test_joined_rows_carry_parent_fields() {
        let store = normalized_store().await;
        let query = ReportQuery::joined(
            customer_join(),
            ReportColumns::List(vec!["Order".to_string(), "Customer".to_string()]),
        );
        let data = execute_report(&store, &ReportSuggestion::new("Orders", query))
            .await
            .unwrap();

        assert_eq!(data.rows.len(), 4);
        assert_eq!(data.rows[1]["Customer"], json!("Bob"));
        assert_eq!(data.rows[1].len(), 2);
    }
}

mod single_table_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_columns_become_null() {
        let store = normalized_store().await;
        let suggestion =
            ReportSuggestion::new("Orders", ReportQuery::single("orders", &["Order", "Discount"]));

        let data = execute_report(&store, &suggestion).await.unwrap();
        assert_eq!(data.columns, vec!["Order", "Discount"]);
        assert!(data.rows.iter().all(|r| r["Discount"].is_null()));
        assert_eq!(data.chart.len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let store = normalized_store().await;
        let suggestion = ReportSuggestion::new("Missing", ReportQuery::single("invoices", &["x"]));

        let result = execute_report(&store, &suggestion).await;
        assert!(matches!(result, Err(ReportError::TableNotFound(ref t)) if t == "invoices"));
    }

    #[tokio::test]
    async fn test_deleted_table_is_not_reportable() {
        let store = normalized_store().await;
        store.delete_table("orders").await.unwrap();

        let suggestion = ReportSuggestion::new("Orders", ReportQuery::single("orders", &["Order"]));
        assert!(execute_report(&store, &suggestion).await.is_err());
        assert_eq!(store.list_tables().await.unwrap(), vec!["customers"]);
    }
}
