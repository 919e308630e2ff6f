//! Pipeline executor for normalizing a flat row set into stored tables

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::config::PipelineConfig;
use super::error::{PipelineError, PipelineResult};
use super::order::execution_order;
use super::processor::{ProcessedTable, TableStats, process_child_table, process_parent_table};
use crate::models::{LookupMaps, Row, SchemaPlan};
use crate::progress::{NOOP_PROGRESS, ProgressSink};
use crate::source::collect_headers;
use crate::storage::TableStore;
use crate::validation::validate_plan;

/// How the rows of a run were stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Split into the tables of a schema plan
    Normalized,
    /// Stored unchanged as one table
    Flat,
}

/// Statistics of one stored table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    pub name: String,
    #[serde(flatten)]
    pub stats: TableStats,
}

/// Report from a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Run ID
    pub run_id: Uuid,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    /// Tables in processing order
    pub execution_order: Vec<String>,
    /// Stored tables, in processing order
    pub tables: Vec<TableReport>,
    /// Tables in the execution order that had no definition
    pub skipped_tables: Vec<String>,
    /// Plan warnings tolerated during the run
    pub warnings: Vec<String>,
    /// Last stored table, the one a viewer should show first
    pub selected_table: Option<String>,
    /// Total duration in milliseconds
    pub duration_ms: u64,
}

impl PipelineReport {
    /// Get formatted duration
    pub fn duration_formatted(&self) -> String {
        if self.duration_ms < 1000 {
            return format!("{}ms", self.duration_ms);
        }
        let secs = self.duration_ms / 1000;
        let mins = secs / 60;
        let remaining_secs = secs % 60;

        if mins > 0 {
            format!("{}m {}s", mins, remaining_secs)
        } else {
            format!("{}s", secs)
        }
    }

    /// Rows written across all tables
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.stats.unique_rows).sum()
    }

    /// Statistics of one stored table
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Runs schema plans against a table store.
///
/// `run` takes `&mut self`, so one executor never runs two pipelines at once.
pub struct PipelineExecutor<'a, S: TableStore + ?Sized> {
    store: &'a S,
    config: PipelineConfig,
    progress: &'a dyn ProgressSink,
    last_report: Option<PipelineReport>,
}

impl<'a, S: TableStore + ?Sized> PipelineExecutor<'a, S> {
    /// Create a new executor writing to `store`
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            config: PipelineConfig::default(),
            progress: &NOOP_PROGRESS,
            last_report: None,
        }
    }

    /// Set the pipeline configuration
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Send progress messages to `progress`
    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Report of the last successful run
    pub fn last_report(&self) -> Option<&PipelineReport> {
        self.last_report.as_ref()
    }

    /// Normalize `rows` into the tables of `plan` and store them.
    ///
    /// Tables are processed in execution order and each one is stored as soon as it
    /// is done. The first failure aborts the run; tables stored before it stay, but
    /// the schema and the table list are only written once every table succeeded.
    pub async fn run(&mut self, rows: &[Row], plan: &SchemaPlan) -> PipelineResult<PipelineReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", run_id = %run_id);

        let result = self.run_inner(run_id, rows, plan).instrument(span).await;
        match &result {
            Ok(report) => self.last_report = Some(report.clone()),
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Pipeline failed");
                self.progress.error(&format!("Pipeline failed: {}", e));
            }
        }
        result
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        rows: &[Row],
        plan: &SchemaPlan,
    ) -> PipelineResult<PipelineReport> {
        let start = Instant::now();
        let started_at = Utc::now();

        if plan.is_empty() {
            return Err(PipelineError::MissingSchema);
        }
        if rows.is_empty() {
            return Err(PipelineError::NoRows);
        }

        let warnings = if self.config.validate_plan {
            let headers = collect_headers(rows);
            validate_plan(plan, &headers)
                .into_result()
                .map_err(PipelineError::InvalidPlan)?
        } else {
            Vec::new()
        };
        for warning in &warnings {
            warn!("{}", warning);
        }

        let order = execution_order(plan)?;
        if order.is_empty() {
            return Err(PipelineError::EmptyExecutionOrder);
        }

        info!(
            tables = order.len(),
            rows = rows.len(),
            order = ?order,
            "Starting pipeline"
        );
        self.progress
            .update(&format!("Execution order: {}", order.join(" -> ")));

        let mut lookups = LookupMaps::new();
        let mut tables = Vec::with_capacity(order.len());
        let mut skipped_tables = Vec::new();

        for name in &order {
            let Some(spec) = plan.table(name) else {
                warn!(table = %name, "No definition for table, skipping");
                self.progress
                    .update(&format!("Skipping table '{}': no definition", name));
                skipped_tables.push(name.clone());
                continue;
            };

            let processed = async {
                self.progress.update(&format!("Processing table '{}'", name));
                let processed = if spec.is_parent() {
                    process_parent_table(name, spec, rows)?
                } else {
                    process_child_table(
                        name,
                        spec,
                        rows,
                        &lookups,
                        plan,
                        self.config.unresolved_fk_policy,
                    )?
                };
                self.store_table(&processed).await?;
                Ok::<_, PipelineError>(processed)
            }
            .instrument(info_span!("process_table", table = %name))
            .await?;

            lookups.insert(processed.name.clone(), processed.lookup);
            tables.push(TableReport {
                name: processed.name,
                stats: processed.stats,
            });
        }

        self.store.put_schema(plan).await?;
        let stored: Vec<String> = tables.iter().map(|t| t.name.clone()).collect();
        self.store.register_tables(&stored).await?;

        let report = PipelineReport {
            run_id,
            mode: RunMode::Normalized,
            started_at,
            execution_order: order,
            selected_table: stored.last().cloned(),
            tables,
            skipped_tables,
            warnings,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            tables = report.tables.len(),
            rows = report.total_rows(),
            duration = %report.duration_formatted(),
            "Pipeline completed"
        );
        self.progress.update(&format!(
            "Stored {} tables ({} rows) in {}",
            report.tables.len(),
            report.total_rows(),
            report.duration_formatted()
        ));
        Ok(report)
    }

    async fn store_table(&self, table: &ProcessedTable) -> PipelineResult<()> {
        self.store
            .put_table(&table.name, &table.rows)
            .await
            .map_err(|source| PipelineError::TableFailed {
                table: table.name.clone(),
                source,
            })?;
        debug!(
            table = %table.name,
            rows = table.stats.input_rows,
            unique = table.stats.unique_rows,
            "Table stored"
        );
        self.progress.update(&format!(
            "Stored table '{}' ({} rows)",
            table.name, table.stats.unique_rows
        ));
        Ok(())
    }

    /// Store `rows` unchanged as one table named `table_name`.
    ///
    /// Used when no schema plan is available. The stored schema is left as it is.
    pub async fn run_flat(&mut self, rows: &[Row], table_name: &str) -> PipelineResult<PipelineReport> {
        let run_id = Uuid::new_v4();
        let start = Instant::now();
        let started_at = Utc::now();

        let result = async {
            if rows.is_empty() {
                return Err(PipelineError::NoRows);
            }
            let table = ProcessedTable {
                name: table_name.to_string(),
                rows: rows.to_vec(),
                lookup: Default::default(),
                stats: TableStats {
                    input_rows: rows.len(),
                    unique_rows: rows.len(),
                    ..Default::default()
                },
            };
            self.store_table(&table).await?;
            self.store.register_tables(&[table.name.clone()]).await?;
            info!(table = %table_name, rows = rows.len(), "Stored flat table");

            Ok(PipelineReport {
                run_id,
                mode: RunMode::Flat,
                started_at,
                execution_order: vec![table.name.clone()],
                selected_table: Some(table.name.clone()),
                tables: vec![TableReport {
                    name: table.name,
                    stats: table.stats,
                }],
                skipped_tables: Vec::new(),
                warnings: Vec::new(),
                duration_ms: start.elapsed().as_millis() as u64,
            })
        }
        .instrument(info_span!("pipeline_run", run_id = %run_id, flat = true))
        .await;

        match &result {
            Ok(report) => self.last_report = Some(report.clone()),
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Flat import failed");
                self.progress.error(&format!("Flat import failed: {}", e));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableSpec;
    use crate::progress::{ProgressEvent, RecordingProgress};
    use crate::storage::{MemoryStore, StorageError};
    use serde_json::json;

    fn rows() -> Vec<Row> {
        [
            json!({"Order": 1, "Customer": "A"}),
            json!({"Order": 2, "Customer": "B"}),
            json!({"Order": 3, "Customer": "A"}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect()
    }

    fn plan() -> SchemaPlan {
        SchemaPlan::new()
            .with_table(
                "orders",
                TableSpec::new("order_id", &["order_id", "Order", "customer_id"])
                    .with_natural_key(&["Order"])
                    .with_foreign_key("customer_id", "customers.customer_id"),
            )
            .with_table(
                "customers",
                TableSpec::new("customer_id", &["customer_id", "Customer"])
                    .with_natural_key(&["Customer"]),
            )
    }

    #[test]
    fn test_duration_formatted() {
        let mut report = PipelineReport {
            run_id: Uuid::new_v4(),
            mode: RunMode::Normalized,
            started_at: Utc::now(),
            execution_order: Vec::new(),
            tables: Vec::new(),
            skipped_tables: Vec::new(),
            warnings: Vec::new(),
            selected_table: None,
            duration_ms: 250,
        };
        assert_eq!(report.duration_formatted(), "250ms");
        report.duration_ms = 5_000;
        assert_eq!(report.duration_formatted(), "5s");
        report.duration_ms = 65_000;
        assert_eq!(report.duration_formatted(), "1m 5s");
    }

    #[tokio::test]
    async fn test_run_stores_tables_schema_and_list() {
        let store = MemoryStore::new();
        let progress = RecordingProgress::new();
        let mut executor = PipelineExecutor::new(&store).with_progress(&progress);

        let report = executor.run(&rows(), &plan()).await.unwrap();

        assert_eq!(report.execution_order, vec!["customers", "orders"]);
        assert_eq!(report.selected_table.as_deref(), Some("orders"));
        assert_eq!(report.table("customers").unwrap().stats.unique_rows, 2);
        assert_eq!(report.total_rows(), 5);

        assert_eq!(store.list_tables().await.unwrap(), vec!["customers", "orders"]);
        assert_eq!(store.get_schema().await.unwrap(), Some(plan()));
        let orders = store.get_table("orders").await.unwrap();
        assert_eq!(orders[2]["customer_id"], json!("customers_1"));

        assert!(
            progress
                .events()
                .contains(&ProgressEvent::Update("Execution order: customers -> orders".to_string()))
        );
        assert!(executor.last_report().is_some());
    }

    #[tokio::test]
    async fn test_run_rejects_empty_input() {
        let store = MemoryStore::new();
        let mut executor = PipelineExecutor::new(&store);

        assert!(matches!(
            executor.run(&[], &plan()).await,
            Err(PipelineError::NoRows)
        ));
        assert!(matches!(
            executor.run(&rows(), &SchemaPlan::new()).await,
            Err(PipelineError::MissingSchema)
        ));
        assert!(store.list_tables().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_rejects_plan_with_unknown_columns() {
        let store = MemoryStore::new();
        let progress = RecordingProgress::new();
        let mut executor = PipelineExecutor::new(&store).with_progress(&progress);
        let plan = SchemaPlan::new().with_table(
            "customers",
            TableSpec::new("customer_id", &["customer_id", "Email"]).with_natural_key(&["Customer"]),
        );

        let result = executor.run(&rows(), &plan).await;
        assert!(matches!(result, Err(PipelineError::InvalidPlan(_))));
        assert_eq!(progress.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_table_aborts_without_registering() {
        let store = MemoryStore::new();
        let mut executor = PipelineExecutor::new(&store)
            .with_config(PipelineConfig::new().with_plan_validation(false));
        let plan = plan().with_table(
            "broken",
            TableSpec::new("broken_id", &["broken_id"]).with_foreign_key("x", "customers.customer_id"),
        );

        let result = executor.run(&rows(), &plan).await;
        assert!(matches!(
            result,
            Err(PipelineError::InvalidTableSpec { ref table, .. }) if table == "broken"
        ));
        // Earlier tables stay written, but neither the list nor the schema is updated
        assert!(store.get_table("customers").await.is_ok());
        assert!(store.list_tables().await.unwrap().is_empty());
        assert_eq!(store.get_schema().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_run_flat() {
        let store = MemoryStore::new();
        let mut executor = PipelineExecutor::new(&store);

        let report = executor.run_flat(&rows(), "sales").await.unwrap();
        assert_eq!(report.mode, RunMode::Flat);
        assert_eq!(report.selected_table.as_deref(), Some("sales"));
        assert_eq!(store.get_table("sales").await.unwrap(), rows());
        assert_eq!(store.list_tables().await.unwrap(), vec!["sales"]);
        assert_eq!(store.get_schema().await.unwrap(), None);

        assert!(matches!(
            store.get_table("orders").await,
            Err(StorageError::TableNotFound(_))
        ));
    }
}
