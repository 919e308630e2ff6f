//! In-memory table store

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{StorageError, StorageResult, TableStore, merge_table_names};
use crate::models::{Row, SchemaPlan};

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Row>>,
    table_list: Vec<String>,
    schema: Option<SchemaPlan>,
    config: HashMap<String, Value>,
}

/// Table store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every stored table, registered or not, sorted
    pub async fn stored_table_names(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state.tables.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn put_table(&self, name: &str, rows: &[Row]) -> StorageResult<()> {
        let mut state = self.state.write().await;
        state.tables.insert(name.to_string(), rows.to_vec());
        Ok(())
    }

    async fn get_table(&self, name: &str) -> StorageResult<Vec<Row>> {
        let state = self.state.read().await;
        state
            .tables
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }

    async fn list_tables(&self) -> StorageResult<Vec<String>> {
        Ok(self.state.read().await.table_list.clone())
    }

    async fn register_tables(&self, names: &[String]) -> StorageResult<()> {
        let mut state = self.state.write().await;
        merge_table_names(&mut state.table_list, names);
        Ok(())
    }

    async fn delete_table(&self, name: &str) -> StorageResult<()> {
        let mut state = self.state.write().await;
        state.tables.remove(name);
        state.table_list.retain(|existing| existing != name);
        Ok(())
    }

    async fn put_schema(&self, plan: &SchemaPlan) -> StorageResult<()> {
        self.state.write().await.schema = Some(plan.clone());
        Ok(())
    }

    async fn get_schema(&self) -> StorageResult<Option<SchemaPlan>> {
        Ok(self.state.read().await.schema.clone())
    }

    async fn put_config(&self, key: &str, value: Value) -> StorageResult<()> {
        self.state.write().await.config.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_config(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.state.read().await.config.get(key).cloned())
    }
}
