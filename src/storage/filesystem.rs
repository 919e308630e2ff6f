//! File system table store
//!
//! Layout under the base directory:
//!
//! ```text
//! <base>/tables/<name>.json   rows of one table (JSON array of objects)
//! <base>/catalog.json         table list (JSON array of names)
//! <base>/schema.json          schema plan of the last successful run
//! <base>/config.json          configuration values (JSON object)
//! ```
//!
//! ## Security
//!
//! Table names become file names, so they are validated before any path is built:
//! path separators, ".." and leading dots are rejected, and the resolved path is
//! verified to remain within the tables directory.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::{StorageError, StorageResult, TableStore, merge_table_names};
use crate::models::{Row, SchemaPlan};

const TABLES_DIR: &str = "tables";
const CATALOG_FILE: &str = "catalog.json";
const SCHEMA_FILE: &str = "schema.json";
const CONFIG_FILE: &str = "config.json";
const MAX_NAME_LEN: usize = 128;

/// Table store writing JSON documents under a base directory
pub struct FileSystemStore {
    base_path: PathBuf,
    // Serializes read-modify-write of catalog.json and config.json
    meta_lock: Mutex<()>,
}

impl FileSystemStore {
    /// Create a store rooted at `base_path`. Directories are created on first write.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tabular_insight::storage::FileSystemStore;
    ///
    /// let store = FileSystemStore::new("/var/lib/tabular-insight");
    /// ```
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            meta_lock: Mutex::new(()),
        }
    }

    /// Base directory of the store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn table_path(&self, name: &str) -> StorageResult<PathBuf> {
        validate_table_name(name)?;

        let tables_dir = self.base_path.join(TABLES_DIR);
        let full = tables_dir.join(format!("{}.json", name));

        // The name is a single normal component, so the parent must be the tables dir
        let escapes = full.components().any(|c| matches!(c, Component::ParentDir))
            || full.parent() != Some(tables_dir.as_path());
        if escapes {
            return Err(StorageError::InvalidName {
                name: name.to_string(),
                reason: "path escapes the tables directory".to_string(),
            });
        }

        Ok(full)
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> StorageResult<Option<T>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::Io(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = serde_json::to_vec_pretty(value)?;
        fs::write(path, content)
            .await
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    async fn read_catalog(&self) -> StorageResult<Vec<String>> {
        let path = self.base_path.join(CATALOG_FILE);
        Ok(self.read_json(&path).await?.unwrap_or_default())
    }

    async fn read_config(&self) -> StorageResult<Map<String, Value>> {
        let path = self.base_path.join(CONFIG_FILE);
        Ok(self.read_json(&path).await?.unwrap_or_default())
    }
}

/// Check that a table name is usable as a file name
pub fn validate_table_name(name: &str) -> StorageResult<()> {
    let reject = |reason: &str| {
        Err(StorageError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.trim().is_empty() {
        return reject("name is empty");
    }
    if name.len() > MAX_NAME_LEN {
        return reject("name is too long");
    }
    if name.contains("..") {
        return reject("path traversal (..) not allowed");
    }
    if name.starts_with('.') {
        return reject("name must not start with a dot");
    }
    if name.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        return reject("name contains a path separator or control character");
    }
    if Path::new(name).components().count() != 1 {
        return reject("name must be a single path component");
    }
    Ok(())
}

#[async_trait]
impl TableStore for FileSystemStore {
    async fn put_table(&self, name: &str, rows: &[Row]) -> StorageResult<()> {
        let path = self.table_path(name)?;
        debug!(table = name, rows = rows.len(), path = %path.display(), "Writing table");
        self.write_json(&path, rows).await
    }

    async fn get_table(&self, name: &str) -> StorageResult<Vec<Row>> {
        let path = self.table_path(name)?;
        self.read_json(&path)
            .await?
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }

    async fn list_tables(&self) -> StorageResult<Vec<String>> {
        self.read_catalog().await
    }

    async fn register_tables(&self, names: &[String]) -> StorageResult<()> {
        let _guard = self.meta_lock.lock().await;
        let mut catalog = self.read_catalog().await?;
        merge_table_names(&mut catalog, names);
        self.write_json(&self.base_path.join(CATALOG_FILE), &catalog)
            .await
    }

    async fn delete_table(&self, name: &str) -> StorageResult<()> {
        let path = self.table_path(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StorageError::Io(format!(
                    "Failed to delete {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        let _guard = self.meta_lock.lock().await;
        let mut catalog = self.read_catalog().await?;
        if catalog.iter().any(|existing| existing == name) {
            catalog.retain(|existing| existing != name);
            self.write_json(&self.base_path.join(CATALOG_FILE), &catalog)
                .await?;
        }
        Ok(())
    }

    async fn put_schema(&self, plan: &SchemaPlan) -> StorageResult<()> {
        self.write_json(&self.base_path.join(SCHEMA_FILE), plan).await
    }

    async fn get_schema(&self) -> StorageResult<Option<SchemaPlan>> {
        self.read_json(&self.base_path.join(SCHEMA_FILE)).await
    }

    async fn put_config(&self, key: &str, value: Value) -> StorageResult<()> {
        let _guard = self.meta_lock.lock().await;
        let mut config = self.read_config().await?;
        config.insert(key.to_string(), value);
        self.write_json(&self.base_path.join(CONFIG_FILE), &config)
            .await
    }

    async fn get_config(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.read_config().await?.remove(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_path_traversal_blocked() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());

        for name in ["../etc/passwd", "a/b", "..", ".hidden", "", "a\\b"] {
            let result = store.table_path(name);
            assert!(
                matches!(result, Err(StorageError::InvalidName { .. })),
                "expected {name:?} to be rejected"
            );
        }

        assert!(store.table_path("order items").is_ok());
        assert!(store.table_path("customers").is_ok());
    }

    #[tokio::test]
    async fn test_table_roundtrip_preserves_column_order() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());

        let rows = vec![row(json!({"zeta": 1, "alpha": "x", "mid": null}))];
        store.put_table("t", &rows).await.unwrap();

        let loaded = store.get_table("t").await.unwrap();
        assert_eq!(loaded, rows);
        let keys: Vec<&String> = loaded[0].keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert!(temp.path().join("tables").join("t.json").exists());
    }

    #[tokio::test]
    async fn test_missing_table_and_schema() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());

        assert!(matches!(
            store.get_table("missing").await,
            Err(StorageError::TableNotFound(_))
        ));
        assert!(store.get_schema().await.unwrap().is_none());
        assert!(store.list_tables().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_merge_and_delete() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());

        store.put_table("a", &[]).await.unwrap();
        store
            .register_tables(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        store
            .register_tables(&["b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(store.list_tables().await.unwrap(), vec!["a", "b", "c"]);

        store.delete_table("a").await.unwrap();
        store.delete_table("a").await.unwrap();
        assert_eq!(store.list_tables().await.unwrap(), vec!["b", "c"]);
        assert!(!temp.path().join("tables").join("a.json").exists());
    }

    #[tokio::test]
    async fn test_schema_and_config_persist_across_instances() {
        let temp = TempDir::new().unwrap();
        let plan = SchemaPlan::new().with_table(
            "customers",
            crate::models::TableSpec::new("customer_id", &["customer_id", "name"])
                .with_natural_key(&["name"]),
        );

        {
            let store = FileSystemStore::new(temp.path());
            store.put_schema(&plan).await.unwrap();
            store.put_config("apiKey", json!("k-123")).await.unwrap();
        }

        let store = FileSystemStore::new(temp.path());
        assert_eq!(store.get_schema().await.unwrap(), Some(plan));
        assert_eq!(store.get_config("apiKey").await.unwrap(), Some(json!("k-123")));
        assert!(store.get_config("other").await.unwrap().is_none());
    }
}
