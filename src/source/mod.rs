//! Row sources
//!
//! A [`RowSource`] produces the records of one input file in file order. Every call to
//! [`RowSource::rows`] starts a fresh pass, so the same source can be previewed and
//! then read in full. Malformed input ends the sequence with a single
//! [`SourceError::Malformed`] item instead of a row.

pub mod csv;

pub use self::csv::CsvRowSource;

use std::sync::Arc;

use crate::models::Row;

/// Errors produced while reading an input file
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to open '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Input has no header row")]
    NoHeaders,

    #[error("Malformed input at line {line}: {message}")]
    Malformed { line: u64, message: String },

    #[error("Reading was interrupted: {0}")]
    Interrupted(String),
}

impl SourceError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            SourceError::NoHeaders => "The file has no header row.\n\n\
                Hint: The first line of a CSV file must name the columns."
                .to_string(),
            SourceError::Malformed { line, message } => format!(
                "The file could not be parsed at line {line}: {message}\n\n\
                Hint: Check the quoting and the encoding (UTF-8) around that line."
            ),
            _ => self.to_string(),
        }
    }
}

/// Result type for row source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// One pass over the records of a source
pub type RowIter<'a> = Box<dyn Iterator<Item = SourceResult<Row>> + Send + 'a>;

/// Producer of row records from a raw file
pub trait RowSource: Send + Sync {
    /// Display name of the source, used for fallback table names and logs
    fn name(&self) -> &str;

    /// Column names, in file order and made unique
    fn headers(&self) -> SourceResult<Vec<String>>;

    /// Start a new pass over the records
    fn rows(&self) -> SourceResult<RowIter<'_>>;

    /// The first `n` records
    fn preview(&self, n: usize) -> SourceResult<Vec<Row>> {
        self.rows()?.take(n).collect()
    }

    /// Every record; stops at the first malformed one
    fn read_all(&self) -> SourceResult<Vec<Row>> {
        self.rows()?.collect()
    }
}

/// Row source over rows already held in memory
#[derive(Debug, Clone, Default)]
pub struct VecRowSource {
    name: String,
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl VecRowSource {
    /// Create a source; headers are the union of row keys in first-seen order
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }
}

impl RowSource for VecRowSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn headers(&self) -> SourceResult<Vec<String>> {
        if self.headers.is_empty() {
            return Err(SourceError::NoHeaders);
        }
        Ok(self.headers.clone())
    }

    fn rows(&self) -> SourceResult<RowIter<'_>> {
        Ok(Box::new(self.rows.iter().cloned().map(Ok)))
    }
}

/// Run `read` against `source` on the blocking thread pool.
///
/// Opening files and parsing CSV block the calling thread, so async callers go
/// through here instead of calling the source directly.
pub async fn read_blocking<T, F>(source: Arc<dyn RowSource>, read: F) -> SourceResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn RowSource) -> SourceResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || read(source.as_ref()))
        .await
        .map_err(|e| SourceError::Interrupted(e.to_string()))?
}

/// Column names seen across `rows`, in first-seen order
pub fn collect_headers<'a>(rows: impl IntoIterator<Item = &'a Row>) -> Vec<String> {
    let mut headers = indexmap::IndexSet::new();
    for row in rows {
        for key in row.keys() {
            headers.insert(key.clone());
        }
    }
    headers.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_vec_source_restartable() {
        let source = VecRowSource::new(
            "mem",
            vec![row(json!({"a": 1})), row(json!({"a": 2, "b": "x"}))],
        );
        assert_eq!(source.headers().unwrap(), vec!["a", "b"]);
        assert_eq!(source.preview(1).unwrap().len(), 1);
        assert_eq!(source.read_all().unwrap().len(), 2);
        assert_eq!(source.read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_vec_source_has_no_headers() {
        let source = VecRowSource::new("empty", Vec::new());
        assert!(matches!(source.headers(), Err(SourceError::NoHeaders)));
        assert!(source.read_all().unwrap().is_empty());
    }

    // Records the thread each pass runs on
    struct ThreadSource {
        inner: VecRowSource,
        threads: std::sync::Mutex<Vec<std::thread::ThreadId>>,
    }

    impl RowSource for ThreadSource {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn headers(&self) -> SourceResult<Vec<String>> {
            self.inner.headers()
        }

        fn rows(&self) -> SourceResult<RowIter<'_>> {
            if let Ok(mut threads) = self.threads.lock() {
                threads.push(std::thread::current().id());
            }
            self.inner.rows()
        }
    }

    #[tokio::test]
    async fn test_read_blocking_leaves_the_runtime_thread() {
        let source = Arc::new(ThreadSource {
            inner: VecRowSource::new("mem", vec![row(json!({"a": 1})), row(json!({"a": 2}))]),
            threads: Default::default(),
        });

        let rows = read_blocking(source.clone(), |s| s.read_all()).await.unwrap();
        assert_eq!(rows.len(), 2);

        let threads = source.threads.lock().unwrap();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0], std::thread::current().id());
    }

    #[tokio::test]
    async fn test_read_blocking_passes_errors_through() {
        let source: Arc<dyn RowSource> = Arc::new(VecRowSource::new("empty", Vec::new()));
        let result = read_blocking(source, |s| s.headers()).await;
        assert!(matches!(result, Err(SourceError::NoHeaders)));
    }

    #[test]
    fn test_collect_headers() {
        let rows = [row(json!({"x": 1, "y": 2})), row(json!({"z": 3, "x": 4}))];
        assert_eq!(collect_headers(&rows), vec!["x", "y", "z"]);
    }
}
