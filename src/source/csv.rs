//! CSV row source
//!
//! Reads a header row followed by records, using the `csv` crate with flexible record
//! lengths: short records are padded with null, long records are truncated to the
//! header count. Fields are trimmed and typed dynamically:
//!
//! - empty → null
//! - `true`/`TRUE`/`false`/`FALSE` → boolean
//! - numeric text → integer or float
//! - anything else → string

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ::csv::{ReaderBuilder, StringRecord, Trim};
use serde_json::{Number, Value};

use super::{RowIter, RowSource, SourceError, SourceResult};
use crate::models::Row;

#[derive(Debug, Clone)]
enum CsvInput {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

/// Row source reading CSV text from a file or from memory
#[derive(Debug, Clone)]
pub struct CsvRowSource {
    name: String,
    input: CsvInput,
    delimiter: u8,
    dynamic_typing: bool,
}

impl CsvRowSource {
    /// Read from a file; the source is named after the file stem
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".to_string());
        Self {
            name,
            input: CsvInput::Path(path),
            delimiter: b',',
            dynamic_typing: true,
        }
    }

    /// Read from bytes already in memory
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name: name.into(),
            input: CsvInput::Bytes(Arc::from(bytes)),
            delimiter: b',',
            dynamic_typing: true,
        }
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Keep every non-empty field as a string when disabled
    pub fn with_dynamic_typing(mut self, enabled: bool) -> Self {
        self.dynamic_typing = enabled;
        self
    }

    fn open(&self) -> SourceResult<::csv::Reader<Box<dyn Read + Send>>> {
        let reader: Box<dyn Read + Send> = match &self.input {
            CsvInput::Path(path) => Box::new(File::open(path).map_err(|e| SourceError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?),
            CsvInput::Bytes(bytes) => Box::new(Cursor::new(Arc::clone(bytes))),
        };

        Ok(ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .trim(Trim::All)
            .delimiter(self.delimiter)
            .from_reader(reader))
    }
}

impl RowSource for CsvRowSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn headers(&self) -> SourceResult<Vec<String>> {
        let mut reader = self.open()?;
        read_headers(&mut reader)
    }

    fn rows(&self) -> SourceResult<RowIter<'_>> {
        let mut reader = self.open()?;
        let headers = read_headers(&mut reader)?;
        Ok(Box::new(CsvRows {
            reader,
            headers,
            record: StringRecord::new(),
            dynamic_typing: self.dynamic_typing,
            done: false,
        }))
    }
}

fn read_headers<R: Read>(reader: &mut ::csv::Reader<R>) -> SourceResult<Vec<String>> {
    let record = reader.headers().map_err(|e| malformed(&e, 1))?;
    if record.iter().all(|h| h.is_empty()) {
        return Err(SourceError::NoHeaders);
    }
    Ok(unique_headers(record.iter()))
}

/// Make header names unique: blanks become `column_<n>`, repeats get `_1`, `_2`, ...
fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for (index, name) in raw.enumerate() {
        let base = if name.is_empty() {
            format!("column_{}", index + 1)
        } else {
            name.to_string()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while headers.contains(&candidate) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        headers.push(candidate);
    }
    headers
}

fn malformed(err: &::csv::Error, fallback_line: u64) -> SourceError {
    SourceError::Malformed {
        line: err.position().map(|p| p.line()).unwrap_or(fallback_line),
        message: err.to_string(),
    }
}

struct CsvRows {
    reader: ::csv::Reader<Box<dyn Read + Send>>,
    headers: Vec<String>,
    record: StringRecord,
    dynamic_typing: bool,
    done: bool,
}

impl Iterator for CsvRows {
    type Item = SourceResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.read_record(&mut self.record) {
            Ok(true) => Some(Ok(self.current_row())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                // Malformed input is terminal
                self.done = true;
                let line = self.reader.position().line();
                Some(Err(malformed(&e, line)))
            }
        }
    }
}

impl CsvRows {
    fn current_row(&self) -> Row {
        let mut row = Row::with_capacity(self.headers.len());
        for (index, header) in self.headers.iter().enumerate() {
            let value = match self.record.get(index) {
                Some(field) if self.dynamic_typing => infer_scalar(field),
                Some("") | None => Value::Null,
                Some(field) => Value::String(field.to_string()),
            };
            row.insert(header.clone(), value);
        }
        row
    }
}

/// Type a trimmed CSV field
pub fn infer_scalar(field: &str) -> Value {
    match field {
        "" => Value::Null,
        "true" | "TRUE" => Value::Bool(true),
        "false" | "FALSE" => Value::Bool(false),
        _ if is_numeric(field) => parse_number(field),
        _ => Value::String(field.to_string()),
    }
}

/// `-?(digits | digits. | .digits | digits.digits)([eE][+-]?digits)?`
fn is_numeric(text: &str) -> bool {
    let bytes = text.strip_prefix('-').unwrap_or(text).as_bytes();
    let mut i = 0;

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }

    if int_digits + frac_digits == 0 {
        return false;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}

fn parse_number(text: &str) -> Value {
    let is_integer = !text.contains(['.', 'e', 'E']);
    if is_integer {
        if let Ok(i) = text.parse::<i64>() {
            return Value::Number(Number::from(i));
        }
    }
    // Integers beyond i64 lose precision as floats; keep the original text
    if is_integer {
        return Value::String(text.to_string());
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(text.to_string()))
}
