//! Row values and the scalar helpers shared by the pipeline and the report executor
//!
//! Rows come out of the CSV source with dynamically typed scalars (string, number,
//! boolean or null). Nothing downstream may assume a column is always numeric, so
//! the helpers here turn scalars into key text and lenient numbers on demand.

use serde_json::{Map, Number, Value};

/// A single record: column name to scalar value, in header order
pub type Row = Map<String, Value>;

/// Separator used when joining natural key fragments
pub const KEY_SEPARATOR: &str = "|";

/// Render a scalar as the text used for natural keys, group keys and join keys.
///
/// Null renders as the empty string, integral numbers render without a fraction
/// (`3.0` and `3` produce the same key), booleans render as `true`/`false`.
pub fn key_fragment(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::String(s) => s.clone(),
        // Nested values never come out of the CSV source; keep them stable anyway
        other => other.to_string(),
    }
}

fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Build the natural key of a row: the pipe-joined fragments of `columns`, in order.
///
/// Missing columns contribute an empty fragment.
pub fn natural_key(row: &Row, columns: &[String]) -> String {
    columns
        .iter()
        .map(|column| row.get(column).map(key_fragment).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Lenient numeric coercion.
///
/// Numbers are returned as-is; strings are parsed from their longest leading numeric
/// prefix (`"12.5kg"` is `12.5`); anything else, or a string with no numeric prefix,
/// is `None`.
pub fn parse_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float_prefix(s),
        _ => None,
    }
}

fn parse_float_prefix(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    // Exponent only counts when at least one digit follows it
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Convert a computed number into a JSON value.
///
/// Integral results inside the exactly representable range become integers so that
/// a sum of `2 + 3` serializes as `5` rather than `5.0`. Non-finite values become null.
pub fn number_value(value: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT {
        return Value::Number(Number::from(value as i64));
    }
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_key_fragment_scalars() {
        assert_eq!(key_fragment(&Value::Null), "");
        assert_eq!(key_fragment(&json!(true)), "true");
        assert_eq!(key_fragment(&json!(42)), "42");
        assert_eq!(key_fragment(&json!(3.0)), "3");
        assert_eq!(key_fragment(&json!(2.5)), "2.5");
        assert_eq!(key_fragment(&json!("ACME")), "ACME");
    }

    #[test]
    fn test_natural_key_joins_in_column_order() {
        let r = row(json!({"first": "Ada", "last": "Lovelace", "age": 36}));
        let key = natural_key(&r, &["last".to_string(), "first".to_string()]);
        assert_eq!(key, "Lovelace|Ada");
    }

    #[test]
    fn test_natural_key_missing_column_is_empty() {
        let r = row(json!({"a": 1}));
        let key = natural_key(&r, &["a".to_string(), "b".to_string()]);
        assert_eq!(key, "1|");
    }

    #[test]
    fn test_parse_float_lenient() {
        assert_eq!(parse_float(&json!(4)), Some(4.0));
        assert_eq!(parse_float(&json!("12.5kg")), Some(12.5));
        assert_eq!(parse_float(&json!("  -3e2 ")), Some(-300.0));
        assert_eq!(parse_float(&json!(".5")), Some(0.5));
        assert_eq!(parse_float(&json!("1e")), Some(1.0));
        assert_eq!(parse_float(&json!("abc")), None);
        assert_eq!(parse_float(&json!("-")), None);
        assert_eq!(parse_float(&json!(true)), None);
        assert_eq!(parse_float(&Value::Null), None);
    }

    #[test]
    fn test_number_value() {
        assert_eq!(number_value(5.0), json!(5));
        assert_eq!(number_value(2.5), json!(2.5));
        assert_eq!(number_value(f64::NAN), Value::Null);
    }
}
