//! Remote executor trait and row decoding helpers.
//!
//! Rows travel in the D1 wire shape: a map from column name to JSON value.
//! Parameters are JSON scalars bound positionally to `?` placeholders.

use async_trait::async_trait;
use roscoe_core::StoreError;
use serde_json::{Map, Number, Value};

/// Positional statement parameter.
pub type SqlParam = Value;

/// One result row keyed by column name.
pub type Row = Map<String, Value>;

/// Executes parameterized statements against the remote store.
///
/// A statement text may contain several `;`-separated statements; an
/// implementation must apply them as one indivisible unit.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Execute `sql` with `params` and return the produced rows.
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, StoreError>;
}

// ============================================================================
// ROW DECODING
// ============================================================================

fn column<'a>(row: &'a Row, name: &str) -> Result<&'a Value, StoreError> {
    row.get(name).ok_or_else(|| StoreError::Column {
        column: name.to_string(),
        reason: "missing".to_string(),
    })
}

fn invalid(name: &str, value: &Value, expected: &str) -> StoreError {
    StoreError::Column {
        column: name.to_string(),
        reason: format!("expected {}, got {}", expected, value),
    }
}

/// Integral value of a JSON number, accepting floats with no fractional part.
fn integral(number: &Number) -> Option<i128> {
    if let Some(v) = number.as_i64() {
        return Some(v as i128);
    }
    if let Some(v) = number.as_u64() {
        return Some(v as i128);
    }
    number
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.is_finite())
        .map(|f| f as i128)
}

pub fn row_i64(row: &Row, name: &str) -> Result<i64, StoreError> {
    let value = column(row, name)?;
    value
        .as_number()
        .and_then(integral)
        .and_then(|v| i64::try_from(v).ok())
        .ok_or_else(|| invalid(name, value, "integer"))
}

pub fn row_u64(row: &Row, name: &str) -> Result<u64, StoreError> {
    let value = column(row, name)?;
    value
        .as_number()
        .and_then(integral)
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| invalid(name, value, "unsigned integer"))
}

pub fn row_f32(row: &Row, name: &str) -> Result<f32, StoreError> {
    let value = column(row, name)?;
    value
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| invalid(name, value, "number"))
}

/// Boolean stored as an integer flag (SQLite has no boolean type).
pub fn row_bool(row: &Row, name: &str) -> Result<bool, StoreError> {
    let value = column(row, name)?;
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => integral(n)
            .map(|v| v != 0)
            .ok_or_else(|| invalid(name, value, "0 or 1")),
        _ => Err(invalid(name, value, "0 or 1")),
    }
}

pub fn row_string(row: &Row, name: &str) -> Result<String, StoreError> {
    let value = column(row, name)?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(name, value, "text"))
}

/// Nullable text column; a missing column reads as `None`.
pub fn row_opt_string(row: &Row, name: &str) -> Result<Option<String>, StoreError> {
    match row.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(invalid(name, other, "text or null")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_row_integers() -> Result<(), StoreError> {
        let r = row(json!({"user_id": 42, "as_float": 7.0, "neg": -1}));
        assert_eq!(row_u64(&r, "user_id")?, 42);
        assert_eq!(row_u64(&r, "as_float")?, 7);
        assert_eq!(row_i64(&r, "neg")?, -1);
        assert!(row_u64(&r, "neg").is_err());
        Ok(())
    }

    #[test]
    fn test_row_missing_column_names_it() {
        let r = row(json!({}));
        match row_u64(&r, "user_id") {
            Err(StoreError::Column { column, .. }) => assert_eq!(column, "user_id"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_row_bool_accepts_ints_and_bools() -> Result<(), StoreError> {
        let r = row(json!({"a": 1, "b": 0, "c": true, "d": "yes"}));
        assert!(row_bool(&r, "a")?);
        assert!(!row_bool(&r, "b")?);
        assert!(row_bool(&r, "c")?);
        assert!(row_bool(&r, "d").is_err());
        Ok(())
    }

    #[test]
    fn test_row_strings() -> Result<(), StoreError> {
        let r = row(json!({"key": "abc", "reasons": null, "n": 1}));
        assert_eq!(row_string(&r, "key")?, "abc");
        assert_eq!(row_opt_string(&r, "reasons")?, None);
        assert_eq!(row_opt_string(&r, "absent")?, None);
        assert!(row_opt_string(&r, "n").is_err());
        Ok(())
    }

    #[test]
    fn test_row_f32() -> Result<(), StoreError> {
        let r = row(json!({"confidence": 0.5, "whole": 1}));
        assert_eq!(row_f32(&r, "confidence")?, 0.5);
        assert_eq!(row_f32(&r, "whole")?, 1.0);
        Ok(())
    }
}
