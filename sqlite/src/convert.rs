//! Value conversion between the domain model and SQLite storage.

use cmdforge_core::{DATETIME_FORMAT, DType, Value};
use rusqlite::types::Value as SqlValue;

/// Converts a domain value into the SQLite value it is stored as.
pub fn to_storage(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(n) => SqlValue::Integer(*n),
        Value::Float(x) => SqlValue::Real(*x),
        Value::Str(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::DateTime(dt) => SqlValue::Text(dt.format(DATETIME_FORMAT).to_string()),
        Value::Array(_) | Value::Object(_) => {
            SqlValue::Text(serde_json::to_string(value).unwrap_or_default())
        }
    }
}

/// Converts a stored SQLite value back using the column's declared dtype.
/// Text that does not parse as the dtype stays text.
pub fn from_storage(raw: SqlValue, dtype: DType) -> Value {
    match raw {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(n) => {
            if dtype == DType::Bool {
                Value::Bool(n != 0)
            } else {
                Value::Int(n)
            }
        }
        SqlValue::Real(x) => Value::Float(x),
        SqlValue::Blob(b) => Value::Bytes(b),
        SqlValue::Text(s) => dtype.parse_text(&s).unwrap_or(Value::Str(s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_by_dtype() {
        let cases = [
            (Value::Bool(true), DType::Bool),
            (Value::Int(42), DType::Int),
            (Value::Float(1.5), DType::Float),
            (Value::Str("hello".into()), DType::Str),
            (
                Value::Array(vec![Value::Int(1), Value::Str("a".into())]),
                DType::Array,
            ),
        ];
        for (value, dtype) in cases {
            let back = from_storage(to_storage(&value), dtype);
            assert_eq!(back, value);
        }
    }

    #[test]
    fn test_datetime_stored_as_text() {
        let dt = cmdforge_core::parse_datetime("2023-11-01 12:30").unwrap();
        let stored = to_storage(&Value::DateTime(dt));
        assert!(matches!(stored, SqlValue::Text(_)));
        assert_eq!(from_storage(stored, DType::DateTime), Value::DateTime(dt));
    }

    #[test]
    fn test_unparseable_text_stays_text() {
        let raw = SqlValue::Text("not a number".into());
        assert_eq!(
            from_storage(raw, DType::Int),
            Value::Str("not a number".into())
        );
    }
}
