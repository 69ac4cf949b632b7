//! Type conversion registry: logical data types and their converters.
//!
//! Every supported logical type knows how to turn command-line text into a
//! [`Value`], which storage column type it maps to, and how the casting
//! policy treats already-typed values. Fields may additionally carry an
//! element-proc hint selecting a secondary converter for sub-values (free
//! text transliteration, element types for arrays, key=value pairs for
//! structured objects).

use indexmap::IndexMap;

use crate::error::CastError;
use crate::text;
use crate::value::{Record, Value};

/// Supported logical data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DType {
    /// Short free text (the generic fallback type).
    #[default]
    Str,
    Int,
    Float,
    Bool,
    Bytes,
    DateTime,
    /// Homogeneous list.
    Array,
    /// Structured object (map).
    Json,
}

impl DType {
    pub const ALL: [DType; 8] = [
        DType::Str,
        DType::Int,
        DType::Float,
        DType::Bool,
        DType::Bytes,
        DType::DateTime,
        DType::Array,
        DType::Json,
    ];

    /// Canonical lowercase name used in annotations and help text.
    pub fn name(self) -> &'static str {
        match self {
            DType::Str => "str",
            DType::Int => "int",
            DType::Float => "float",
            DType::Bool => "bool",
            DType::Bytes => "bytes",
            DType::DateTime => "datetime",
            DType::Array => "array",
            DType::Json => "json",
        }
    }

    pub fn from_name(name: &str) -> Option<DType> {
        DType::ALL.into_iter().find(|dtype| dtype.name() == name)
    }

    /// Resolves a declared type name, downgrading unsupported names to the
    /// generic text type.
    pub fn resolve(name: &str) -> DType {
        DType::from_name(name).unwrap_or_else(|| {
            tracing::warn!(dtype = name, "unsupported dtype, falling back to str");
            DType::Str
        })
    }

    /// Storage column type name for this logical type.
    pub fn storage_type(self) -> &'static str {
        match self {
            DType::Str => "TEXT",
            DType::Int => "INTEGER",
            DType::Float => "REAL",
            DType::Bool => "BOOLEAN",
            DType::Bytes => "BLOB",
            DType::DateTime => "DATETIME",
            DType::Array => "ARRAY",
            DType::Json => "JSON",
        }
    }

    /// Converts command-line text into a typed value.
    ///
    /// Boolean conversion is deliberately permissive: only `1`, `true` and
    /// `True` are truthy, anything else is falsy rather than an error.
    pub fn parse_text(self, input: &str) -> Result<Value, CastError> {
        match self {
            DType::Str => Ok(Value::Str(input.to_string())),
            DType::Int => input
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| CastError::invalid(input, "int")),
            DType::Float => input
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| CastError::invalid(input, "float")),
            DType::Bool => Ok(Value::Bool(matches!(input, "1" | "true" | "True"))),
            DType::Bytes => Ok(Value::Bytes(input.as_bytes().to_vec())),
            DType::DateTime => text::parse_datetime(input).map(Value::DateTime),
            DType::Array => match serde_json::from_str::<serde_json::Value>(input) {
                Ok(json @ serde_json::Value::Array(_)) => Ok(Value::from_json(json)),
                _ => Err(CastError::invalid(input, "array")),
            },
            DType::Json => match serde_json::from_str::<serde_json::Value>(input) {
                Ok(json @ serde_json::Value::Object(_)) => Ok(Value::from_json(json)),
                _ => Err(CastError::invalid(input, "json")),
            },
        }
    }

    /// Whether a value already has this logical type.
    pub fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (DType::Str, Value::Str(_))
                | (DType::Int, Value::Int(_))
                | (DType::Float, Value::Float(_))
                | (DType::Bool, Value::Bool(_))
                | (DType::Bytes, Value::Bytes(_))
                | (DType::DateTime, Value::DateTime(_))
                | (DType::Array, Value::Array(_))
                | (DType::Json, Value::Object(_))
        )
    }

    /// Casting policy: already-typed values pass through unchanged, text is
    /// converted (failures are swallowed), any other shape is omitted.
    ///
    /// `None` means "omit the field", which is distinct from a present falsy
    /// value such as `Value::Bool(false)`.
    pub fn cast(self, value: &Value) -> Option<Value> {
        if self.matches(value) {
            return Some(value.clone());
        }
        if let Value::Str(text) = value {
            return self.parse_text(text).ok();
        }
        None
    }

    /// Applies the casting policy across a record, dropping only fields
    /// whose cast failed; absent fields stay absent.
    pub fn cast_record(record: &Record, dtypes: &IndexMap<String, DType>) -> Record {
        let mut result = Record::new();
        for (name, dtype) in dtypes {
            let Some(value) = record.get(name) else {
                continue;
            };
            if let Some(casted) = dtype.cast(value) {
                result.insert(name.clone(), casted);
            }
        }
        result
    }
}

/// A secondary converter selected by an element-proc hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcConverter {
    /// Hint names a supported logical type: convert with it.
    Typed(DType),
    /// Transliterate free text down to ASCII.
    Ascii,
    /// Unknown hint: keep the raw text.
    Raw,
}

impl ProcConverter {
    pub fn resolve(name: &str) -> ProcConverter {
        match name {
            "ascii" => ProcConverter::Ascii,
            other => DType::from_name(other)
                .map(ProcConverter::Typed)
                .unwrap_or(ProcConverter::Raw),
        }
    }

    pub fn convert(self, input: &str) -> Result<Value, CastError> {
        match self {
            ProcConverter::Typed(dtype) => dtype.parse_text(input),
            ProcConverter::Ascii => Ok(Value::Str(text::fold_ascii(input))),
            ProcConverter::Raw => Ok(Value::Str(input.to_string())),
        }
    }
}

/// The converter a field applies to each raw command-line token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldConverter {
    Plain(ProcConverter),
    /// `key=value` / `key:value` pairs whose values use the inner converter.
    KeyValue(ProcConverter),
}

/// Resolves the effective token converter for a field.
///
/// Text and container types honor the proc hint for their sub-values; a
/// structured-object field with a non-json hint switches to key=value pair
/// parsing.
pub fn field_converter(dtype: DType, proc: Option<&str>) -> FieldConverter {
    let subtype = match dtype {
        DType::Str | DType::Array | DType::Json => proc.unwrap_or("str"),
        other => other.name(),
    };
    let converter = ProcConverter::resolve(subtype);
    if dtype == DType::Json && subtype != "json" {
        FieldConverter::KeyValue(converter)
    } else {
        FieldConverter::Plain(converter)
    }
}

impl FieldConverter {
    /// Converts one raw token.
    ///
    /// Key-value mode returns a two-element array `[key, value]`; a token
    /// without a separator keeps a null key so the caller can decide how to
    /// treat it.
    pub fn convert(self, input: &str) -> Result<Value, CastError> {
        match self {
            FieldConverter::Plain(converter) => converter.convert(input),
            FieldConverter::KeyValue(converter) => {
                // Greedy key match: "a=b=c" splits at the last separator.
                match input.rfind(['=', ':']) {
                    Some(position) if position > 0 && position + 1 < input.len() => {
                        let key = &input[..position];
                        let value = converter.convert(&input[position + 1..])?;
                        Ok(Value::Array(vec![Value::Str(key.to_string()), value]))
                    }
                    _ => Ok(Value::Array(vec![
                        Value::Null,
                        Value::Str(input.to_string()),
                    ])),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_downgrades_unknown_names() {
        assert_eq!(DType::resolve("int"), DType::Int);
        assert_eq!(DType::resolve("varchar"), DType::Str);
    }

    #[test]
    fn test_bool_text_conversion_is_permissive() {
        for truthy in ["1", "true", "True"] {
            assert_eq!(DType::Bool.parse_text(truthy).unwrap(), Value::Bool(true));
        }
        for falsy in ["0", "yes", "TRUE", ""] {
            assert_eq!(DType::Bool.parse_text(falsy).unwrap(), Value::Bool(false));
        }
    }

    #[test]
    fn test_cast_keeps_typed_values_and_swallows_failures() {
        assert_eq!(DType::Int.cast(&Value::Int(3)), Some(Value::Int(3)));
        assert_eq!(DType::Int.cast(&Value::Str("7".into())), Some(Value::Int(7)));
        assert_eq!(DType::Int.cast(&Value::Str("abc".into())), None);
        assert_eq!(DType::Int.cast(&Value::Bool(true)), None);
    }

    #[test]
    fn test_cast_record_drops_only_failures() {
        let mut record = Record::new();
        record.insert("year".into(), Value::Str("199x".into()));
        record.insert("flag".into(), Value::Bool(false));
        record.insert("name".into(), Value::Str("ada".into()));

        let mut dtypes = IndexMap::new();
        dtypes.insert("year".to_string(), DType::Int);
        dtypes.insert("flag".to_string(), DType::Bool);
        dtypes.insert("name".to_string(), DType::Str);
        dtypes.insert("absent".to_string(), DType::Str);

        let result = DType::cast_record(&record, &dtypes);
        assert!(!result.contains_key("year"));
        assert_eq!(result.get("flag"), Some(&Value::Bool(false)));
        assert_eq!(result.get("name"), Some(&Value::Str("ada".into())));
        assert!(!result.contains_key("absent"));
    }

    #[test]
    fn test_array_parsing() {
        assert_eq!(
            DType::Array.parse_text("[1, 2]").unwrap(),
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
        assert!(DType::Array.parse_text("{}").is_err());
    }

    #[test]
    fn test_key_value_converter() {
        let converter = field_converter(DType::Json, Some("int"));
        assert_eq!(
            converter.convert("age=30").unwrap(),
            Value::Array(vec![Value::Str("age".into()), Value::Int(30)])
        );
        assert_eq!(
            converter.convert("score:12").unwrap(),
            Value::Array(vec![Value::Str("score".into()), Value::Int(12)])
        );
        assert_eq!(
            converter.convert("loose").unwrap(),
            Value::Array(vec![Value::Null, Value::Str("loose".into())])
        );
    }

    #[test]
    fn test_proc_hint_selection() {
        assert_eq!(
            field_converter(DType::Str, Some("ascii")),
            FieldConverter::Plain(ProcConverter::Ascii)
        );
        // Unknown hints keep raw text.
        assert_eq!(
            field_converter(DType::Str, Some("telex")),
            FieldConverter::Plain(ProcConverter::Raw)
        );
        // Non-text types ignore the hint.
        assert_eq!(
            field_converter(DType::Int, Some("ascii")),
            FieldConverter::Plain(ProcConverter::Typed(DType::Int))
        );
    }
}
