//! Normalized field descriptors and their declaration sources.
//!
//! A [`FieldDecl`] is what command and table authors write (an annotation
//! string, or a structured spec that may itself embed an annotation); a
//! [`FieldDescriptor`] is the normalized, sanitized result consumed by the
//! argument builder and the storage layer.

use serde::{Deserialize, Deserializer};

use crate::annotation::parse_annotation;
use crate::dtype::DType;
use crate::error::Result;
use crate::value::Value;

/// Arity marker for repeated argument values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Zero or one occurrence (`?`).
    Optional,
    /// Zero or more occurrences (`*`).
    ZeroOrMore,
    /// One or more occurrences (`+`).
    OneOrMore,
    /// Exactly `n` occurrences.
    Exactly(usize),
}

impl Arity {
    /// Resolves a declared arity; invalid declarations are dropped.
    pub fn from_value(value: &Value) -> Option<Arity> {
        match value {
            Value::Str(s) => match s.as_str() {
                "?" => Some(Arity::Optional),
                "*" => Some(Arity::ZeroOrMore),
                "+" => Some(Arity::OneOrMore),
                _ => None,
            },
            Value::Int(n) if *n >= 0 => Some(Arity::Exactly(*n as usize)),
            _ => None,
        }
    }
}

/// How repeated occurrences of an option accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accumulate {
    /// Last occurrence wins (or collects `nargs` values).
    #[default]
    Store,
    /// Every occurrence appends a value.
    Append,
    /// Occurrences are counted, no values taken.
    Count,
}

impl Accumulate {
    pub fn from_name(name: &str) -> Option<Accumulate> {
        match name {
            "store" => Some(Accumulate::Store),
            "append" => Some(Accumulate::Append),
            "count" => Some(Accumulate::Count),
            _ => None,
        }
    }
}

/// A structured field declaration. Every key is optional; when `annotation`
/// is present it is parsed first and the explicit keys override the parsed
/// ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    pub annotation: Option<String>,
    pub dtype: Option<String>,
    pub required: Option<bool>,
    #[serde(alias = "default_value")]
    pub default: Option<Value>,
    pub choices: Option<Vec<Value>>,
    /// `None` = derive flags from the field name; `Some(vec![])` = positional.
    pub flags: Option<Vec<String>>,
    #[serde(deserialize_with = "deserialize_arity")]
    pub nargs: Option<Arity>,
    pub comment: Option<String>,
    pub metavar: Option<String>,
    pub proc: Option<String>,
    #[serde(deserialize_with = "deserialize_accumulate")]
    pub action: Option<Accumulate>,
}

fn deserialize_arity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Arity>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Arity::from_value))
}

fn deserialize_accumulate<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Accumulate>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Accumulate::from_name))
}

impl FieldSpec {
    /// Overlays `self` on top of `base`: explicit keys win.
    fn onto(self, base: FieldSpec) -> FieldSpec {
        FieldSpec {
            annotation: None,
            dtype: self.dtype.or(base.dtype),
            required: self.required.or(base.required),
            default: self.default.or(base.default),
            choices: self.choices.or(base.choices),
            flags: self.flags.or(base.flags),
            nargs: self.nargs.or(base.nargs),
            comment: self.comment.or(base.comment),
            metavar: self.metavar.or(base.metavar),
            proc: self.proc.or(base.proc),
            action: self.action.or(base.action),
        }
    }

    pub fn with_dtype(mut self, dtype: &str) -> Self {
        self.dtype = Some(dtype.to_string());
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_flags(mut self, flags: &[&str]) -> Self {
        self.flags = Some(flags.iter().map(|flag| flag.to_string()).collect());
        self
    }

    /// Marks the field positional (no flags).
    pub fn positional(mut self) -> Self {
        self.flags = Some(Vec::new());
        self
    }

    pub fn with_nargs(mut self, arity: Arity) -> Self {
        self.nargs = Some(arity);
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

/// A field declaration as written by command/table authors.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldDecl {
    /// Compact annotation string, e.g. `"g, hi(*str = hello): greeting"`.
    Text(String),
    /// Structured spec, optionally embedding an annotation.
    Spec(FieldSpec),
}

impl From<&str> for FieldDecl {
    fn from(annotation: &str) -> Self {
        FieldDecl::Text(annotation.to_string())
    }
}

impl From<FieldSpec> for FieldDecl {
    fn from(spec: FieldSpec) -> Self {
        FieldDecl::Spec(spec)
    }
}

impl FieldDecl {
    /// Resolves the declaration into one merged specification.
    pub fn resolve(&self) -> Result<FieldSpec> {
        match self {
            FieldDecl::Text(annotation) => parse_annotation(annotation),
            FieldDecl::Spec(spec) => match &spec.annotation {
                Some(annotation) => Ok(spec.clone().onto(parse_annotation(annotation)?)),
                None => Ok(spec.clone()),
            },
        }
    }
}

/// Normalized description of one argument / column.
///
/// Invariants: `dtype` is always a supported type (unsupported declarations
/// downgrade to text); `choices` and `default_value` are coerced to `dtype`;
/// a field with `flags == Some(vec![])` is positional.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub dtype: DType,
    pub required: bool,
    pub default_value: Option<Value>,
    pub choices: Option<Vec<Value>>,
    pub flags: Option<Vec<String>>,
    pub nargs: Option<Arity>,
    pub comment: Option<String>,
    pub metavar: Option<String>,
    pub proc: Option<String>,
    pub action: Option<Accumulate>,
}

impl FieldDescriptor {
    /// Builds a normalized descriptor from a declaration.
    pub fn new(name: &str, decl: &FieldDecl) -> Result<FieldDescriptor> {
        Ok(FieldDescriptor::from_spec(name, decl.resolve()?))
    }

    /// Normalizes an already-resolved specification.
    pub fn from_spec(name: &str, spec: FieldSpec) -> FieldDescriptor {
        let dtype = spec
            .dtype
            .as_deref()
            .map(DType::resolve)
            .unwrap_or_default();

        let default_value = spec.default.and_then(|value| dtype.cast(&value));
        let choices = spec.choices.and_then(|items| {
            let coerced: Vec<Value> = items.iter().filter_map(|item| dtype.cast(item)).collect();
            (!coerced.is_empty()).then_some(coerced)
        });

        FieldDescriptor {
            name: name.to_string(),
            dtype,
            required: spec.required.unwrap_or(false),
            default_value,
            choices,
            flags: spec.flags,
            nargs: spec.nargs,
            comment: spec.comment,
            metavar: spec.metavar,
            proc: spec.proc,
            action: spec.action,
        }
    }

    /// Whether the field renders as a positional argument.
    pub fn is_positional(&self) -> bool {
        matches!(&self.flags, Some(flags) if flags.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_round_trip() {
        let decl = FieldDecl::from("g, hi(*str[telex] = hello world): greeting");
        let field = FieldDescriptor::new("greeting", &decl).unwrap();
        assert_eq!(field.flags, Some(vec!["g".to_string(), "hi".to_string()]));
        assert_eq!(field.dtype, DType::Str);
        assert_eq!(field.proc.as_deref(), Some("telex"));
        assert!(field.required);
        assert_eq!(field.default_value, Some(Value::Str("hello world".into())));
        assert_eq!(field.comment.as_deref(), Some("greeting"));
    }

    #[test]
    fn test_spec_keys_override_annotation() {
        let spec = FieldSpec {
            annotation: Some("g (str = hi): greeting".to_string()),
            required: Some(true),
            comment: Some("overridden".to_string()),
            ..FieldSpec::default()
        };
        let field = FieldDescriptor::new("greeting", &spec.into()).unwrap();
        assert!(field.required);
        assert_eq!(field.comment.as_deref(), Some("overridden"));
        // Keys absent from the spec keep the parsed annotation values.
        assert_eq!(field.default_value, Some(Value::Str("hi".into())));
        assert_eq!(field.flags, Some(vec!["g".to_string()]));
    }

    #[test]
    fn test_unsupported_dtype_downgrades_to_str() {
        let field =
            FieldDescriptor::new("x", &FieldSpec::default().with_dtype("varchar").into()).unwrap();
        assert_eq!(field.dtype, DType::Str);
    }

    #[test]
    fn test_choices_coerced_to_dtype() {
        let spec = FieldSpec::default()
            .with_dtype("int")
            .with_default("2");
        let mut spec = spec;
        spec.choices = Some(vec![
            Value::Str("0".into()),
            Value::Int(1),
            Value::Str("x".into()),
        ]);
        let field = FieldDescriptor::from_spec("style", spec);
        assert_eq!(field.choices, Some(vec![Value::Int(0), Value::Int(1)]));
        assert_eq!(field.default_value, Some(Value::Int(2)));
    }

    #[test]
    fn test_deserialized_decl_forms() {
        let text: FieldDecl = serde_json::from_str(r#""p (bool = 0): permanent""#).unwrap();
        assert!(matches!(text, FieldDecl::Text(_)));

        let spec: FieldDecl = serde_json::from_str(
            r#"{"annotation": "p (bool = 0)", "comment": "permanent", "nargs": "+", "action": "bogus"}"#,
        )
        .unwrap();
        let field = FieldDescriptor::new("permanent", &spec).unwrap();
        assert_eq!(field.nargs, Some(Arity::OneOrMore));
        // Invalid action values are dropped, not errors.
        assert_eq!(field.action, None);
        assert_eq!(field.default_value, Some(Value::Bool(false)));
    }

    #[test]
    fn test_arity_from_value() {
        assert_eq!(Arity::from_value(&Value::Str("?".into())), Some(Arity::Optional));
        assert_eq!(Arity::from_value(&Value::Int(2)), Some(Arity::Exactly(2)));
        assert_eq!(Arity::from_value(&Value::Str("!".into())), None);
    }
}
