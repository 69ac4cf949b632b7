//! Compact field annotation grammar.
//!
//! Fields can be declared with a single string of the shape
//! `[METAVAR] <flags> (<datatype>): <comment>` where every part is optional:
//!
//! - `[METAVAR]` — display-name override for help text
//! - `<flags>` — comma-separated option aliases, or a bare `*` for a
//!   positional argument
//! - `(<datatype>)` — `<*?><type>[<proc>]?: [choices]? = default?`; a
//!   leading `*` marks the field required
//! - `: <comment>` — free help text; the grammar anchors the datatype clause
//!   to the first top-level parentheses pair, so colons or parentheses
//!   inside the comment are not mis-parsed
//!
//! A string that does not match the outer grammar yields an empty
//! declaration (no constraints). A datatype clause that does not match its
//! grammar is a definition-time error.

use std::sync::LazyLock;

use regex::Regex;

use crate::dtype::DType;
use crate::error::{MetaError, Result};
use crate::field::FieldSpec;
use crate::value::Value;

/// `[metavar] flags (datatype): comment` — anchored, all parts optional.
static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:\[\s*(\w+)\s*\])?([^():]*?)(?:\((.+?)\))?\s*(?::(.+))?$")
        .expect("valid annotation regex")
});

/// `<*?><type>[<proc>]?: [choices]? = default?` — anchored.
static DATATYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*?\w+)(?:\[(\w+)\])?(?::\s*(\[.+?\]))?\s*(?:=\s*(.+))?$")
        .expect("valid datatype regex")
});

const DATATYPE_GRAMMAR: &str = "<*?><dtype>[<proc>]?<: [choices]>? <= default>?";

/// Parses an annotation string into a partial field specification.
///
/// Outer-grammar mismatches degrade to an empty specification; datatype
/// clause mismatches are fatal.
pub fn parse_annotation(annotation: &str) -> Result<FieldSpec> {
    let Some(captures) = ANNOTATION_RE.captures(annotation) else {
        tracing::warn!(annotation, "annotation does not match the outer grammar, ignoring");
        return Ok(FieldSpec::default());
    };

    let mut spec = match captures.get(3) {
        Some(clause) => parse_datatype_clause(clause.as_str())?,
        None => FieldSpec::default(),
    };
    spec.metavar = captures.get(1).map(|m| m.as_str().to_string());
    spec.flags = parse_flags(captures.get(2).map(|m| m.as_str()).unwrap_or_default());
    spec.comment = captures
        .get(4)
        .map(|m| m.as_str().trim().to_string())
        .filter(|comment| !comment.is_empty());
    Ok(spec)
}

/// Splits the flag list; `*` means "no flags" (positional).
fn parse_flags(flags: &str) -> Option<Vec<String>> {
    let flags = flags.trim();
    if flags.is_empty() {
        return None;
    }
    if flags == "*" {
        return Some(Vec::new());
    }
    Some(flags.split(',').map(|flag| flag.trim().to_string()).collect())
}

fn parse_datatype_clause(clause: &str) -> Result<FieldSpec> {
    let clause = clause.trim();
    let Some(captures) = DATATYPE_RE.captures(clause) else {
        return Err(MetaError::InvalidAnnotation {
            clause: clause.to_string(),
            expected: DATATYPE_GRAMMAR.to_string(),
        });
    };

    let mut dtype_name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let required = dtype_name.starts_with('*');
    if required {
        dtype_name = &dtype_name[1..];
    }

    let mut spec = FieldSpec {
        dtype: Some(dtype_name.to_string()),
        proc: captures.get(2).map(|m| m.as_str().to_string()),
        required: required.then_some(true),
        ..FieldSpec::default()
    };

    if let Some(choices) = captures.get(3) {
        if let Some(Value::Array(items)) = DType::Array.cast(&Value::Str(choices.as_str().into())) {
            spec.choices = Some(items);
        }
    }
    if let Some(default) = captures.get(4) {
        let dtype = DType::resolve(dtype_name);
        if let Ok(value) = dtype.parse_text(default.as_str()) {
            spec.default = Some(value);
        }
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_full_annotation() {
        let spec = parse_annotation("g, hi(*str[telex] = hello world): greeting").unwrap();
        assert_eq!(spec.flags, Some(vec!["g".to_string(), "hi".to_string()]));
        assert_eq!(spec.dtype.as_deref(), Some("str"));
        assert_eq!(spec.proc.as_deref(), Some("telex"));
        assert_eq!(spec.required, Some(true));
        assert_eq!(spec.default, Some(Value::Str("hello world".into())));
        assert_eq!(spec.comment.as_deref(), Some("greeting"));
    }

    #[test]
    fn test_choices_and_default() {
        let spec = parse_annotation("f (int: [0, 1, 2] = 1): table style").unwrap();
        assert_eq!(
            spec.choices,
            Some(vec![Value::Int(0), Value::Int(1), Value::Int(2)])
        );
        assert_eq!(spec.default, Some(Value::Int(1)));
        assert_eq!(spec.comment.as_deref(), Some("table style"));
    }

    #[test]
    fn test_positional_star() {
        let spec = parse_annotation("* (array[str]): columns to extract").unwrap();
        assert_eq!(spec.flags, Some(Vec::new()));
        assert_eq!(spec.dtype.as_deref(), Some("array"));
        assert_eq!(spec.proc.as_deref(), Some("str"));
    }

    #[test]
    fn test_metavar_prefix() {
        let spec = parse_annotation("[PATH] p (str): path to the file").unwrap();
        assert_eq!(spec.metavar.as_deref(), Some("PATH"));
        assert_eq!(spec.flags, Some(vec!["p".to_string()]));
    }

    #[test]
    fn test_comment_only() {
        let spec = parse_annotation(": set to delete permanently").unwrap();
        assert_eq!(spec.comment.as_deref(), Some("set to delete permanently"));
        assert!(spec.dtype.is_none());
        assert!(spec.flags.is_none());
    }

    #[test]
    fn test_comment_with_colon_and_parens() {
        // The datatype clause anchors to the first top-level parentheses; the
        // comment is whatever trails the next top-level colon.
        let spec = parse_annotation("w (array[int]): width scale: 2 means twice (wider)").unwrap();
        assert_eq!(spec.dtype.as_deref(), Some("array"));
        assert_eq!(
            spec.comment.as_deref(),
            Some("width scale: 2 means twice (wider)")
        );
    }

    #[test]
    fn test_invalid_datatype_clause_is_fatal() {
        let error = parse_annotation("x (= broken)").unwrap_err();
        assert!(matches!(error, MetaError::InvalidAnnotation { .. }));
    }

    #[test]
    fn test_unparseable_outer_annotation_degrades_to_empty() {
        let spec = parse_annotation("weird ) stuff ( here").unwrap();
        assert!(spec.dtype.is_none());
        assert!(spec.comment.is_none());
    }
}
