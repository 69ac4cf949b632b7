//! Shell configuration loading.
//!
//! A config file may be JSON, YAML, or plain `key = value` lines (with one
//! dot-nesting level, `section.key = value`). Keys are uppercased. A missing
//! or unparseable file degrades to an empty config so the shell always
//! starts.

use std::fs;
use std::path::Path;

use cmdforge_core::{Record, Value};
use tracing::debug;

fn from_json(raw: serde_json::Value) -> Value {
    match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => Value::Array(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_uppercase(), from_json(value)))
                .collect(),
        ),
    }
}

fn parse_scalar(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(x) = raw.parse::<f64>() {
        return Value::Float(x);
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Value::Bool(true),
        "false" | "no" | "off" => Value::Bool(false),
        _ => Value::Str(raw.to_string()),
    }
}

fn insert_dotted(config: &mut Record, key: &str, value: Value) {
    match key.split_once('.') {
        Some((section, rest)) => {
            let section = section.trim().to_uppercase();
            let entry = config
                .entry(section)
                .or_insert_with(|| Value::Object(Record::new()));
            if let Value::Object(nested) = entry {
                nested.insert(rest.trim().to_uppercase(), value);
            }
        }
        None => {
            config.insert(key.trim().to_uppercase(), value);
        }
    }
}

fn from_lines(text: &str) -> Record {
    let mut config = Record::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            insert_dotted(&mut config, key, parse_scalar(value.trim()));
        }
    }
    config
}

/// Loads a config file into an uppercase-keyed record.
pub fn load_config(path: &Path) -> Record {
    let Ok(text) = fs::read_to_string(path) else {
        debug!(path = %path.display(), "config file unreadable, starting empty");
        return Record::new();
    };

    let parsed = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .or_else(|| serde_yaml::from_str::<serde_json::Value>(&text).ok());
    match parsed {
        Some(value @ serde_json::Value::Object(_)) => match from_json(value) {
            Value::Object(entries) => entries,
            _ => Record::new(),
        },
        _ => from_lines(&text),
    }
}
