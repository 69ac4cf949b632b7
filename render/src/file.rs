//! File export: a registry of named writers over record lists.
//!
//! The registry maps a format name to a writer function; applications can
//! register their own writers next to the built-in `csv`, `json` and `yaml`
//! ones without touching this crate.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use cmdforge_core::{Record, Value};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{RenderError, Result};

/// Options shared by the built-in writers; unknown writers are free to read
/// what they need from the source record instead.
#[derive(Debug, Clone)]
pub struct FileOptions {
    /// Emit a header row (csv).
    pub headers: bool,
    /// Field separator (csv).
    pub delimiter: u8,
    /// Header label overrides, keyed by column name; column order is never
    /// affected (csv).
    pub rename: IndexMap<String, String>,
    /// Pretty-print with this many spaces per level (json).
    pub indent: Option<usize>,
    /// Sort record keys before writing (json, yaml).
    pub sort_keys: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        FileOptions {
            headers: true,
            delimiter: b',',
            rename: IndexMap::new(),
            indent: None,
            sort_keys: false,
        }
    }
}

impl FileOptions {
    /// Reads writer options out of a parsed argument record; absent or
    /// mistyped keys keep their defaults.
    pub fn from_record(record: &Record) -> FileOptions {
        let mut options = FileOptions::default();
        if let Some(headers) = record.get("headers") {
            options.headers = headers.is_truthy();
        }
        if let Some(Value::Str(delimiter)) = record.get("delimiter") {
            if let Some(&first) = delimiter.as_bytes().first() {
                options.delimiter = first;
            }
        }
        if let Some(Value::Object(rename)) = record.get("rename") {
            options.rename = rename
                .iter()
                .map(|(column, label)| (column.clone(), label.to_string()))
                .collect();
        }
        if let Some(indent) = record.get("indent").and_then(Value::as_int) {
            if indent > 0 {
                options.indent = Some(indent as usize);
            }
        }
        if let Some(sort_keys) = record.get("sort_keys") {
            options.sort_keys = sort_keys.is_truthy();
        }
        options
    }
}

/// Renders a record list into one formatted string.
pub type WriteFn = fn(&[Record], &FileOptions) -> Result<String>;

/// Named file writers.
pub struct FormatRegistry {
    writers: IndexMap<String, WriteFn>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut registry = FormatRegistry {
            writers: IndexMap::new(),
        };
        registry.register("csv", write_csv);
        registry.register("json", write_json);
        registry.register("yaml", write_yaml);
        registry
    }
}

impl FormatRegistry {
    pub fn new() -> FormatRegistry {
        FormatRegistry::default()
    }

    pub fn register(&mut self, name: &str, writer: WriteFn) {
        self.writers.insert(name.to_string(), writer);
    }

    pub fn supported(&self) -> Vec<&str> {
        self.writers.keys().map(String::as_str).collect()
    }

    /// Renders the records with the named writer.
    pub fn render(&self, format: &str, records: &[Record], options: &FileOptions) -> Result<String> {
        let writer = self
            .writers
            .get(format)
            .ok_or_else(|| RenderError::UnknownFormat {
                name: format.to_string(),
            })?;
        writer(records, options)
    }

    /// Renders and either writes to `path` (returning `None`) or returns the
    /// text for the caller to route.
    pub fn export(
        &self,
        format: &str,
        records: &[Record],
        path: Option<&Path>,
        append: bool,
        options: &FileOptions,
    ) -> Result<Option<String>> {
        let text = self.render(format, records, options)?;
        match path {
            Some(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(append)
                    .write(true)
                    .truncate(!append)
                    .open(path)?;
                file.write_all(text.as_bytes())?;
                tracing::debug!(format, path = %path.display(), bytes = text.len(), "records exported");
                Ok(None)
            }
            None => Ok(Some(text)),
        }
    }
}

fn write_csv(records: &[Record], options: &FileOptions) -> Result<String> {
    let Some(first) = records.first() else {
        return Ok(String::new());
    };
    let columns: Vec<&String> = first.keys().collect();

    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(Vec::new());
    if options.headers {
        writer.write_record(columns.iter().map(|column| {
            options
                .rename
                .get(*column)
                .cloned()
                .unwrap_or_else(|| (*column).clone())
        }))?;
    }
    for record in records {
        writer.write_record(columns.iter().map(|column| {
            record
                .get(*column)
                .map(Value::to_string)
                .unwrap_or_default()
        }))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|error| RenderError::Io(error.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn sorted_copy(records: &[Record]) -> Vec<Record> {
    records
        .iter()
        .map(|record| {
            let mut keys: Vec<&String> = record.keys().collect();
            keys.sort();
            keys.into_iter()
                .map(|key| (key.clone(), record[key].clone()))
                .collect()
        })
        .collect()
}

fn write_json(records: &[Record], options: &FileOptions) -> Result<String> {
    let sorted;
    let records: &[Record] = if options.sort_keys {
        sorted = sorted_copy(records);
        &sorted
    } else {
        records
    };
    match options.indent {
        Some(width) => {
            let indent = " ".repeat(width);
            let mut out = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
            let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
            records.serialize(&mut serializer)?;
            Ok(String::from_utf8_lossy(&out).into_owned())
        }
        None => Ok(serde_json::to_string(records)?),
    }
}

fn write_yaml(records: &[Record], options: &FileOptions) -> Result<String> {
    if options.sort_keys {
        Ok(serde_yaml::to_string(&sorted_copy(records))?)
    } else {
        Ok(serde_yaml::to_string(records)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        let mut first = Record::new();
        first.insert("name".to_string(), Value::Str("An".into()));
        first.insert("dob".to_string(), Value::Str("1990-01-01".into()));
        first.insert("age".to_string(), Value::Int(30));
        let mut second = Record::new();
        second.insert("name".to_string(), Value::Str("Binh".into()));
        second.insert("dob".to_string(), Value::Null);
        second.insert("age".to_string(), Value::Int(25));
        vec![first, second]
    }

    #[test]
    fn test_csv_rename_keeps_column_position() {
        let mut options = FileOptions::default();
        options
            .rename
            .insert("dob".to_string(), "date of birth".to_string());
        let text = FormatRegistry::new()
            .render("csv", &records(), &options)
            .unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("name,date of birth,age"));
        assert_eq!(lines.next(), Some("An,1990-01-01,30"));
        assert_eq!(lines.next(), Some("Binh,,25"));
    }

    #[test]
    fn test_csv_headers_toggle_and_delimiter() {
        let options = FileOptions {
            headers: false,
            delimiter: b';',
            ..FileOptions::default()
        };
        let text = FormatRegistry::new()
            .render("csv", &records(), &options)
            .unwrap();
        assert_eq!(text.lines().next(), Some("An;1990-01-01;30"));
    }

    #[test]
    fn test_json_compact_and_indented() {
        let registry = FormatRegistry::new();
        let compact = registry
            .render("json", &records(), &FileOptions::default())
            .unwrap();
        assert!(compact.starts_with(r#"[{"name":"An""#));

        let options = FileOptions {
            indent: Some(2),
            ..FileOptions::default()
        };
        let indented = registry.render("json", &records(), &options).unwrap();
        assert!(indented.contains("\n  {"));
    }

    #[test]
    fn test_json_sort_keys() {
        let options = FileOptions {
            sort_keys: true,
            ..FileOptions::default()
        };
        let text = FormatRegistry::new()
            .render("json", &records(), &options)
            .unwrap();
        assert!(text.starts_with(r#"[{"age":30"#));
    }

    #[test]
    fn test_yaml_block_style() {
        let text = FormatRegistry::new()
            .render("yaml", &records(), &FileOptions::default())
            .unwrap();
        assert!(text.contains("- name: An"));
        assert!(text.contains("  age: 30"));
    }

    #[test]
    fn test_unknown_format_is_an_error() {
        let error = FormatRegistry::new()
            .render("xml", &records(), &FileOptions::default())
            .unwrap_err();
        assert!(matches!(error, RenderError::UnknownFormat { .. }));
    }

    #[test]
    fn test_export_to_path_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.csv");
        let registry = FormatRegistry::new();

        let returned = registry
            .export("csv", &records(), Some(&path), false, &FileOptions::default())
            .unwrap();
        assert!(returned.is_none());

        let options = FileOptions {
            headers: false,
            ..FileOptions::default()
        };
        registry
            .export("csv", &records(), Some(&path), true, &options)
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 5);
    }

    #[test]
    fn test_options_from_record() {
        let mut record = Record::new();
        record.insert("headers".to_string(), Value::Bool(false));
        record.insert("delimiter".to_string(), Value::Str("\t".into()));
        record.insert("indent".to_string(), Value::Int(4));
        let options = FileOptions::from_record(&record);
        assert!(!options.headers);
        assert_eq!(options.delimiter, b'\t');
        assert_eq!(options.indent, Some(4));
        assert!(!options.sort_keys);
    }
}
