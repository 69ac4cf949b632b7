//! Declarative table schemas.
//!
//! A [`TableConfig`] is the deserialized shape authors write in a schema
//! file (columns as annotation strings or structured specs); a
//! [`TableSchema`] is the normalized result: ordered column descriptors with
//! an implicit `id` column first and any opted-in meta columns last.

use chrono::Local;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::dtype::DType;
use crate::error::Result;
use crate::field::{FieldDecl, FieldDescriptor, FieldSpec};
use crate::value::{Record, Value};

pub const COLUMN_ID: &str = "id";
pub const COLUMN_CREATED: &str = "created_at";
pub const COLUMN_UPDATED: &str = "updated_at";
pub const COLUMN_DELETED: &str = "deleted_at";

/// Meta columns in canonical order, with the action that stamps each.
const META_COLUMNS: [(&str, &str); 3] = [
    (COLUMN_CREATED, "create"),
    (COLUMN_UPDATED, "update"),
    (COLUMN_DELETED, "delete"),
];

const ALL_LITERAL: &str = "*";
const META_LITERAL: &str = "meta";
const EXCLUDE_PREFIX: char = '^';

/// Declared shape of one table in a schema file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub singular: String,
    pub plural: Option<String>,
    pub columns: IndexMap<String, FieldDecl>,
    #[serde(rename = "meta-columns", alias = "meta_columns")]
    pub meta_columns: Vec<String>,
    pub constraints: Vec<String>,
}

/// Normalized table schema: `id` first, declared columns in order, opted-in
/// meta columns last.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub singular: String,
    pub plural: String,
    pub columns: IndexMap<String, FieldDescriptor>,
    pub meta_columns: Vec<String>,
    pub constraints: Vec<String>,
}

impl TableSchema {
    pub fn from_config(config: &TableConfig) -> Result<TableSchema> {
        let mut columns = IndexMap::new();
        columns.insert(
            COLUMN_ID.to_string(),
            FieldDescriptor::from_spec(COLUMN_ID, FieldSpec::default().with_dtype("int")),
        );
        for (name, decl) in &config.columns {
            columns.insert(name.clone(), FieldDescriptor::new(name, decl)?);
        }

        let mut meta_columns = Vec::new();
        for (name, action) in META_COLUMNS {
            if config.meta_columns.iter().any(|wanted| wanted == name) {
                let mut spec = FieldSpec::default().with_dtype("datetime");
                if action == "create" {
                    spec = spec.with_required(true);
                }
                columns.insert(name.to_string(), FieldDescriptor::from_spec(name, spec));
                meta_columns.push(name.to_string());
            }
        }

        let plural = config
            .plural
            .clone()
            .filter(|plural| !plural.is_empty())
            .unwrap_or_else(|| format!("{}s", config.singular));
        Ok(TableSchema {
            singular: config.singular.clone(),
            plural,
            columns,
            meta_columns,
            constraints: config.constraints.clone(),
        })
    }

    /// SQL table name.
    pub fn name(&self) -> &str {
        &self.plural
    }

    /// Display name for a record count.
    pub fn human_name(&self, count: usize) -> &str {
        if count == 1 { &self.singular } else { &self.plural }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn get(&self, column: &str) -> Option<&FieldDescriptor> {
        self.columns.get(column)
    }

    /// Column-name → dtype mapping in declaration order.
    pub fn dtypes(&self) -> IndexMap<String, DType> {
        self.columns
            .iter()
            .map(|(name, field)| (name.clone(), field.dtype))
            .collect()
    }

    /// Casts every record field to its column dtype; fields for unknown
    /// columns and cast failures are dropped.
    pub fn sanitize_record(&self, record: &Record) -> Record {
        DType::cast_record(record, &self.dtypes())
    }

    /// Timestamp record for a write action, empty when the matching meta
    /// column is not part of this table.
    pub fn meta_value(&self, action: &str) -> Record {
        let mut record = Record::new();
        if let Some((column, _)) = META_COLUMNS.iter().find(|(_, name)| *name == action) {
            if self.contains(column) {
                record.insert(
                    column.to_string(),
                    Value::DateTime(Local::now().naive_local()),
                );
            }
        }
        record
    }

    /// Expands one selector: `*` (all columns), `meta` (meta columns), or a
    /// single column name. Unknown names expand to nothing.
    fn columns_by_name(&self, selector: &str) -> Vec<String> {
        if selector == ALL_LITERAL {
            self.columns.keys().cloned().collect()
        } else if selector == META_LITERAL {
            self.meta_columns.clone()
        } else if self.contains(selector) {
            vec![selector.to_string()]
        } else {
            Vec::new()
        }
    }

    /// Resolves a column selection into concrete names, in declaration order.
    ///
    /// Selectors starting with `^` exclude; plain selectors include. With no
    /// selectors (or none that match) the selection is empty, which readers
    /// treat as "every column". Exclusions win over inclusions only for
    /// columns not explicitly included.
    pub fn filter_columns(&self, selectors: Option<&[String]>) -> Vec<String> {
        let Some(selectors) = selectors.filter(|selectors| !selectors.is_empty()) else {
            return Vec::new();
        };

        let mut includes: Vec<String> = Vec::new();
        let mut excludes: Vec<String> = Vec::new();
        for selector in selectors {
            match selector.strip_prefix(EXCLUDE_PREFIX) {
                Some(rest) => excludes.extend(self.columns_by_name(rest)),
                None => includes.extend(self.columns_by_name(selector)),
            }
        }

        let selected: Vec<&String> = if excludes.is_empty() {
            if includes.is_empty() {
                self.columns.keys().collect()
            } else {
                self.columns
                    .keys()
                    .filter(|column| includes.contains(column))
                    .collect()
            }
        } else {
            self.columns
                .keys()
                .filter(|column| includes.contains(column) || !excludes.contains(column))
                .collect()
        };
        selected.into_iter().cloned().collect()
    }
}
