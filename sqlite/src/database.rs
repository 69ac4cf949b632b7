//! Database assembly from a declarative schema config.
//!
//! A [`DatabaseConfig`] describes every table (and optional lookup aliases);
//! [`Database`] opens the connection, builds a [`Table`] per entry and
//! resolves names through aliases. Schema files are parsed as JSON first,
//! then YAML.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;
use rusqlite::Connection;
use serde::Deserialize;
use tracing::info;

use cmdforge_core::{TableConfig, TableSchema};

use crate::error::{Result, SqliteError, StorageEntry};
use crate::table::Table;

/// Declared shape of a schema file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Tables keyed by singular name; a missing `singular` in the entry
    /// falls back to the key.
    pub tables: IndexMap<String, TableConfig>,
    /// Extra lookup aliases, alias → table name.
    pub aliases: IndexMap<String, String>,
}

impl DatabaseConfig {
    /// Loads a config from a JSON or YAML schema file.
    pub fn from_file(path: &Path) -> Result<DatabaseConfig> {
        let text = fs::read_to_string(path)?;
        match serde_json::from_str(&text) {
            Ok(config) => Ok(config),
            Err(json_err) => serde_yaml::from_str(&text).map_err(|yaml_err| {
                SqliteError::Config {
                    path: path.display().to_string(),
                    message: format!("{json_err}; {yaml_err}"),
                }
            }),
        }
    }
}

#[derive(Debug)]
pub struct Database {
    tables: IndexMap<String, Table>,
    aliases: IndexMap<String, String>,
}

impl Database {
    /// Opens a database file (in-memory without a path) and builds the
    /// configured tables.
    pub fn open(path: Option<&Path>, config: &DatabaseConfig) -> Result<Database> {
        let conn = match path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        Database::with_connection(Rc::new(conn), config)
    }

    /// Opens a database using a schema file for the config.
    pub fn from_schema_file(path: Option<&Path>, schema_path: &Path) -> Result<Database> {
        let config = DatabaseConfig::from_file(schema_path)?;
        Database::open(path, &config)
    }

    fn with_connection(conn: Rc<Connection>, config: &DatabaseConfig) -> Result<Database> {
        let mut tables = IndexMap::new();
        let mut aliases = IndexMap::new();
        for (key, declared) in &config.tables {
            let mut declared = declared.clone();
            if declared.singular.is_empty() {
                declared.singular = key.clone();
            }
            let schema = TableSchema::from_config(&declared)?;
            aliases.insert(schema.singular.clone(), schema.plural.clone());
            tables.insert(schema.plural.clone(), Table::new(Rc::clone(&conn), schema));
        }
        // Configured aliases may point at either table name form; ones that
        // resolve to nothing are dropped.
        for (alias, target) in &config.aliases {
            let resolved = if tables.contains_key(target) {
                Some(target.clone())
            } else {
                aliases.get(target).cloned()
            };
            if let Some(resolved) = resolved {
                aliases.insert(alias.clone(), resolved);
            }
        }
        info!(tables = tables.len(), "database configured");
        Ok(Database { tables, aliases })
    }

    /// Creates every missing table. Returns whether all succeeded; failures
    /// stay in the tables' error logs.
    pub fn prepare(&self) -> bool {
        self.tables
            .values()
            .fold(true, |ok, table| table.prepare() && ok)
    }

    /// Looks a table up by name, singular name or alias.
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name).or_else(|| {
            self.aliases
                .get(name)
                .and_then(|resolved| self.tables.get(resolved))
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// All errors logged by the tables' most recent operations.
    pub fn errors(&self) -> Vec<StorageEntry> {
        self.tables
            .values()
            .flat_map(|table| table.errors())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCHEMA_JSON: &str = r#"{
        "tables": {
            "person": {
                "plural": "people",
                "columns": {"name": "n (*str): full name"},
                "meta-columns": ["created_at"]
            },
            "task": {
                "columns": {"title": "t (*str): title"}
            }
        },
        "aliases": {"ppl": "people", "todo": "task"}
    }"#;

    #[test]
    fn test_open_and_lookup_by_alias() {
        let config: DatabaseConfig = serde_json::from_str(SCHEMA_JSON).unwrap();
        let db = Database::open(None, &config).unwrap();
        assert!(db.prepare());

        assert_eq!(db.table_names(), ["people", "tasks"]);
        assert_eq!(db.get("people").unwrap().name(), "people");
        assert_eq!(db.get("person").unwrap().name(), "people");
        assert_eq!(db.get("ppl").unwrap().name(), "people");
        // Alias resolved through the singular form.
        assert_eq!(db.get("todo").unwrap().name(), "tasks");
        assert!(db.get("ghosts").is_none());
    }

    #[test]
    fn test_schema_file_yaml_fallback() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "tables:\n  note:\n    columns:\n      body: \"b (*str): text\"\n"
        )
        .unwrap();
        let db = Database::from_schema_file(None, file.path()).unwrap();
        assert_eq!(db.table_names(), ["notes"]);
    }

    #[test]
    fn test_unparseable_schema_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "tables: [not: a: mapping").unwrap();
        let err = Database::from_schema_file(None, file.path()).unwrap_err();
        assert!(matches!(err, SqliteError::Config { .. }));
    }
}
