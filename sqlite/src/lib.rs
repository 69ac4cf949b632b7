//! SQLite storage for schema-driven shells.
//!
//! Tables come from the same declarative schemas that drive command
//! generation: a [`DatabaseConfig`] names the tables, [`Database`] opens the
//! connection and builds one [`Table`] per entry, and each table offers
//! insert/update/delete/query operations with soft delete and dtype-aware
//! value conversion. Storage failures never bubble into the command layer:
//! they land in a per-operation error log ([`StorageEntry`]).
//!
//! ```
//! use cmdforge_core::{Record, Value};
//! use cmdforge_sqlite::{Database, DatabaseConfig};
//!
//! let config: DatabaseConfig = serde_json::from_str(
//!     r#"{"tables": {"note": {"columns": {"body": "b (*str): text"}}}}"#,
//! )?;
//! let db = Database::open(None, &config)?;
//! assert!(db.prepare());
//!
//! let notes = db.get("notes").unwrap();
//! let mut record = Record::new();
//! record.insert("body".to_string(), Value::Str("remember".into()));
//! let id = notes.insert(&record).unwrap();
//! assert_eq!(
//!     notes.get(id).unwrap().get("body"),
//!     Some(&Value::Str("remember".into()))
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod condition;
mod convert;
mod database;
mod error;
mod sql;
mod table;

pub use condition::{SortOrder, SqlCondition, SqlOp};
pub use convert::{from_storage, to_storage};
pub use database::{Database, DatabaseConfig};
pub use error::{Result, SqliteError, StorageEntry};
pub use table::Table;
