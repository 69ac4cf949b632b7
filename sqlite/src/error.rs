//! Error types and the per-operation storage error log.
//!
//! Table operations never raise storage errors to the command layer: they
//! return affected-row counts or record lists and log what went wrong as
//! [`StorageEntry`] items, cleared at the start of the next operation.
//! [`SqliteError`] is reserved for setup failures (opening the database,
//! loading the schema config), which are fatal.

use thiserror::Error;

/// Fatal setup errors.
#[derive(Debug, Error)]
pub enum SqliteError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("schema config [{path}] could not be parsed as JSON or YAML: {message}")]
    Config { path: String, message: String },

    #[error(transparent)]
    Meta(#[from] cmdforge_core::MetaError),
}

/// One logged storage failure.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageEntry {
    /// Table the operation ran against.
    pub table: String,
    /// Short error kind, e.g. `ConstraintViolation` or `InvalidInput`.
    pub kind: String,
    pub message: String,
    /// The SQL that failed, when one was built.
    pub sql: Option<String>,
    /// Rendered parameter data, for debugging output.
    pub data: Option<String>,
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T, E = SqliteError> = std::result::Result<T, E>;
