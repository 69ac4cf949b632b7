//! Core metadata types for building declarative command-line applications.
//!
//! This crate turns compact field declarations into ready-to-parse commands:
//!
//! - [`FieldDescriptor`] — a normalized field parsed from the annotation
//!   grammar or a structured [`FieldSpec`].
//! - [`ArgSpec`] / [`CommandArgs`] — the bridge from a field to one `clap`
//!   argument and back to typed [`Value`]s.
//! - [`CommandDescriptor`] — a command prototype with ordered arguments and
//!   an optional [`ContextDependency`] that fans the command out per context.
//! - [`Prototype`] / [`CommandRegistry`] — compile descriptors once and
//!   dispatch token lists to handlers.
//! - [`TableSchema`] — declarative table model shared with storage layers.
//!
//! # Example
//!
//! ```
//! use cmdforge_core::*;
//!
//! let mut prototype: Prototype<Vec<String>> = Prototype::new("demo");
//! prototype.command(
//!     "greet",
//!     CommandDescriptor::new("say hello").with_argument("name", "n (str = world): who"),
//!     |log, _context, args| {
//!         log.push(args.get_str("name").unwrap_or_default());
//!         Ok(())
//!     },
//! );
//!
//! let mut registry = CommandRegistry::new();
//! prototype.apply_to(&mut registry, &ContextRegistry::new()).unwrap();
//!
//! let mut log = Vec::new();
//! registry
//!     .dispatch(&mut log, &["greet".to_string(), "-n".to_string(), "you".to_string()])
//!     .unwrap();
//! assert_eq!(log, ["you"]);
//! ```

mod annotation;
mod argspec;
mod command;
mod context;
mod dtype;
mod error;
mod field;
mod registry;
mod table;
mod text;
mod value;

pub use annotation::parse_annotation;
pub use argspec::{ArgKind, ArgSpec, CommandArgs};
pub use command::{ArgumentsFor, CommandDescriptor, ContextDependency, ParserAttributes, TextParser};
pub use context::{Context, ContextHandle, ContextRegistry, ContextStore};
pub use dtype::{DType, FieldConverter, ProcConverter, field_converter};
pub use error::{CastError, MetaError, Result, RunError};
pub use field::{Accumulate, Arity, FieldDecl, FieldDescriptor, FieldSpec};
pub use registry::{
    CommandKind, CommandRegistry, CompiledCommand, Handler, HandlerError, Outcome, Prototype,
};
pub use table::{
    COLUMN_CREATED, COLUMN_DELETED, COLUMN_ID, COLUMN_UPDATED, TableConfig, TableSchema,
};
pub use text::{fold_ascii, parse_datetime, translate_words};
pub use value::{DATETIME_FORMAT, DATETIME_FORMAT_SHORT, Record, Value};
