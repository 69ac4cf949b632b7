//! Error types for metadata parsing and command compilation.
//!
//! Two families exist on purpose: [`MetaError`] covers definition-time
//! configuration mistakes (always fatal, raised while commands are being
//! compiled), while [`CastError`] covers runtime text-to-value conversion
//! failures (swallowed by the casting policy, never user-visible).

use thiserror::Error;

/// Definition-time configuration errors.
///
/// These indicate a programming mistake in command or table declarations and
/// are never silently recovered.
#[derive(Debug, Error)]
pub enum MetaError {
    /// A datatype clause inside an annotation did not match the grammar.
    #[error("annotation [{clause}] has invalid format, expect [{expected}]")]
    InvalidAnnotation { clause: String, expected: String },

    /// A field reached the argument builder without a resolved dtype.
    #[error("missing [dtype] on field [{field}] when building its argument")]
    MissingDtype { field: String },

    /// A generated command name is already registered on the application.
    #[error("the command name [{name}] has been used on this application, try another name")]
    DuplicateCommand { name: String },

    /// The context argument-extension hook failed for a context.
    #[error("getting arguments for context [{context}] failed: {message}")]
    ContextArguments { context: String, message: String },

    /// A command descriptor was expanded more than once.
    #[error("the command [{name}] has already been compiled, descriptors expand exactly once")]
    AlreadyCompiled { name: String },
}

/// Runtime conversion failure: a text argument could not be converted to the
/// declared type. The casting policy treats this as "field omitted".
#[derive(Debug, Clone, Error)]
pub enum CastError {
    #[error("value [{input}] is not a valid {target}")]
    Invalid { input: String, target: &'static str },

    #[error("datetime string [{input}] is invalid, try: now, today, +3.days, -2.weeks or %Y%m%d%H%M%S%f")]
    Datetime { input: String },
}

impl CastError {
    pub fn invalid(input: impl Into<String>, target: &'static str) -> Self {
        CastError::Invalid {
            input: input.into(),
            target,
        }
    }

    pub fn datetime(input: impl Into<String>) -> Self {
        CastError::Datetime {
            input: input.into(),
        }
    }
}

/// Dispatch-time failures: the command line could not be turned into a
/// handler invocation, or the handler itself failed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("unknown command [{name}], try [help]")]
    UnknownCommand { name: String },

    /// The tokens did not satisfy the command's parser.
    #[error("{message}")]
    Usage { message: String },

    /// The command handler returned an application error.
    #[error(transparent)]
    Handler(#[from] Box<dyn std::error::Error>),
}

/// Convenience alias for results with [`MetaError`].
pub type Result<T, E = MetaError> = std::result::Result<T, E>;
