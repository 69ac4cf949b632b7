//! Error types for rendering and export.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// A file export asked for a format no writer is registered for.
    #[error("no writer registered for format [{name}]")]
    UnknownFormat { name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`RenderError`].
pub type Result<T, E = RenderError> = std::result::Result<T, E>;
