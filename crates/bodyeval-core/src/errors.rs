//! Error types for the bodyeval core library.
//!
//! Per-file extraction problems are not errors: they are reported as
//! [`crate::indexer::pipeline::ExtractionFailure`] values and the run
//! continues. Only the variants below abort an evaluation.

use std::path::PathBuf;

/// Top-level error enum for the bodyeval core library.
#[derive(Debug, thiserror::Error)]
pub enum BodyEvalError {
    #[error("Cannot read root directory {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type BodyEvalResult<T> = Result<T, BodyEvalError>;
