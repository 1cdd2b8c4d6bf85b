//! Prompt store and compiler errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the prompt library
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Invalid {field} '{value}': must be a single path component")]
    InvalidName { field: &'static str, value: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode {origin}: {message}")]
    Decode { origin: String, message: String },

    #[error("Failed to encode templates: {0}")]
    Encode(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan prompts directory: {0}")]
    Walk(#[from] walkdir::Error),
}

impl PromptError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn decode(origin: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            origin: origin.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PromptError>;
