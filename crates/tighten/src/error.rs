//! Error types for the tighten library.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which required input was missing or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidInputKind {
    /// No structural model was supplied.
    MissingModel,
    /// No profiling evidence snapshot was supplied.
    MissingEvidence,
    /// No tightening options were supplied.
    MissingOptions,
    /// No decision set was supplied to the reporter.
    MissingDecisions,
    /// Options were supplied but hold out-of-range values.
    InvalidOptions,
}

impl InvalidInputKind {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            InvalidInputKind::MissingModel => "Missing Model",
            InvalidInputKind::MissingEvidence => "Missing Evidence",
            InvalidInputKind::MissingOptions => "Missing Options",
            InvalidInputKind::MissingDecisions => "Missing Decisions",
            InvalidInputKind::InvalidOptions => "Invalid Options",
        }
    }
}

impl fmt::Display for InvalidInputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Main error type for tightening operations.
#[derive(Debug, Error)]
pub enum TightenError {
    /// A required input was absent or invalid. Fatal to the call.
    #[error("Invalid input ({kind}): {message}")]
    InvalidInput {
        kind: InvalidInputKind,
        message: String,
    },

    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker pool could not be constructed.
    #[error("Parallelism error: {0}")]
    Parallelism(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TightenError {
    /// Create an invalid-input error.
    pub fn invalid_input(kind: InvalidInputKind, message: impl Into<String>) -> Self {
        TightenError::InvalidInput {
            kind,
            message: message.into(),
        }
    }

    /// Create an IO error for a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TightenError::Io {
            path: path.into(),
            source,
        }
    }

    /// The invalid-input kind, if this is an invalid-input error.
    pub fn invalid_input_kind(&self) -> Option<InvalidInputKind> {
        match self {
            TightenError::InvalidInput { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Result type alias for tightening operations.
pub type Result<T> = std::result::Result<T, TightenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message() {
        let err = TightenError::invalid_input(InvalidInputKind::MissingModel, "model is required");
        assert_eq!(
            err.to_string(),
            "Invalid input (Missing Model): model is required"
        );
        assert_eq!(err.invalid_input_kind(), Some(InvalidInputKind::MissingModel));
    }

    #[test]
    fn test_config_error_has_no_kind() {
        let err = TightenError::Config("bad".to_string());
        assert!(err.invalid_input_kind().is_none());
    }
}
