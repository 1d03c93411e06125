//! Error types for the TextSpace pipeline.

use thiserror::Error;

/// Broad category of a [`TextSpaceError`].
///
/// Callers that only need to decide how to present a failure match on this
/// instead of on the individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input (missing column, empty batch, duplicate title, null cell)
    Validation,
    /// Unsupported strategy name, reducer target or configuration value
    Configuration,
    /// Internal consistency failure between pipeline stages
    InvariantViolation,
    /// Failure inside an injected pretrained model backend
    Model,
}

/// Errors raised by the TextSpace pipeline.
#[derive(Debug, Error)]
pub enum TextSpaceError {
    /// A required column is absent from the input table
    #[error("column '{column}' not in table")]
    MissingColumn { column: String },

    /// A required column holds a null value
    #[error("column '{column}' contains a null value at row {row}")]
    NullValue { column: String, row: usize },

    /// Two documents of one batch share a title
    #[error("duplicate title '{title}' at rows {first} and {second}")]
    DuplicateTitle {
        title: String,
        first: usize,
        second: usize,
    },

    /// Any other invalid input
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Stage outputs disagree with each other
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Pretrained model backend failure
    #[error("model error ({backend}): {message}")]
    Model { backend: String, message: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TextSpaceError {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingColumn { .. }
            | Self::NullValue { .. }
            | Self::DuplicateTitle { .. }
            | Self::Validation(_) => ErrorKind::Validation,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::InvariantViolation(_) | Self::Serialization(_) => ErrorKind::InvariantViolation,
            Self::Model { .. } => ErrorKind::Model,
        }
    }

    /// Shorthand for a [`TextSpaceError::Model`] error.
    pub fn model(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

/// Result type alias using [`TextSpaceError`].
pub type Result<T> = std::result::Result<T, TextSpaceError>;
