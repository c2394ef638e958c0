//! Error types for the ADM chunk codec.

use adm_format::FormatError;
use adm_model::ModelError;
use thiserror::Error;

/// Coarse classification of codec failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The graph violates a reference or ordering rule.
    Structural,
    /// A chunk is truncated or malformed.
    Format,
    /// The container could not be read or written.
    Resource,
    /// The operation could not start at all.
    Fatal,
}

/// Errors that can occur while encoding or decoding ADM chunks.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("chna chunk declares {declared} records but only {available} fit in the data")]
    TruncatedIndex { declared: usize, available: usize },

    #[error("chna record {record}: {reason}")]
    BadIndexField { record: usize, reason: String },

    #[error("invalid ADM time '{0}': expected hh:mm:ss.fffffffff")]
    InvalidTime(String),

    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: String, value: String },

    #[error("{from} references unknown id '{id}'")]
    UnknownReference { from: String, id: String },

    #[error("missing {0}")]
    MissingElement(String),

    #[error("duplicate id '{0}'")]
    DuplicateId(String),

    #[error("tree backend error: {0}")]
    Backend(String),

    #[error("no tree backend registered")]
    NoBackend,

    #[error("tree backend '{0}' is not registered")]
    UnknownBackend(String),

    #[error("graph is not finalized: {0}")]
    NotFinalized(String),

    #[error(transparent)]
    Structural(#[from] ModelError),

    #[error(transparent)]
    Container(#[from] FormatError),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl CodecError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CodecError::Structural(_) | CodecError::NotFinalized(_) => ErrorCategory::Structural,
            CodecError::NoBackend | CodecError::UnknownBackend(_) => ErrorCategory::Fatal,
            CodecError::Container(FormatError::Io(_)) | CodecError::Container(FormatError::Closed) => {
                ErrorCategory::Resource
            }
            CodecError::Container(FormatError::ReadOnly(_)) => ErrorCategory::Resource,
            CodecError::SerdeJson(_) => ErrorCategory::Fatal,
            _ => ErrorCategory::Format,
        }
    }
}

/// A convenience result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
