//! Error types for the container crate.

use thiserror::Error;

use crate::chunk::ChunkTag;

/// Errors that can occur when reading or writing RIFF/WAVE containers.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Invalid RIFF header: expected RIFF....WAVE")]
    InvalidMagic,

    #[error("Truncated container: {context} needs {needed} bytes at offset {offset}, have {available}")]
    Truncated {
        context: &'static str,
        offset: u64,
        needed: u64,
        available: u64,
    },

    #[error("Chunk '{tag}' too large: {size} bytes (limit {limit})")]
    ChunkTooLarge { tag: ChunkTag, size: u64, limit: u64 },

    #[error("Allocation too large: requested {requested} bytes, limit is {limit} bytes")]
    AllocationTooLarge { requested: u64, limit: u64 },

    #[error("Invalid chunk tag {0:?}: must be four printable ASCII bytes")]
    InvalidTag(String),

    #[error("Invalid fmt chunk: {0}")]
    InvalidWaveFormat(String),

    #[error("Container is open read-only; cannot add chunk '{0}'")]
    ReadOnly(ChunkTag),

    #[error("Container is already closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FormatError>;
