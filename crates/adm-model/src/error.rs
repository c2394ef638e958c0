//! Error types for the ADM model crate.

use thiserror::Error;

use crate::entity::Handle;
use crate::id::{Kind, TypeDefinition};

/// A single structural defect found while finalizing a graph.
///
/// Entities are named by their label: the canonical ID when one has been
/// assigned, otherwise the name, otherwise the temporary ID.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralIssue {
    #[error("{from}: reference #{index} points outside the graph")]
    DanglingReference { from: String, index: usize },

    #[error("{from}: may not reference {target} ({kind:?})")]
    UnexpectedTarget {
        from: String,
        target: String,
        kind: Kind,
    },

    #[error("{from}: more than one {kind:?} reference")]
    TooManyReferences { from: String, kind: Kind },

    #[error("{from}: missing required {kind:?} reference")]
    MissingReference { from: String, kind: Kind },

    #[error("object {object} does not reach any track")]
    UnreachableObject { object: String },

    #[error("channel {channel}: block #{index} starts before the previous block ends")]
    BlockOrder { channel: String, index: usize },

    #[error("canonical id {id} is used by more than one entity")]
    DuplicateId { id: String },

    #[error("track number {number} is used by more than one track")]
    DuplicateTrackNumber { number: u32 },

    #[error("track numbers skip from {expected} to {found}")]
    NonDenseTrackNumber { expected: u32, found: u32 },
}

/// All errors that can occur in `adm-model` operations.
#[derive(Error, Debug)]
pub enum ModelError {
    /// One or more structural defects; the graph remains inspectable.
    #[error("{} structural issue(s): {}", .0.len(), join_issues(.0))]
    Structural(Vec<StructuralIssue>),

    #[error("handle {0:?} does not belong to this graph")]
    InvalidHandle(Handle),

    #[error("{from:?} cannot reference {to:?}")]
    KindMismatch { from: Kind, to: Kind },

    #[error("expected a {expected:?}, found a {actual:?}")]
    WrongKind { expected: Kind, actual: Kind },

    #[error("{from} already references {existing}; cannot also reference {requested}")]
    Conflict {
        from: String,
        existing: String,
        requested: String,
    },

    #[error("{kind:?} '{name}' exists with type {existing}, requested {requested}")]
    TypeConflict {
        kind: Kind,
        name: String,
        existing: TypeDefinition,
        requested: TypeDefinition,
    },

    #[error("graph is sealed; references cannot change after connect_references")]
    Sealed,

    #[error("{0:?} '{1}' not found")]
    NotFound(Kind, String),

    #[error("identifier space exhausted for {0:?}")]
    IdSpaceExhausted(Kind),

    #[error("invalid ADM identifier '{0}'")]
    InvalidId(String),

    #[error("{0} still carries a temporary id")]
    TemporaryId(String),

    #[error("invalid azimuth {0}: must be -180.0..=180.0")]
    InvalidAzimuth(f64),

    #[error("invalid elevation {0}: must be -90.0..=90.0")]
    InvalidElevation(f64),

    #[error("invalid distance {0}: must be 0.0..=1.0")]
    InvalidDistance(f64),

    #[error("invalid extent {0}: must be finite and non-negative")]
    InvalidExtent(f64),

    #[error("invalid gain {0}: must be finite")]
    InvalidGain(f64),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

fn join_issues(issues: &[StructuralIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A convenience result type for `adm-model` operations.
pub type Result<T> = std::result::Result<T, ModelError>;
