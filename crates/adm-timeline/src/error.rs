//! Error types for the timeline cursors.

use adm_model::{ModelError, Nanos};
use thiserror::Error;

/// Errors raised by [`WriteCursor`](crate::WriteCursor) and
/// [`ReadCursor`](crate::ReadCursor).
#[derive(Error, Debug)]
pub enum CursorError {
    /// The write cursor has been ended and accepts no further writes.
    #[error("cursor is closed")]
    Closed,

    #[error("time {t} ns is before the cursor position {now} ns")]
    TimeReversal { t: Nanos, now: Nanos },

    /// Read cursors only move forward; call `reset` to scan again.
    #[error("cannot seek back to {t} ns; cursor is at {current} ns")]
    SeekBackwards { t: Nanos, current: Nanos },

    #[error("no channel formats registered")]
    NoChannels,

    /// Channels can only be registered before the first `set_position`.
    #[error("cannot register channels after writing has started")]
    AlreadyWriting,

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A convenience result type for cursor operations.
pub type Result<T> = std::result::Result<T, CursorError>;
