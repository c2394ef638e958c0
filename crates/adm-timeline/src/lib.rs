//! # adm-timeline
//!
//! Cursors that move ADM block formats through time.
//!
//! - [`WriteCursor`] turns a stream of timed parameter updates into a
//!   compact, gap-free block sequence, fanned out to every registered
//!   channel format.
//! - [`ReadCursor`] replays one channel's block sequence as a forward-only
//!   cursor that holds the last value.

pub mod error;
pub mod read;
pub mod write;

pub use error::{CursorError, Result};
pub use read::ReadCursor;
pub use write::{Candidate, CursorState, WriteCursor};
