//! # adm-format
//!
//! The tagged-chunk container that ADM metadata travels in: a minimal
//! RIFF/WAVE (Broadcast Wave) reader and writer.
//!
//! ## Format Overview
//!
//! A wave file consists of:
//! - **Preamble** (12 bytes): `RIFF`, total size, `WAVE`
//! - **Chunks**: `fmt `, `data`, and any number of extension chunks such as
//!   `chna` (ADM track index) and `axml` (ADM XML)
//!
//! Sample data is carried opaquely; this crate never interprets audio.
//! The ADM codec talks to containers through the [`ChunkContainer`] trait.

pub mod chunk;
pub mod error;
pub mod file;
pub mod header;
pub mod reader;
pub mod writer;

pub use chunk::{Chunk, ChunkContainer, ChunkTag, MAX_CHUNK_SIZE};
pub use error::{FormatError, Result};
pub use file::BwfFile;
pub use header::WaveFormat;
