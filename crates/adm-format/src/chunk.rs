//! Chunk tags, chunk payloads and the container capability trait.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};

/// Largest payload a single RIFF chunk can describe (its size field is a u32).
pub const MAX_CHUNK_SIZE: u64 = u32::MAX as u64;

/// A four-character RIFF chunk identifier such as `fmt ` or `axml`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkTag([u8; 4]);

impl ChunkTag {
    /// Wave format description.
    pub const FMT: ChunkTag = ChunkTag(*b"fmt ");
    /// Audio sample data.
    pub const DATA: ChunkTag = ChunkTag(*b"data");
    /// ADM track index (binary, one record per track UID).
    pub const CHNA: ChunkTag = ChunkTag(*b"chna");
    /// ADM XML tree.
    pub const AXML: ChunkTag = ChunkTag(*b"axml");
    /// Broadcast extension (carried opaquely).
    pub const BEXT: ChunkTag = ChunkTag(*b"bext");

    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    fn is_valid(bytes: &[u8; 4]) -> bool {
        bytes.iter().all(|b| (0x20..0x7F).contains(b))
    }
}

impl FromStr for ChunkTag {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes: [u8; 4] = s
            .as_bytes()
            .try_into()
            .map_err(|_| FormatError::InvalidTag(s.to_string()))?;
        if !Self::is_valid(&bytes) {
            return Err(FormatError::InvalidTag(s.to_string()));
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkTag({self})")
    }
}

/// A tagged chunk held by a container.
///
/// Data is accumulated in memory and only reaches the disk when the owning
/// container is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    tag: ChunkTag,
    data: Vec<u8>,
}

impl Chunk {
    pub fn new(tag: ChunkTag) -> Self {
        Self {
            tag,
            data: Vec::new(),
        }
    }

    pub(crate) fn with_data(tag: ChunkTag, data: Vec<u8>) -> Self {
        Self { tag, data }
    }

    pub fn tag(&self) -> ChunkTag {
        self.tag
    }

    /// Append bytes to the chunk payload.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::ChunkTooLarge`] if the payload would no longer fit
    /// in a RIFF size field. The chunk is left unchanged in that case.
    pub fn write_data(&mut self, bytes: &[u8]) -> Result<()> {
        let size = self.data.len() as u64 + bytes.len() as u64;
        if size > MAX_CHUNK_SIZE {
            return Err(FormatError::ChunkTooLarge {
                tag: self.tag,
                size,
                limit: MAX_CHUNK_SIZE,
            });
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// The chunk payload (without header or pad byte).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.data.clear();
    }
}

/// Capability interface of a tagged-chunk container.
///
/// The ADM codec only needs to add and look up chunks by tag; file lifecycle
/// (create/open/close) belongs to the concrete container.
pub trait ChunkContainer {
    /// Add a chunk with the given tag and return it for writing.
    ///
    /// Tags are unique within a container: adding a tag that already exists
    /// returns the existing chunk with its payload cleared.
    fn add_chunk(&mut self, tag: ChunkTag) -> Result<&mut Chunk>;

    /// Look up a chunk by tag.
    fn get_chunk(&self, tag: ChunkTag) -> Option<&Chunk>;

    /// Tags of every chunk in file order.
    fn chunk_tags(&self) -> Vec<ChunkTag>;
}
