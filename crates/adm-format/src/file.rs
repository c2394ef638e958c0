//! Broadcast Wave file: create/open/close lifecycle around a chunk list.
//!
//! Chunk payloads live in memory while the file is open. A file created for
//! writing reserves a staging file next to the target at [`BwfFile::create`]
//! time (so permission problems surface before any work is done) and only
//! replaces the target on [`BwfFile::close`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use adm_format::{BwfFile, ChunkContainer, ChunkTag, WaveFormat};
//!
//! let mut file = BwfFile::create(Path::new("mix.wav"), WaveFormat::pcm(2, 48000, 24)).unwrap();
//! file.add_chunk(ChunkTag::AXML).unwrap().write_data(b"<ebuCoreMain/>").unwrap();
//! file.close().unwrap();
//!
//! let file = BwfFile::open(Path::new("mix.wav")).unwrap();
//! assert!(file.get_chunk(ChunkTag::AXML).is_some());
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::chunk::{Chunk, ChunkContainer, ChunkTag};
use crate::error::{FormatError, Result};
use crate::header::WaveFormat;
use crate::reader::{parse_riff, DEFAULT_ALLOCATION_LIMIT};
use crate::writer::{commit, staging_path, write_riff};

#[derive(Debug)]
enum Mode {
    /// Opened from disk; chunks may be read but not added.
    Read,
    /// Created for writing; the staging file is held until close.
    Write { path: PathBuf, staging: File },
    /// In-memory image; never touches the disk.
    Memory,
    Closed,
}

/// A RIFF/WAVE container holding tagged chunks.
#[derive(Debug)]
pub struct BwfFile {
    chunks: Vec<Chunk>,
    mode: Mode,
}

impl BwfFile {
    /// An empty, writable, in-memory container.
    pub fn in_memory() -> Self {
        Self {
            chunks: Vec::new(),
            mode: Mode::Memory,
        }
    }

    /// Create a new file at `path` with the given sample layout.
    ///
    /// A `fmt ` chunk and an empty `data` chunk are added immediately.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Io`] if the staging file cannot be created.
    pub fn create(path: &Path, format: WaveFormat) -> Result<Self> {
        tracing::info!(path = %path.display(), "Creating BWF file");
        let staging = File::create(staging_path(path))?;
        let mut file = Self {
            chunks: Vec::new(),
            mode: Mode::Write {
                path: path.to_path_buf(),
                staging,
            },
        };
        file.add_chunk(ChunkTag::FMT)?
            .write_data(&format.to_bytes())?;
        file.add_chunk(ChunkTag::DATA)?;
        Ok(file)
    }

    /// Open and parse an existing file read-only.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_limit(path, DEFAULT_ALLOCATION_LIMIT)
    }

    /// Open with a custom per-chunk allocation limit.
    pub fn open_with_limit(path: &Path, allocation_limit: u64) -> Result<Self> {
        tracing::info!(path = %path.display(), "Opening BWF file");
        let image = std::fs::read(path)?;
        let chunks = parse_riff(&image, allocation_limit)?;
        tracing::info!(count = chunks.len(), size = image.len(), "Parsed chunk list");
        Ok(Self {
            chunks,
            mode: Mode::Read,
        })
    }

    /// Parse an in-memory RIFF image; the result is writable.
    pub fn from_bytes(image: &[u8]) -> Result<Self> {
        let chunks = parse_riff(image, DEFAULT_ALLOCATION_LIMIT)?;
        Ok(Self {
            chunks,
            mode: Mode::Memory,
        })
    }

    /// Serialize the current chunk list to a RIFF image.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut image = Vec::new();
        write_riff(&mut image, &self.chunks)?;
        Ok(image)
    }

    /// The parsed `fmt ` chunk, if present.
    pub fn wave_format(&self) -> Option<Result<WaveFormat>> {
        self.get_chunk(ChunkTag::FMT)
            .map(|chunk| WaveFormat::parse(chunk.data()))
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Finish the file.
    ///
    /// For a file from [`create`](BwfFile::create) this writes every chunk to
    /// the staging file and renames it over the target. This is a blocking,
    /// must-complete step: if it fails the target is left as it was.
    /// For read-only and in-memory containers it is a no-op.
    pub fn close(mut self) -> Result<()> {
        match std::mem::replace(&mut self.mode, Mode::Closed) {
            Mode::Write { path, staging } => {
                tracing::info!(
                    path = %path.display(),
                    chunks = self.chunks.len(),
                    "Closing BWF file"
                );
                commit(&path, staging, &self.chunks)
            }
            Mode::Closed => Err(FormatError::Closed),
            Mode::Read | Mode::Memory => Ok(()),
        }
    }
}

impl ChunkContainer for BwfFile {
    fn add_chunk(&mut self, tag: ChunkTag) -> Result<&mut Chunk> {
        match self.mode {
            Mode::Read => return Err(FormatError::ReadOnly(tag)),
            Mode::Closed => return Err(FormatError::Closed),
            Mode::Write { .. } | Mode::Memory => {}
        }

        if let Some(index) = self.chunks.iter().position(|c| c.tag() == tag) {
            tracing::debug!(%tag, "Replacing existing chunk");
            let chunk = &mut self.chunks[index];
            chunk.clear();
            return Ok(chunk);
        }

        tracing::debug!(%tag, "Adding chunk");
        self.chunks.push(Chunk::new(tag));
        let last = self.chunks.len() - 1;
        Ok(&mut self.chunks[last])
    }

    fn get_chunk(&self, tag: ChunkTag) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.tag() == tag)
    }

    fn chunk_tags(&self) -> Vec<ChunkTag> {
        self.chunks.iter().map(Chunk::tag).collect()
    }
}

impl Drop for BwfFile {
    fn drop(&mut self) {
        // A writer dropped without close leaves no staging file behind.
        if let Mode::Write { path, .. } = &self.mode {
            tracing::warn!(path = %path.display(), "BWF file dropped without close; discarding");
            let _ = std::fs::remove_file(staging_path(path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_round_trip() {
        let mut file = BwfFile::in_memory();
        file.add_chunk(ChunkTag::CHNA)
            .unwrap()
            .write_data(&[0, 1, 2])
            .unwrap();
        let image = file.to_bytes().unwrap();

        let reopened = BwfFile::from_bytes(&image).unwrap();
        assert_eq!(reopened.get_chunk(ChunkTag::CHNA).unwrap().data(), &[0, 1, 2]);
        assert_eq!(reopened.chunk_tags(), vec![ChunkTag::CHNA]);
    }

    #[test]
    fn test_add_existing_tag_replaces() {
        let mut file = BwfFile::in_memory();
        file.add_chunk(ChunkTag::AXML).unwrap().write_data(b"old").unwrap();
        file.add_chunk(ChunkTag::AXML).unwrap().write_data(b"new").unwrap();
        assert_eq!(file.chunks().len(), 1);
        assert_eq!(file.get_chunk(ChunkTag::AXML).unwrap().data(), b"new");
    }

    #[test]
    fn test_create_close_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adm.wav");

        let mut file = BwfFile::create(&path, WaveFormat::pcm(2, 48000, 24)).unwrap();
        file.add_chunk(ChunkTag::AXML).unwrap().write_data(b"<x/>").unwrap();
        assert!(!path.exists());
        file.close().unwrap();
        assert!(path.exists());
        assert!(!staging_path(&path).exists());

        let file = BwfFile::open(&path).unwrap();
        assert_eq!(
            file.chunk_tags(),
            vec![ChunkTag::FMT, ChunkTag::DATA, ChunkTag::AXML]
        );
        let fmt = file.wave_format().unwrap().unwrap();
        assert_eq!(fmt.sample_rate, 48000);
        assert_eq!(fmt.channels, 2);
    }

    #[test]
    fn test_open_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.wav");
        BwfFile::create(&path, WaveFormat::pcm(1, 48000, 16))
            .unwrap()
            .close()
            .unwrap();

        let mut file = BwfFile::open(&path).unwrap();
        assert!(matches!(
            file.add_chunk(ChunkTag::CHNA),
            Err(FormatError::ReadOnly(_))
        ));
    }

    #[test]
    fn test_create_in_missing_directory_fails_early() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.wav");
        assert!(matches!(
            BwfFile::create(&path, WaveFormat::pcm(1, 48000, 16)),
            Err(FormatError::Io(_))
        ));
    }

    #[test]
    fn test_drop_without_close_discards() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dropped.wav");
        {
            let _file = BwfFile::create(&path, WaveFormat::pcm(1, 48000, 16)).unwrap();
        }
        assert!(!path.exists());
        assert!(!staging_path(&path).exists());
    }
}
