//! RIFF/WAVE serialization.
//!
//! # Binary Layout
//!
//! - `RIFF` + u32 size + `WAVE`
//! - chunks in insertion order, each `tag` + u32 size + payload + pad byte
//!   when the payload length is odd

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::chunk::{Chunk, MAX_CHUNK_SIZE};
use crate::error::{FormatError, Result};
use crate::header::{CHUNK_HEADER_SIZE, RIFF_HEADER_SIZE, RIFF_MAGIC, WAVE_MAGIC};

/// Total size of the serialized image for the given chunks.
pub fn image_size(chunks: &[Chunk]) -> u64 {
    RIFF_HEADER_SIZE as u64
        + chunks
            .iter()
            .map(|c| CHUNK_HEADER_SIZE as u64 + padded(c.len() as u64))
            .sum::<u64>()
}

fn padded(size: u64) -> u64 {
    size + (size & 1)
}

/// Write a complete RIFF/WAVE image to `writer`.
///
/// # Errors
///
/// Returns [`FormatError::AllocationTooLarge`] if the image would overflow the
/// 32-bit RIFF size field, or [`FormatError::Io`] on write failure.
pub fn write_riff<W: Write>(writer: &mut W, chunks: &[Chunk]) -> Result<()> {
    let total = image_size(chunks);
    let riff_size = total - 8;
    if riff_size > MAX_CHUNK_SIZE {
        return Err(FormatError::AllocationTooLarge {
            requested: riff_size,
            limit: MAX_CHUNK_SIZE,
        });
    }

    writer.write_all(&RIFF_MAGIC)?;
    writer.write_u32::<LittleEndian>(riff_size as u32)?;
    writer.write_all(&WAVE_MAGIC)?;

    for chunk in chunks {
        writer.write_all(chunk.tag().as_bytes())?;
        writer.write_u32::<LittleEndian>(chunk.len() as u32)?;
        writer.write_all(chunk.data())?;
        if chunk.len() % 2 == 1 {
            writer.write_u8(0)?;
        }
        tracing::debug!(tag = %chunk.tag(), size = chunk.len(), "Wrote chunk");
    }
    Ok(())
}

/// Sibling path used while a container is being written.
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Write the image to the staging file, then rename it over `path`.
///
/// On failure the staging file is removed and any previous file at `path`
/// is left untouched.
pub(crate) fn commit(path: &Path, staging: File, chunks: &[Chunk]) -> Result<()> {
    let staged = staging_path(path);
    let result = (|| -> Result<()> {
        let mut writer = BufWriter::new(staging);
        write_riff(&mut writer, chunks)?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| FormatError::Io(e.into_error()))?
            .sync_all()?;
        std::fs::rename(&staged, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&staged);
    }
    result
}
