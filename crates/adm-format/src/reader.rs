//! RIFF/WAVE parsing: splits a container image into its tagged chunks.
//!
//! Every size field is checked against the bytes actually present before any
//! payload is copied, so a truncated or hostile file produces
//! [`FormatError::Truncated`] instead of an out-of-bounds read.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::chunk::{Chunk, ChunkTag};
use crate::error::{FormatError, Result};
use crate::header::{CHUNK_HEADER_SIZE, RIFF_HEADER_SIZE, RIFF_MAGIC, WAVE_MAGIC};

/// Default per-chunk memory limit (256 MiB).
pub const DEFAULT_ALLOCATION_LIMIT: u64 = 256 * 1024 * 1024;

/// Parse a complete RIFF/WAVE image into chunks, in file order.
///
/// Chunks with tags that are not printable ASCII are logged and skipped.
/// A RIFF size field that overstates the image is tolerated (some writers
/// never patch it), but a chunk whose payload runs past the end is not.
///
/// # Errors
///
/// - [`FormatError::InvalidMagic`] if the preamble is not `RIFF....WAVE`.
/// - [`FormatError::Truncated`] if a chunk header or payload is cut short.
/// - [`FormatError::AllocationTooLarge`] if a chunk exceeds `allocation_limit`.
pub fn parse_riff(image: &[u8], allocation_limit: u64) -> Result<Vec<Chunk>> {
    if image.len() < RIFF_HEADER_SIZE {
        return Err(FormatError::Truncated {
            context: "RIFF header",
            offset: 0,
            needed: RIFF_HEADER_SIZE as u64,
            available: image.len() as u64,
        });
    }

    let mut cursor = Cursor::new(image);
    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    let riff_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut form = [0u8; 4];
    cursor.read_exact(&mut form)?;
    if magic != RIFF_MAGIC || form != WAVE_MAGIC {
        return Err(FormatError::InvalidMagic);
    }

    let declared_end = riff_size + 8;
    let end = if declared_end > image.len() as u64 {
        tracing::warn!(
            declared = declared_end,
            actual = image.len(),
            "RIFF size exceeds file length; parsing to end of file"
        );
        image.len() as u64
    } else {
        declared_end
    };

    let mut chunks = Vec::new();
    let mut offset = RIFF_HEADER_SIZE as u64;

    while offset < end {
        if end - offset < CHUNK_HEADER_SIZE as u64 {
            // Trailing junk shorter than a chunk header.
            tracing::warn!(offset, remaining = end - offset, "Ignoring trailing bytes");
            break;
        }

        cursor.set_position(offset);
        let mut tag_bytes = [0u8; 4];
        cursor.read_exact(&mut tag_bytes)?;
        let size = cursor.read_u32::<LittleEndian>()? as u64;
        let data_start = offset + CHUNK_HEADER_SIZE as u64;

        if data_start + size > end {
            return Err(FormatError::Truncated {
                context: "chunk payload",
                offset: data_start,
                needed: size,
                available: end - data_start,
            });
        }
        if size > allocation_limit {
            return Err(FormatError::AllocationTooLarge {
                requested: size,
                limit: allocation_limit,
            });
        }

        let tag = ChunkTag::new(tag_bytes);
        if tag_bytes.iter().all(|b| (0x20..0x7F).contains(b)) {
            let data = image[data_start as usize..(data_start + size) as usize].to_vec();
            tracing::debug!(%tag, offset, size, "Parsed chunk");
            chunks.push(Chunk::with_data(tag, data));
        } else {
            tracing::warn!(
                offset,
                tag = format!("{:02X?}", tag_bytes),
                "Skipping chunk with non-ASCII tag"
            );
        }

        // Payloads are padded to an even length.
        offset = data_start + size + (size & 1);
    }

    Ok(chunks)
}
