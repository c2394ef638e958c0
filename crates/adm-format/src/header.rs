//! RIFF/WAVE header constants and the `fmt ` chunk.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};

/// Magic bytes at the start of every RIFF file.
pub const RIFF_MAGIC: [u8; 4] = *b"RIFF";

/// Form type of a wave file, directly after the RIFF size field.
pub const WAVE_MAGIC: [u8; 4] = *b"WAVE";

/// Size of the RIFF preamble: magic(4) + size(4) + form type(4).
pub const RIFF_HEADER_SIZE: usize = 12;

/// Size of a chunk header: tag(4) + size(4).
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Minimum size of a PCM `fmt ` chunk payload.
pub const WAVE_FORMAT_SIZE: usize = 16;

/// `wFormatTag` value for integer PCM.
pub const FORMAT_PCM: u16 = 0x0001;

/// `wFormatTag` value for IEEE float samples.
pub const FORMAT_IEEE_FLOAT: u16 = 0x0003;

/// `wFormatTag` value for WAVE_FORMAT_EXTENSIBLE.
pub const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// The sample layout described by a `fmt ` chunk.
///
/// Layout (16 bytes, little-endian):
/// - `[0..2]`   format_tag: u16
/// - `[2..4]`   channels: u16
/// - `[4..8]`   sample_rate: u32
/// - `[8..12]`  byte_rate: u32 (derived)
/// - `[12..14]` block_align: u16 (derived)
/// - `[14..16]` bits_per_sample: u16
///
/// Any extension bytes after the first 16 are ignored on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveFormat {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl WaveFormat {
    /// Integer PCM with the given layout.
    pub fn pcm(channels: u16, sample_rate: u32, bits_per_sample: u16) -> Self {
        Self {
            format_tag: FORMAT_PCM,
            channels,
            sample_rate,
            bits_per_sample,
        }
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample.div_ceil(8)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Parse a `fmt ` chunk payload.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidWaveFormat`] if the payload is shorter than
    /// 16 bytes or describes zero channels.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < WAVE_FORMAT_SIZE {
            return Err(FormatError::InvalidWaveFormat(format!(
                "need {} bytes, have {}",
                WAVE_FORMAT_SIZE,
                data.len()
            )));
        }
        let mut cursor = Cursor::new(data);
        let format_tag = cursor.read_u16::<LittleEndian>()?;
        let channels = cursor.read_u16::<LittleEndian>()?;
        let sample_rate = cursor.read_u32::<LittleEndian>()?;
        let mut derived = [0u8; 6];
        cursor.read_exact(&mut derived)?;
        let bits_per_sample = cursor.read_u16::<LittleEndian>()?;

        if channels == 0 {
            return Err(FormatError::InvalidWaveFormat("zero channels".into()));
        }

        Ok(Self {
            format_tag,
            channels,
            sample_rate,
            bits_per_sample,
        })
    }

    /// Serialize to a 16-byte `fmt ` payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(WAVE_FORMAT_SIZE);
        buf.write_u16::<LittleEndian>(self.format_tag)
            .expect("write to Vec cannot fail");
        buf.write_u16::<LittleEndian>(self.channels)
            .expect("write to Vec cannot fail");
        buf.write_u32::<LittleEndian>(self.sample_rate)
            .expect("write to Vec cannot fail");
        buf.write_u32::<LittleEndian>(self.byte_rate())
            .expect("write to Vec cannot fail");
        buf.write_u16::<LittleEndian>(self.block_align())
            .expect("write to Vec cannot fail");
        buf.write_u16::<LittleEndian>(self.bits_per_sample)
            .expect("write to Vec cannot fail");
        buf
    }
}
