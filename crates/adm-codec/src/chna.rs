//! The `chna` chunk: a fixed-record index from physical tracks to ADM IDs.
//!
//! Layout (little-endian):
//! - `[0..2]` num_tracks: u16 (distinct track indices)
//! - `[2..4]` num_uids: u16 (records that follow)
//! - then `num_uids` records of 40 bytes:
//!   - `[0..2]`   track_index: u16, 1-based
//!   - `[2..14]`  UID, `ATU_xxxxxxxx`
//!   - `[14..28]` track format ID, `AT_yyyyxxxx_nn`
//!   - `[28..39]` pack format ID, `AP_yyyyxxxx`, all NUL for none
//!   - `[39]`     pad
//!
//! ID fields are ASCII, NUL-padded to their width.

use std::collections::BTreeSet;
use std::io::{Cursor, Read};

use adm_model::{AdmGraph, AdmId, Kind};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{CodecError, Result};

pub const CHNA_HEADER_SIZE: usize = 4;
pub const CHNA_RECORD_SIZE: usize = 40;

const UID_WIDTH: usize = 12;
const TRACK_FORMAT_WIDTH: usize = 14;
const PACK_FORMAT_WIDTH: usize = 11;

/// One `chna` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioId {
    /// 1-based physical track index.
    pub track_index: u16,
    pub uid: String,
    pub track_format: String,
    pub pack_format: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChnaChunk {
    pub num_tracks: u16,
    pub records: Vec<AudioId>,
}

impl ChnaChunk {
    /// Build the index from a graph with canonical IDs, one record per track.
    pub fn from_graph(graph: &AdmGraph) -> Result<Self> {
        let mut records = Vec::with_capacity(graph.tracks().len());
        for &track in graph.tracks() {
            let entity = graph.get(track)?;
            let attrs = entity
                .as_track()
                .ok_or_else(|| CodecError::MissingElement(format!("track {}", entity.label())))?;
            let uid = canonical(graph, track)?;
            let track_format = graph
                .first_ref(track, Kind::TrackFormat)
                .ok_or_else(|| CodecError::MissingElement(format!("track format of {uid}")))?;
            let pack_format = graph
                .first_ref(track, Kind::PackFormat)
                .map(|p| canonical(graph, p))
                .transpose()?;
            let track_index = attrs
                .number
                .checked_add(1)
                .and_then(|n| u16::try_from(n).ok())
                .ok_or_else(|| CodecError::BadIndexField {
                    record: records.len(),
                    reason: format!("track number {} does not fit the index", attrs.number),
                })?;
            records.push(AudioId {
                track_index,
                uid: uid.to_string(),
                track_format: canonical(graph, track_format)?.to_string(),
                pack_format: pack_format.map(|p| p.to_string()),
            });
        }
        let num_tracks = records
            .iter()
            .map(|r| r.track_index)
            .collect::<BTreeSet<_>>()
            .len();
        Ok(Self {
            num_tracks: count_u16(num_tracks)?,
            records,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let num_uids = count_u16(self.records.len())?;
        let mut buf = Vec::with_capacity(CHNA_HEADER_SIZE + self.records.len() * CHNA_RECORD_SIZE);
        buf.write_u16::<LittleEndian>(self.num_tracks)
            .expect("write to Vec cannot fail");
        buf.write_u16::<LittleEndian>(num_uids)
            .expect("write to Vec cannot fail");
        for (i, record) in self.records.iter().enumerate() {
            buf.write_u16::<LittleEndian>(record.track_index)
                .expect("write to Vec cannot fail");
            put_field(&mut buf, i, &record.uid, UID_WIDTH)?;
            put_field(&mut buf, i, &record.track_format, TRACK_FORMAT_WIDTH)?;
            put_field(
                &mut buf,
                i,
                record.pack_format.as_deref().unwrap_or(""),
                PACK_FORMAT_WIDTH,
            )?;
            buf.push(0);
        }
        Ok(buf)
    }

    /// Parse a `chna` payload.
    ///
    /// # Errors
    ///
    /// [`CodecError::TruncatedIndex`] if the payload holds fewer records than
    /// it declares; [`CodecError::BadIndexField`] for a zero track index or a
    /// non-ASCII ID field. Bytes past the declared records are ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < CHNA_HEADER_SIZE {
            return Err(CodecError::TruncatedIndex {
                declared: 0,
                available: 0,
            });
        }
        let mut cursor = Cursor::new(data);
        let num_tracks = cursor.read_u16::<LittleEndian>().map_err(short)?;
        let declared = cursor.read_u16::<LittleEndian>().map_err(short)? as usize;
        let available = (data.len() - CHNA_HEADER_SIZE) / CHNA_RECORD_SIZE;
        if declared > available {
            return Err(CodecError::TruncatedIndex {
                declared,
                available,
            });
        }

        let mut records = Vec::with_capacity(declared);
        for record in 0..declared {
            let track_index = cursor.read_u16::<LittleEndian>().map_err(short)?;
            if track_index == 0 {
                return Err(CodecError::BadIndexField {
                    record,
                    reason: "track index 0 (indices are 1-based)".into(),
                });
            }
            let uid = get_field(&mut cursor, record, UID_WIDTH)?;
            let track_format = get_field(&mut cursor, record, TRACK_FORMAT_WIDTH)?;
            let pack_format = get_field(&mut cursor, record, PACK_FORMAT_WIDTH)?;
            let mut pad = [0u8; 1];
            cursor.read_exact(&mut pad).map_err(short)?;
            records.push(AudioId {
                track_index,
                uid,
                track_format,
                pack_format: (!pack_format.is_empty()).then_some(pack_format),
            });
        }
        tracing::debug!(num_tracks, records = records.len(), "Parsed chna chunk");
        Ok(Self {
            num_tracks,
            records,
        })
    }
}

pub(crate) fn canonical(graph: &AdmGraph, handle: adm_model::Handle) -> Result<AdmId> {
    let entity = graph.get(handle)?;
    entity
        .id()
        .canonical()
        .ok_or_else(|| CodecError::NotFinalized(entity.label()))
}

fn count_u16(n: usize) -> Result<u16> {
    u16::try_from(n).map_err(|_| CodecError::BadIndexField {
        record: n,
        reason: "more than 65535 records".into(),
    })
}

fn put_field(buf: &mut Vec<u8>, record: usize, value: &str, width: usize) -> Result<()> {
    if value.len() > width || !value.is_ascii() {
        return Err(CodecError::BadIndexField {
            record,
            reason: format!("'{value}' does not fit a {width}-byte ASCII field"),
        });
    }
    buf.extend_from_slice(value.as_bytes());
    buf.resize(buf.len() + width - value.len(), 0);
    Ok(())
}

fn get_field(cursor: &mut Cursor<&[u8]>, record: usize, width: usize) -> Result<String> {
    let mut raw = vec![0u8; width];
    cursor.read_exact(&mut raw).map_err(short)?;
    let end = raw.iter().position(|b| *b == 0).unwrap_or(width);
    let field = &raw[..end];
    if !field.is_ascii() {
        return Err(CodecError::BadIndexField {
            record,
            reason: "non-ASCII ID field".into(),
        });
    }
    Ok(String::from_utf8_lossy(field).into_owned())
}

fn short(_: std::io::Error) -> CodecError {
    CodecError::MissingElement("chna record bytes".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: u16, n: u32) -> AudioId {
        AudioId {
            track_index: index,
            uid: format!("ATU_{n:08x}"),
            track_format: format!("AT_0003{:04x}_01", 0x1000 + n),
            pack_format: Some(format!("AP_0003{:04x}", 0x1000 + n)),
        }
    }

    #[test]
    fn test_layout() {
        let chunk = ChnaChunk {
            num_tracks: 1,
            records: vec![record(1, 1)],
        };
        let bytes = chunk.to_bytes().unwrap();
        assert_eq!(bytes.len(), CHNA_HEADER_SIZE + CHNA_RECORD_SIZE);
        assert_eq!(&bytes[0..4], &[1, 0, 1, 0]);
        assert_eq!(&bytes[4..6], &[1, 0]);
        assert_eq!(&bytes[6..18], b"ATU_00000001");
        assert_eq!(&bytes[18..32], b"AT_00031001_01");
        assert_eq!(&bytes[32..43], b"AP_00031001");
        assert_eq!(bytes[43], 0);
        assert_eq!(ChnaChunk::parse(&bytes).unwrap(), chunk);
    }

    #[test]
    fn test_missing_pack_is_all_nul() {
        let mut rec = record(2, 7);
        rec.pack_format = None;
        let chunk = ChnaChunk {
            num_tracks: 1,
            records: vec![rec],
        };
        let bytes = chunk.to_bytes().unwrap();
        assert!(bytes[32..43].iter().all(|b| *b == 0));
        assert_eq!(ChnaChunk::parse(&bytes).unwrap().records[0].pack_format, None);
    }

    #[test]
    fn test_declared_count_exceeding_data_is_rejected() {
        let chunk = ChnaChunk {
            num_tracks: 3,
            records: vec![record(1, 1), record(2, 2), record(3, 3)],
        };
        let mut bytes = chunk.to_bytes().unwrap();
        bytes[2..4].copy_from_slice(&5u16.to_le_bytes());
        assert!(matches!(
            ChnaChunk::parse(&bytes),
            Err(CodecError::TruncatedIndex {
                declared: 5,
                available: 3
            })
        ));
    }

    #[test]
    fn test_short_header_and_partial_record() {
        assert!(matches!(
            ChnaChunk::parse(&[1, 0]),
            Err(CodecError::TruncatedIndex { .. })
        ));
        let chunk = ChnaChunk {
            num_tracks: 1,
            records: vec![record(1, 1)],
        };
        let bytes = chunk.to_bytes().unwrap();
        assert!(matches!(
            ChnaChunk::parse(&bytes[..bytes.len() - 1]),
            Err(CodecError::TruncatedIndex {
                declared: 1,
                available: 0
            })
        ));
    }

    #[test]
    fn test_trailing_padding_is_ignored() {
        let chunk = ChnaChunk {
            num_tracks: 1,
            records: vec![record(1, 1)],
        };
        let mut bytes = chunk.to_bytes().unwrap();
        bytes.extend_from_slice(&[0u8; CHNA_RECORD_SIZE * 2]);
        assert_eq!(ChnaChunk::parse(&bytes).unwrap(), chunk);
    }

    #[test]
    fn test_bad_fields() {
        let mut bytes = ChnaChunk {
            num_tracks: 1,
            records: vec![record(1, 1)],
        }
        .to_bytes()
        .unwrap();
        bytes[4] = 0;
        assert!(matches!(
            ChnaChunk::parse(&bytes),
            Err(CodecError::BadIndexField { record: 0, .. })
        ));

        let mut too_long = record(1, 1);
        too_long.uid = "ATU_000000001".into();
        assert!(ChnaChunk {
            num_tracks: 1,
            records: vec![too_long]
        }
        .to_bytes()
        .is_err());
    }
}
