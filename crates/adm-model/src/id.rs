//! Entity kinds, type definitions and the persisted ADM identifier format.
//!
//! Canonical identifiers are a wire contract shared with other ADM tools:
//!
//! | Kind | Shape | Example |
//! |---|---|---|
//! | Programme | `APR_xxxx` | `APR_1001` |
//! | Content | `ACO_xxxx` | `ACO_1001` |
//! | Object | `AO_xxxx` | `AO_1001` |
//! | PackFormat | `AP_yyyyxxxx` | `AP_00031001` |
//! | ChannelFormat | `AC_yyyyxxxx` | `AC_00031001` |
//! | StreamFormat | `AS_yyyyxxxx` | `AS_00031001` |
//! | TrackFormat | `AT_yyyyxxxx_nn` | `AT_00031001_01` |
//! | BlockFormat | `AB_yyyyxxxx_zzzzzzzz` | `AB_00031001_00000001` |
//! | Track | `ATU_zzzzzzzz` | `ATU_00000001` |
//!
//! All digits are lower-case hexadecimal; `yyyy` is the type definition code.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// The kinds of entity stored in the graph arena.
///
/// Block formats are not arena entities: they are owned, in order, by their
/// channel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    Programme,
    Content,
    Object,
    PackFormat,
    ChannelFormat,
    StreamFormat,
    TrackFormat,
    Track,
}

impl Kind {
    /// Every kind, in canonical ID assignment order.
    pub const ALL: [Kind; 8] = [
        Kind::Programme,
        Kind::Content,
        Kind::Object,
        Kind::PackFormat,
        Kind::ChannelFormat,
        Kind::StreamFormat,
        Kind::TrackFormat,
        Kind::Track,
    ];

    /// Whether an entity of this kind may hold a reference to `target`.
    pub fn may_reference(self, target: Kind) -> bool {
        use Kind::*;
        matches!(
            (self, target),
            (Programme, Content)
                | (Content, Object)
                | (Object, PackFormat)
                | (Object, Track)
                | (Object, Object)
                | (PackFormat, ChannelFormat)
                | (StreamFormat, ChannelFormat)
                | (StreamFormat, TrackFormat)
                | (TrackFormat, StreamFormat)
                | (Track, TrackFormat)
                | (Track, PackFormat)
        )
    }

    /// Whether at most one reference of `target` kind is allowed.
    pub fn is_singular(self, target: Kind) -> bool {
        use Kind::*;
        matches!(
            (self, target),
            (Object, PackFormat)
                | (StreamFormat, ChannelFormat)
                | (StreamFormat, TrackFormat)
                | (TrackFormat, StreamFormat)
                | (Track, TrackFormat)
                | (Track, PackFormat)
        )
    }

    /// Reference kinds that must be present once the graph is finalized.
    pub fn required_references(self) -> &'static [Kind] {
        match self {
            Kind::StreamFormat => &[Kind::ChannelFormat, Kind::TrackFormat],
            Kind::TrackFormat => &[Kind::StreamFormat],
            Kind::Track => &[Kind::TrackFormat],
            _ => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Programme => "programme",
            Kind::Content => "content",
            Kind::Object => "object",
            Kind::PackFormat => "packFormat",
            Kind::ChannelFormat => "channelFormat",
            Kind::StreamFormat => "streamFormat",
            Kind::TrackFormat => "trackFormat",
            Kind::Track => "trackUID",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ADM type definitions (`typeDefinition` / `typeLabel`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum TypeDefinition {
    DirectSpeakers,
    Matrix,
    #[default]
    Objects,
    #[serde(rename = "HOA")]
    Hoa,
    Binaural,
}

impl TypeDefinition {
    /// The four-digit `typeLabel` code.
    pub fn code(self) -> u16 {
        match self {
            TypeDefinition::DirectSpeakers => 0x0001,
            TypeDefinition::Matrix => 0x0002,
            TypeDefinition::Objects => 0x0003,
            TypeDefinition::Hoa => 0x0004,
            TypeDefinition::Binaural => 0x0005,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0001 => Some(Self::DirectSpeakers),
            0x0002 => Some(Self::Matrix),
            0x0003 => Some(Self::Objects),
            0x0004 => Some(Self::Hoa),
            0x0005 => Some(Self::Binaural),
            _ => None,
        }
    }

    /// The `typeDefinition` string.
    pub fn name(self) -> &'static str {
        match self {
            TypeDefinition::DirectSpeakers => "DirectSpeakers",
            TypeDefinition::Matrix => "Matrix",
            TypeDefinition::Objects => "Objects",
            TypeDefinition::Hoa => "HOA",
            TypeDefinition::Binaural => "Binaural",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            Self::DirectSpeakers,
            Self::Matrix,
            Self::Objects,
            Self::Hoa,
            Self::Binaural,
        ]
        .into_iter()
        .find(|t| t.name() == name)
    }

    /// The `typeLabel` string, e.g. `"0003"`.
    pub fn label(self) -> String {
        format!("{:04x}", self.code())
    }
}

impl fmt::Display for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A canonical, persisted ADM identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdmId {
    Programme(u16),
    Content(u16),
    Object(u16),
    PackFormat {
        type_def: TypeDefinition,
        number: u16,
    },
    ChannelFormat {
        type_def: TypeDefinition,
        number: u16,
    },
    StreamFormat {
        type_def: TypeDefinition,
        number: u16,
    },
    TrackFormat {
        type_def: TypeDefinition,
        number: u16,
        sub: u8,
    },
    BlockFormat {
        type_def: TypeDefinition,
        number: u16,
        index: u32,
    },
    Track(u32),
}

impl AdmId {
    /// The arena kind this identifier names; `None` for block formats.
    pub fn kind(&self) -> Option<Kind> {
        match self {
            AdmId::Programme(_) => Some(Kind::Programme),
            AdmId::Content(_) => Some(Kind::Content),
            AdmId::Object(_) => Some(Kind::Object),
            AdmId::PackFormat { .. } => Some(Kind::PackFormat),
            AdmId::ChannelFormat { .. } => Some(Kind::ChannelFormat),
            AdmId::StreamFormat { .. } => Some(Kind::StreamFormat),
            AdmId::TrackFormat { .. } => Some(Kind::TrackFormat),
            AdmId::Track(_) => Some(Kind::Track),
            AdmId::BlockFormat { .. } => None,
        }
    }

    /// The type definition encoded in format identifiers.
    pub fn type_definition(&self) -> Option<TypeDefinition> {
        match *self {
            AdmId::PackFormat { type_def, .. }
            | AdmId::ChannelFormat { type_def, .. }
            | AdmId::StreamFormat { type_def, .. }
            | AdmId::TrackFormat { type_def, .. }
            | AdmId::BlockFormat { type_def, .. } => Some(type_def),
            _ => None,
        }
    }

    /// Parse an identifier and check that it names the expected kind.
    pub fn parse_kind(s: &str, kind: Kind) -> Result<Self> {
        let id: AdmId = s.parse()?;
        if id.kind() != Some(kind) {
            return Err(ModelError::InvalidId(s.to_string()));
        }
        Ok(id)
    }
}

impl fmt::Display for AdmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            AdmId::Programme(n) => write!(f, "APR_{n:04x}"),
            AdmId::Content(n) => write!(f, "ACO_{n:04x}"),
            AdmId::Object(n) => write!(f, "AO_{n:04x}"),
            AdmId::PackFormat { type_def, number } => {
                write!(f, "AP_{:04x}{number:04x}", type_def.code())
            }
            AdmId::ChannelFormat { type_def, number } => {
                write!(f, "AC_{:04x}{number:04x}", type_def.code())
            }
            AdmId::StreamFormat { type_def, number } => {
                write!(f, "AS_{:04x}{number:04x}", type_def.code())
            }
            AdmId::TrackFormat {
                type_def,
                number,
                sub,
            } => write!(f, "AT_{:04x}{number:04x}_{sub:02x}", type_def.code()),
            AdmId::BlockFormat {
                type_def,
                number,
                index,
            } => write!(f, "AB_{:04x}{number:04x}_{index:08x}", type_def.code()),
            AdmId::Track(n) => write!(f, "ATU_{n:08x}"),
        }
    }
}

fn hex16(s: &str) -> Option<u16> {
    (s.len() == 4 && s.bytes().all(|b| b.is_ascii_hexdigit()))
        .then(|| u16::from_str_radix(s, 16).ok())
        .flatten()
}

fn hex_n(s: &str, width: usize) -> Option<u32> {
    (s.len() == width && s.bytes().all(|b| b.is_ascii_hexdigit()))
        .then(|| u32::from_str_radix(s, 16).ok())
        .flatten()
}

/// Split `yyyyxxxx` into (type definition, number).
fn typed(s: &str) -> Option<(TypeDefinition, u16)> {
    if s.len() != 8 || !s.is_ascii() {
        return None;
    }
    let type_def = TypeDefinition::from_code(hex16(&s[..4])?)?;
    Some((type_def, hex16(&s[4..])?))
}

impl FromStr for AdmId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ModelError::InvalidId(s.to_string());
        let (prefix, rest) = s.split_once('_').ok_or_else(invalid)?;

        let id = match prefix {
            "APR" => AdmId::Programme(hex16(rest).ok_or_else(invalid)?),
            "ACO" => AdmId::Content(hex16(rest).ok_or_else(invalid)?),
            "AO" => AdmId::Object(hex16(rest).ok_or_else(invalid)?),
            "ATU" => AdmId::Track(hex_n(rest, 8).ok_or_else(invalid)?),
            "AP" | "AC" | "AS" => {
                let (type_def, number) = typed(rest).ok_or_else(invalid)?;
                match prefix {
                    "AP" => AdmId::PackFormat { type_def, number },
                    "AC" => AdmId::ChannelFormat { type_def, number },
                    _ => AdmId::StreamFormat { type_def, number },
                }
            }
            "AT" => {
                let (head, sub) = rest.split_once('_').ok_or_else(invalid)?;
                let (type_def, number) = typed(head).ok_or_else(invalid)?;
                let sub = hex_n(sub, 2).ok_or_else(invalid)? as u8;
                AdmId::TrackFormat {
                    type_def,
                    number,
                    sub,
                }
            }
            "AB" => {
                let (head, index) = rest.split_once('_').ok_or_else(invalid)?;
                let (type_def, number) = typed(head).ok_or_else(invalid)?;
                AdmId::BlockFormat {
                    type_def,
                    number,
                    index: hex_n(index, 8).ok_or_else(invalid)?,
                }
            }
            _ => return Err(invalid()),
        };
        Ok(id)
    }
}

impl Serialize for AdmId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AdmId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The identity of an entity or block: provisional until finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityId {
    /// Placeholder assigned at creation; never serialized.
    Temporary(u32),
    /// Assigned by `change_temporary_ids` or read from a file.
    Canonical(AdmId),
}

impl EntityId {
    pub fn canonical(&self) -> Option<AdmId> {
        match self {
            EntityId::Canonical(id) => Some(*id),
            EntityId::Temporary(_) => None,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, EntityId::Temporary(_))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Temporary(n) => write!(f, "tmp#{n}"),
            EntityId::Canonical(id) => id.fmt(f),
        }
    }
}
