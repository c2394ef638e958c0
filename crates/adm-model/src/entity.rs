//! Arena entities and the handles that link them.

use serde::{Deserialize, Serialize};

use crate::block::{BlockFormat, Nanos};
use crate::id::{EntityId, Kind, TypeDefinition};

/// A non-owning reference to an entity in an [`AdmGraph`](crate::AdmGraph).
///
/// Handles are plain arena indices; they stay valid for the lifetime of the
/// graph because entities are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(pub(crate) u32);

impl Handle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Derived time extent of an object (see `update_limits`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectAttrs {
    pub start: Option<Nanos>,
    pub duration: Option<Nanos>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackAttrs {
    pub type_def: TypeDefinition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelAttrs {
    pub type_def: TypeDefinition,
    /// Ordered block sequence. Ordering is validated at finalization.
    pub blocks: Vec<BlockFormat>,
}

/// Encoding descriptor shared by stream and track formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatAttrs {
    pub type_def: TypeDefinition,
    pub format_label: String,
    pub format_definition: String,
}

impl FormatAttrs {
    pub fn pcm(type_def: TypeDefinition) -> Self {
        Self {
            type_def,
            format_label: "0001".to_string(),
            format_definition: "PCM".to_string(),
        }
    }
}

/// A physical track (`audioTrackUID`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackAttrs {
    /// 0-based physical channel index in the container.
    pub number: u32,
    pub sample_rate: u32,
    pub bit_depth: u16,
}

/// Kind-specific attributes of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityBody {
    Programme,
    Content,
    Object(ObjectAttrs),
    PackFormat(PackAttrs),
    ChannelFormat(ChannelAttrs),
    StreamFormat(FormatAttrs),
    TrackFormat(FormatAttrs),
    Track(TrackAttrs),
}

impl EntityBody {
    pub fn kind(&self) -> Kind {
        match self {
            EntityBody::Programme => Kind::Programme,
            EntityBody::Content => Kind::Content,
            EntityBody::Object(_) => Kind::Object,
            EntityBody::PackFormat(_) => Kind::PackFormat,
            EntityBody::ChannelFormat(_) => Kind::ChannelFormat,
            EntityBody::StreamFormat(_) => Kind::StreamFormat,
            EntityBody::TrackFormat(_) => Kind::TrackFormat,
            EntityBody::Track(_) => Kind::Track,
        }
    }

    /// A fresh body for `kind`. Tracks start at number 0 with the given
    /// defaults; callers set the number.
    pub fn default_for(kind: Kind, type_def: TypeDefinition, sample_rate: u32, bit_depth: u16) -> Self {
        match kind {
            Kind::Programme => EntityBody::Programme,
            Kind::Content => EntityBody::Content,
            Kind::Object => EntityBody::Object(ObjectAttrs::default()),
            Kind::PackFormat => EntityBody::PackFormat(PackAttrs { type_def }),
            Kind::ChannelFormat => EntityBody::ChannelFormat(ChannelAttrs {
                type_def,
                blocks: Vec::new(),
            }),
            Kind::StreamFormat => EntityBody::StreamFormat(FormatAttrs::pcm(type_def)),
            Kind::TrackFormat => EntityBody::TrackFormat(FormatAttrs::pcm(type_def)),
            Kind::Track => EntityBody::Track(TrackAttrs {
                number: 0,
                sample_rate,
                bit_depth,
            }),
        }
    }

    /// The type definition carried by format entities.
    pub fn type_definition(&self) -> Option<TypeDefinition> {
        match self {
            EntityBody::PackFormat(p) => Some(p.type_def),
            EntityBody::ChannelFormat(c) => Some(c.type_def),
            EntityBody::StreamFormat(f) | EntityBody::TrackFormat(f) => Some(f.type_def),
            _ => None,
        }
    }
}

/// A node in the graph arena.
///
/// The id and the reference list are only changed by the graph itself; the
/// body is freely editable through [`Entity::body_mut`].
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub(crate) id: EntityId,
    pub(crate) name: Option<String>,
    pub(crate) refs: Vec<Handle>,
    pub(crate) body: EntityBody,
}

impl Entity {
    pub fn kind(&self) -> Kind {
        self.body.kind()
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Outgoing references in insertion order.
    pub fn refs(&self) -> &[Handle] {
        &self.refs
    }

    pub fn body(&self) -> &EntityBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut EntityBody {
        &mut self.body
    }

    /// Canonical id if assigned, else name, else temporary id.
    pub fn label(&self) -> String {
        match (&self.id, &self.name) {
            (EntityId::Canonical(id), _) => id.to_string(),
            (EntityId::Temporary(_), Some(name)) => format!("{} '{}'", self.kind(), name),
            (id, None) => format!("{} {}", self.kind(), id),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectAttrs> {
        match &self.body {
            EntityBody::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_channel(&self) -> Option<&ChannelAttrs> {
        match &self.body {
            EntityBody::ChannelFormat(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_channel_mut(&mut self) -> Option<&mut ChannelAttrs> {
        match &mut self.body {
            EntityBody::ChannelFormat(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_track(&self) -> Option<&TrackAttrs> {
        match &self.body {
            EntityBody::Track(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_format(&self) -> Option<&FormatAttrs> {
        match &self.body {
            EntityBody::StreamFormat(f) | EntityBody::TrackFormat(f) => Some(f),
            _ => None,
        }
    }
}
