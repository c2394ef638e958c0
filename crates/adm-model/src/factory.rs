//! Get-or-create construction of graph entities.
//!
//! Every entity is created here. Named entities are deduplicated by
//! (kind, name); tracks are deduplicated by track number.

use crate::block::BlockFormat;
use crate::entity::{Entity, EntityBody, Handle, TrackAttrs};
use crate::error::{ModelError, Result};
use crate::graph::AdmGraph;
use crate::id::{AdmId, EntityId, Kind, TypeDefinition};

/// The names describing one track's place in the graph.
///
/// Bulk authoring reuses one value across many `create_objects` calls,
/// changing only the fields that vary per track. `None` or an empty name
/// skips that level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectNames {
    pub programme: Option<String>,
    pub content: Option<String>,
    pub object: Option<String>,
    pub pack_format: Option<String>,
    pub channel_format: Option<String>,
    pub stream_format: Option<String>,
    pub track_format: Option<String>,
    /// 0-based physical track number.
    pub track: Option<u32>,
    /// Type of the format entities; the graph default when `None`.
    pub type_def: Option<TypeDefinition>,
}

impl ObjectNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `name` for every format level (pack, channel, stream, track format).
    pub fn with_formats(mut self, name: &str) -> Self {
        self.pack_format = Some(name.to_string());
        self.channel_format = Some(name.to_string());
        self.stream_format = Some(name.to_string());
        self.track_format = Some(name.to_string());
        self
    }
}

fn present(name: &Option<String>) -> Option<&str> {
    name.as_deref().filter(|n| !n.is_empty())
}

impl AdmGraph {
    /// Return the entity registered under (kind, name), creating it with
    /// default attributes if there is none. Tracks are unnamed and must be
    /// created with [`create_track`](Self::create_track).
    pub fn get_or_create(&mut self, kind: Kind, name: &str) -> Result<Handle> {
        let type_def = self.config.default_type;
        self.get_or_create_typed(kind, name, type_def)
    }

    /// As [`get_or_create`](Self::get_or_create), failing with
    /// [`ModelError::TypeConflict`] when an existing format entity carries a
    /// different type definition.
    pub fn get_or_create_typed(
        &mut self,
        kind: Kind,
        name: &str,
        type_def: TypeDefinition,
    ) -> Result<Handle> {
        if let Some(existing) = self.find_by_name(kind, name) {
            if let Some(current) = self.get(existing)?.body().type_definition() {
                if current != type_def {
                    return Err(ModelError::TypeConflict {
                        kind,
                        name: name.to_string(),
                        existing: current,
                        requested: type_def,
                    });
                }
            }
            return Ok(existing);
        }
        if kind == Kind::Track {
            return Err(ModelError::NotFound(kind, name.to_string()));
        }
        if self.sealed {
            return Err(ModelError::Sealed);
        }
        let body = EntityBody::default_for(
            kind,
            type_def,
            self.config.default_sample_rate,
            self.config.default_bit_depth,
        );
        Ok(self.alloc(body, Some(name.to_string())))
    }

    /// Insert an entity without name deduplication.
    pub fn insert_entity(&mut self, body: EntityBody, name: Option<String>) -> Result<Handle> {
        if self.sealed {
            return Err(ModelError::Sealed);
        }
        Ok(self.alloc(body, name))
    }

    /// Insert an entity that already carries a canonical ID, as read back
    /// from a file. The ID must name the body's kind.
    pub fn insert_with_id(
        &mut self,
        id: AdmId,
        body: EntityBody,
        name: Option<String>,
    ) -> Result<Handle> {
        if id.kind() != Some(body.kind()) {
            return Err(ModelError::InvalidId(id.to_string()));
        }
        let handle = self.insert_entity(body, name)?;
        self.entities[handle.index()].id = EntityId::Canonical(id);
        Ok(handle)
    }

    /// Return the track with `number`, creating it if needed.
    pub fn create_track(&mut self, number: u32, sample_rate: u32, bit_depth: u16) -> Result<Handle> {
        if let Some(track) = self.track_by_number(number) {
            return Ok(track);
        }
        if self.sealed {
            return Err(ModelError::Sealed);
        }
        Ok(self.alloc(
            EntityBody::Track(TrackAttrs {
                number,
                sample_rate,
                bit_depth,
            }),
            None,
        ))
    }

    /// Resolve or create every level named in `names` and link them.
    ///
    /// In permissive mode an inconsistent step (a singular reference already
    /// bound elsewhere, a type clash, a channel already owned by another
    /// pack) is logged and skipped while the remaining steps still run. In
    /// strict mode the first inconsistency is returned.
    pub fn create_objects(&mut self, names: &ObjectNames) -> Result<()> {
        if self.sealed {
            return Err(ModelError::Sealed);
        }
        let type_def = names.type_def.unwrap_or(self.config.default_type);

        let programme = self.level(Kind::Programme, &names.programme, type_def)?;
        let content = self.level(Kind::Content, &names.content, type_def)?;
        let object = self.level(Kind::Object, &names.object, type_def)?;
        self.link_step(programme, content)?;
        self.link_step(content, object)?;

        let pack = self.level(Kind::PackFormat, &names.pack_format, type_def)?;
        let channel = self.level(Kind::ChannelFormat, &names.channel_format, type_def)?;
        let stream = self.level(Kind::StreamFormat, &names.stream_format, type_def)?;
        let track_format = self.level(Kind::TrackFormat, &names.track_format, type_def)?;

        self.link_step(object, pack)?;
        if let (Some(pack), Some(channel)) = (pack, channel) {
            let result = self.check_channel_owner(pack, channel);
            if self.recover(result)?.is_some() {
                self.link_step(Some(pack), Some(channel))?;
            }
        }
        self.link_step(stream, channel)?;
        self.link_step(stream, track_format)?;
        self.link_step(track_format, stream)?;

        if let Some(number) = names.track {
            let rate = self.config.default_sample_rate;
            let depth = self.config.default_bit_depth;
            let track = self.create_track(number, rate, depth)?;
            self.link_step(Some(track), track_format)?;
            self.link_step(Some(track), pack)?;
            self.link_step(object, Some(track))?;
        }
        Ok(())
    }

    /// Append a block to a channel's sequence and return its index.
    ///
    /// Temporal ordering is not checked here; `connect_references` reports
    /// out-of-order blocks. Parameters are range-checked.
    pub fn create_block_format(&mut self, channel: Handle, mut block: BlockFormat) -> Result<usize> {
        self.get_kind(channel, Kind::ChannelFormat)?;
        block.params.validate()?;
        block.id = self.next_temporary();
        let attrs = self.entities[channel.index()]
            .as_channel_mut()
            .ok_or(ModelError::InvalidHandle(channel))?;
        attrs.blocks.push(block);
        Ok(attrs.blocks.len() - 1)
    }

    /// Append a block that already carries a canonical `AB_` ID.
    pub fn insert_block_with_id(
        &mut self,
        channel: Handle,
        id: AdmId,
        mut block: BlockFormat,
    ) -> Result<usize> {
        if !matches!(id, AdmId::BlockFormat { .. }) {
            return Err(ModelError::InvalidId(id.to_string()));
        }
        let index = self.create_block_format(channel, block.clone())?;
        block.id = EntityId::Canonical(id);
        if let Some(attrs) = self.entities[channel.index()].as_channel_mut() {
            attrs.blocks[index] = block;
        }
        Ok(index)
    }

    /// Mutable lookup by (kind, name).
    pub fn get_writable_by_name(&mut self, kind: Kind, name: &str) -> Option<&mut Entity> {
        let handle = self.find_by_name(kind, name)?;
        self.entities.get_mut(handle.index())
    }

    /// Nest `child` under `parent`.
    pub fn add_child_object(&mut self, parent: Handle, child: Handle) -> Result<()> {
        self.get_kind(parent, Kind::Object)?;
        self.get_kind(child, Kind::Object)?;
        self.link(parent, child)
    }

    fn level(
        &mut self,
        kind: Kind,
        name: &Option<String>,
        type_def: TypeDefinition,
    ) -> Result<Option<Handle>> {
        let Some(name) = present(name) else {
            return Ok(None);
        };
        let result = self.get_or_create_typed(kind, name, type_def);
        self.recover(result)
    }

    fn link_step(&mut self, from: Option<Handle>, to: Option<Handle>) -> Result<()> {
        if let (Some(from), Some(to)) = (from, to) {
            let result = self.link(from, to);
            self.recover(result)?;
        }
        Ok(())
    }

    fn check_channel_owner(&self, pack: Handle, channel: Handle) -> Result<()> {
        match self
            .referrers(channel, Kind::PackFormat)
            .into_iter()
            .find(|p| *p != pack)
        {
            Some(owner) => Err(ModelError::Conflict {
                from: self.label(channel),
                existing: self.label(owner),
                requested: self.label(pack),
            }),
            None => Ok(()),
        }
    }

    fn recover<T>(&self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if !self.config.strict => {
                tracing::warn!(error = %err, "Skipping inconsistent create_objects step");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
