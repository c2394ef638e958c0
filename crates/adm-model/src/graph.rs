//! The entity arena and its reference edges.
//!
//! An [`AdmGraph`] owns every entity; references between entities are
//! [`Handle`]s into the arena, so nested and cyclic shapes (objects inside
//! objects) need no shared ownership. Entities are never removed.

use std::collections::{HashMap, HashSet};

use crate::block::BlockFormat;
use crate::config::FactoryConfig;
use crate::entity::{Entity, EntityBody, Handle};
use crate::error::{ModelError, Result};
use crate::id::{EntityId, Kind};
use crate::tree::TreeNode;

/// An ADM metadata graph.
#[derive(Debug, Clone, Default)]
pub struct AdmGraph {
    pub(crate) entities: Vec<Entity>,
    /// First entity registered under each (kind, name).
    pub(crate) names: HashMap<(Kind, String), Handle>,
    /// Track handles; ordered by number after `sort_tracks`.
    pub(crate) tracks: Vec<Handle>,
    pub(crate) next_temp: u32,
    pub(crate) sealed: bool,
    pub(crate) config: FactoryConfig,
    pub(crate) extras: Vec<TreeNode>,
}

impl AdmGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FactoryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether `connect_references` has succeeded on this graph.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn entity(&self, handle: Handle) -> Option<&Entity> {
        self.entities.get(handle.index())
    }

    pub fn get(&self, handle: Handle) -> Result<&Entity> {
        self.entity(handle).ok_or(ModelError::InvalidHandle(handle))
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Entity> {
        self.entities
            .get_mut(handle.index())
            .ok_or(ModelError::InvalidHandle(handle))
    }

    /// Like [`get`](Self::get), also checking the entity kind.
    pub fn get_kind(&self, handle: Handle, expected: Kind) -> Result<&Entity> {
        let entity = self.get(handle)?;
        if entity.kind() != expected {
            return Err(ModelError::WrongKind {
                expected,
                actual: entity.kind(),
            });
        }
        Ok(entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (Handle(i as u32), e))
    }

    /// All entities of `kind`, in arena order.
    pub fn handles_of(&self, kind: Kind) -> Vec<Handle> {
        self.iter()
            .filter(|(_, e)| e.kind() == kind)
            .map(|(h, _)| h)
            .collect()
    }

    pub fn tracks(&self) -> &[Handle] {
        &self.tracks
    }

    pub fn track_by_number(&self, number: u32) -> Option<Handle> {
        self.tracks.iter().copied().find(|h| {
            self.entity(*h)
                .and_then(Entity::as_track)
                .is_some_and(|t| t.number == number)
        })
    }

    pub fn find_by_name(&self, kind: Kind, name: &str) -> Option<Handle> {
        self.names.get(&(kind, name.to_string())).copied()
    }

    /// Label used in diagnostics: canonical ID, else name, else temporary ID.
    pub fn label(&self, handle: Handle) -> String {
        match self.entity(handle) {
            Some(entity) => entity.label(),
            None => format!("{handle:?}"),
        }
    }

    /// Add a reference `from -> to`.
    ///
    /// Linking is idempotent. Fails when the graph is sealed, when the kinds
    /// may not be linked, or when a singular reference is already bound to
    /// a different entity.
    pub fn link(&mut self, from: Handle, to: Handle) -> Result<()> {
        if self.sealed {
            return Err(ModelError::Sealed);
        }
        let to_kind = self.get(to)?.kind();
        let source = self.get(from)?;
        let from_kind = source.kind();
        if !from_kind.may_reference(to_kind) {
            return Err(ModelError::KindMismatch {
                from: from_kind,
                to: to_kind,
            });
        }
        if source.refs.contains(&to) {
            return Ok(());
        }
        if from_kind.is_singular(to_kind) {
            if let Some(existing) = self.first_ref(from, to_kind) {
                return Err(ModelError::Conflict {
                    from: self.label(from),
                    existing: self.label(existing),
                    requested: self.label(to),
                });
            }
        }
        tracing::debug!(from = %self.label(from), to = %self.label(to), "Linking");
        self.entities[from.index()].refs.push(to);
        Ok(())
    }

    /// Outgoing references of `handle` that point at `kind`.
    pub fn refs_of(&self, handle: Handle, kind: Kind) -> Vec<Handle> {
        self.entity(handle)
            .map(|e| {
                e.refs
                    .iter()
                    .copied()
                    .filter(|r| self.entity(*r).is_some_and(|t| t.kind() == kind))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn first_ref(&self, handle: Handle, kind: Kind) -> Option<Handle> {
        self.entity(handle)?
            .refs
            .iter()
            .copied()
            .find(|r| self.entity(*r).is_some_and(|t| t.kind() == kind))
    }

    /// Entities of `kind` that reference `target`.
    pub fn referrers(&self, target: Handle, kind: Kind) -> Vec<Handle> {
        self.iter()
            .filter(|(_, e)| e.kind() == kind && e.refs.contains(&target))
            .map(|(h, _)| h)
            .collect()
    }

    /// Channel formats a track carries: track → track format → stream →
    /// channel. Falls back to the channels of the track's pack.
    pub fn channels_for_track(&self, track: Handle) -> Result<Vec<Handle>> {
        self.get_kind(track, Kind::Track)?;
        let via_stream: Vec<Handle> = self
            .refs_of(track, Kind::TrackFormat)
            .into_iter()
            .flat_map(|tf| self.refs_of(tf, Kind::StreamFormat))
            .flat_map(|sf| self.refs_of(sf, Kind::ChannelFormat))
            .collect();
        if !via_stream.is_empty() {
            return Ok(dedup(via_stream));
        }
        Ok(dedup(
            self.refs_of(track, Kind::PackFormat)
                .into_iter()
                .flat_map(|p| self.refs_of(p, Kind::ChannelFormat))
                .collect(),
        ))
    }

    /// Channel formats under an object's pack and, recursively, under its
    /// child objects.
    pub fn channels_for_object(&self, object: Handle) -> Result<Vec<Handle>> {
        self.get_kind(object, Kind::Object)?;
        let mut channels = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![object];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            for pack in self.refs_of(current, Kind::PackFormat) {
                channels.extend(self.refs_of(pack, Kind::ChannelFormat));
            }
            let mut children = self.refs_of(current, Kind::Object);
            children.reverse();
            stack.extend(children);
        }
        Ok(dedup(channels))
    }

    /// Objects that play `track`.
    pub fn objects_for_track(&self, track: Handle) -> Result<Vec<Handle>> {
        self.get_kind(track, Kind::Track)?;
        Ok(self.referrers(track, Kind::Object))
    }

    pub fn channel_blocks(&self, channel: Handle) -> Result<&[BlockFormat]> {
        let entity = self.get_kind(channel, Kind::ChannelFormat)?;
        Ok(entity
            .as_channel()
            .map(|c| c.blocks.as_slice())
            .unwrap_or_default())
    }

    /// Subtrees with no meaning to the model, kept for re-serialization.
    pub fn extras(&self) -> &[TreeNode] {
        &self.extras
    }

    pub fn extras_mut(&mut self) -> &mut Vec<TreeNode> {
        &mut self.extras
    }

    pub(crate) fn next_temporary(&mut self) -> EntityId {
        let id = EntityId::Temporary(self.next_temp);
        self.next_temp = self.next_temp.wrapping_add(1);
        id
    }

    /// Append an entity to the arena. Tracks are added to the track list and
    /// the name is registered if not yet taken.
    pub(crate) fn alloc(&mut self, body: EntityBody, name: Option<String>) -> Handle {
        let handle = Handle(self.entities.len() as u32);
        let kind = body.kind();
        if let Some(name) = name.as_ref().filter(|n| !n.is_empty()) {
            self.names.entry((kind, name.clone())).or_insert(handle);
        }
        if kind == Kind::Track {
            self.tracks.push(handle);
        }
        let id = self.next_temporary();
        self.entities.push(Entity {
            id,
            name,
            refs: Vec::new(),
            body,
        });
        tracing::debug!(%kind, %id, "Created entity");
        handle
    }
}

fn dedup(handles: Vec<Handle>) -> Vec<Handle> {
    let mut seen = HashSet::new();
    handles.into_iter().filter(|h| seen.insert(*h)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TypeDefinition;

    fn body(kind: Kind) -> EntityBody {
        EntityBody::default_for(kind, TypeDefinition::Objects, 48000, 24)
    }

    #[test]
    fn test_alloc_registers_name_once() {
        let mut graph = AdmGraph::new();
        let a = graph.alloc(body(Kind::Content), Some("Dialogue".into()));
        let b = graph.alloc(body(Kind::Content), Some("Dialogue".into()));
        assert_ne!(a, b);
        assert_eq!(graph.find_by_name(Kind::Content, "Dialogue"), Some(a));
        assert_eq!(graph.find_by_name(Kind::Object, "Dialogue"), None);
        assert!(graph.get(a).unwrap().id().is_temporary());
        assert_ne!(graph.get(a).unwrap().id(), graph.get(b).unwrap().id());
    }

    #[test]
    fn test_link_rules() {
        let mut graph = AdmGraph::new();
        let object = graph.alloc(body(Kind::Object), None);
        let pack_a = graph.alloc(body(Kind::PackFormat), Some("a".into()));
        let pack_b = graph.alloc(body(Kind::PackFormat), Some("b".into()));
        let programme = graph.alloc(body(Kind::Programme), None);

        graph.link(object, pack_a).unwrap();
        graph.link(object, pack_a).unwrap();
        assert_eq!(graph.get(object).unwrap().refs(), &[pack_a]);

        assert!(matches!(
            graph.link(object, pack_b),
            Err(ModelError::Conflict { .. })
        ));
        assert!(matches!(
            graph.link(programme, object),
            Err(ModelError::KindMismatch { .. })
        ));
        assert!(matches!(
            graph.link(object, Handle(99)),
            Err(ModelError::InvalidHandle(_))
        ));
    }

    #[test]
    fn test_link_refused_when_sealed() {
        let mut graph = AdmGraph::new();
        let programme = graph.alloc(body(Kind::Programme), None);
        let content = graph.alloc(body(Kind::Content), None);
        graph.sealed = true;
        assert!(matches!(
            graph.link(programme, content),
            Err(ModelError::Sealed)
        ));
    }

    #[test]
    fn test_channels_for_object_recurses_through_children() {
        let mut graph = AdmGraph::new();
        let parent = graph.alloc(body(Kind::Object), None);
        let child = graph.alloc(body(Kind::Object), None);
        let pack_p = graph.alloc(body(Kind::PackFormat), None);
        let pack_c = graph.alloc(body(Kind::PackFormat), None);
        let ch_p = graph.alloc(body(Kind::ChannelFormat), None);
        let ch_c = graph.alloc(body(Kind::ChannelFormat), None);
        graph.link(parent, pack_p).unwrap();
        graph.link(pack_p, ch_p).unwrap();
        graph.link(child, pack_c).unwrap();
        graph.link(pack_c, ch_c).unwrap();
        graph.link(parent, child).unwrap();
        // A cycle must not loop forever.
        graph.link(child, parent).unwrap();

        assert_eq!(graph.channels_for_object(parent).unwrap(), vec![ch_p, ch_c]);
        assert_eq!(graph.channels_for_object(child).unwrap(), vec![ch_c, ch_p]);
    }

    #[test]
    fn test_channels_for_track_via_stream() {
        let mut graph = AdmGraph::new();
        let track = graph.alloc(body(Kind::Track), None);
        let tf = graph.alloc(body(Kind::TrackFormat), None);
        let sf = graph.alloc(body(Kind::StreamFormat), None);
        let ch = graph.alloc(body(Kind::ChannelFormat), None);
        graph.link(track, tf).unwrap();
        graph.link(tf, sf).unwrap();
        graph.link(sf, ch).unwrap();

        assert_eq!(graph.channels_for_track(track).unwrap(), vec![ch]);
        assert_eq!(graph.referrers(ch, Kind::StreamFormat), vec![sf]);
        assert!(matches!(
            graph.channels_for_track(ch),
            Err(ModelError::WrongKind { .. })
        ));
    }
}
