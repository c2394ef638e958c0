//! Finalization passes: track ordering, reference validation, canonical ID
//! assignment and derived object limits.
//!
//! Each pass can be re-run. Canonical IDs are assigned in a fixed traversal
//! order (programmes, contents, objects, pack formats, channel formats with
//! their blocks, stream formats, track formats, tracks) which other ADM tools
//! rely on for stable IDs across re-serialization.

use std::collections::{HashMap, HashSet};

use crate::block::first_order_violation;
use crate::entity::{EntityBody, Handle};
use crate::error::{ModelError, Result, StructuralIssue};
use crate::graph::AdmGraph;
use crate::id::{AdmId, EntityId, Kind, TypeDefinition};

/// First sequential number for programme through track format IDs.
const FIRST_NUMBER: u16 = 0x1001;

impl AdmGraph {
    /// Order the track list by track number.
    ///
    /// The sort is stable and always applied. Numbers must run densely
    /// from 0; duplicates and the first gap are reported as structural
    /// issues.
    pub fn sort_tracks(&mut self) -> Result<()> {
        let entities = &self.entities;
        self.tracks.sort_by_key(|h| {
            entities
                .get(h.index())
                .and_then(|e| e.as_track())
                .map_or(u32::MAX, |t| t.number)
        });

        let numbers: Vec<u32> = self
            .tracks
            .iter()
            .filter_map(|h| self.entity(*h).and_then(|e| e.as_track()).map(|t| t.number))
            .collect();
        let mut issues = Vec::new();
        for pair in numbers.windows(2) {
            if pair[0] == pair[1] {
                issues.push(StructuralIssue::DuplicateTrackNumber { number: pair[0] });
            }
        }
        issues.dedup();

        let mut expected = 0u32;
        for &number in &numbers {
            if number > expected {
                issues.push(StructuralIssue::NonDenseTrackNumber {
                    expected,
                    found: number,
                });
                break;
            }
            expected = number + 1;
        }

        if issues.is_empty() {
            Ok(())
        } else {
            for issue in &issues {
                tracing::warn!(%issue, "Track ordering issue");
            }
            Err(ModelError::Structural(issues))
        }
    }

    /// Validate every reference and seal the graph.
    ///
    /// Checks that each edge points inside the arena at an allowed kind,
    /// that singular edges appear at most once, that required edges exist,
    /// that block sequences are ordered and that every object reaches a
    /// track directly or through child objects. All issues are reported
    /// together; the graph stays unsealed and inspectable on failure.
    pub fn connect_references(&mut self) -> Result<()> {
        let mut issues = Vec::new();

        for (handle, entity) in self.iter() {
            let from_kind = entity.kind();
            let mut counts: HashMap<Kind, usize> = HashMap::new();

            for (index, target) in entity.refs().iter().enumerate() {
                let Some(target_entity) = self.entity(*target) else {
                    issues.push(StructuralIssue::DanglingReference {
                        from: entity.label(),
                        index,
                    });
                    continue;
                };
                let kind = target_entity.kind();
                if !from_kind.may_reference(kind) {
                    issues.push(StructuralIssue::UnexpectedTarget {
                        from: entity.label(),
                        target: target_entity.label(),
                        kind,
                    });
                    continue;
                }
                *counts.entry(kind).or_default() += 1;
            }

            let mut singular: Vec<Kind> = counts
                .iter()
                .filter(|(kind, count)| **count > 1 && from_kind.is_singular(**kind))
                .map(|(kind, _)| *kind)
                .collect();
            singular.sort();
            for kind in singular {
                issues.push(StructuralIssue::TooManyReferences {
                    from: entity.label(),
                    kind,
                });
            }

            for kind in from_kind.required_references() {
                if !counts.contains_key(kind) {
                    issues.push(StructuralIssue::MissingReference {
                        from: entity.label(),
                        kind: *kind,
                    });
                }
            }

            if let Some(channel) = entity.as_channel() {
                if let Some(index) = first_order_violation(&channel.blocks) {
                    issues.push(StructuralIssue::BlockOrder {
                        channel: entity.label(),
                        index,
                    });
                }
            }

            if from_kind == Kind::Object && !self.reaches_track(handle) {
                issues.push(StructuralIssue::UnreachableObject {
                    object: entity.label(),
                });
            }
        }

        if issues.is_empty() {
            self.sealed = true;
            tracing::info!(entities = self.len(), "References connected; graph sealed");
            Ok(())
        } else {
            for issue in &issues {
                tracing::warn!(%issue, "Structural issue");
            }
            Err(ModelError::Structural(issues))
        }
    }

    fn reaches_track(&self, object: Handle) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![object];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if !self.refs_of(current, Kind::Track).is_empty() {
                return true;
            }
            stack.extend(self.refs_of(current, Kind::Object));
        }
        false
    }

    /// Assign canonical IDs in the published traversal order.
    ///
    /// Within a kind, entities are visited in the order they are reached
    /// from the previous kind; siblings are ordered by name, then previous
    /// canonical ID, then creation order. Entities not reached are appended
    /// in the same sibling order. Blocks are numbered from 1 per channel.
    pub fn change_temporary_ids(&mut self) -> Result<()> {
        let programmes = self.ordered(Kind::Programme, Vec::new());
        let contents = self.ordered(Kind::Content, self.groups(&programmes, Kind::Content));
        let objects = self.ordered_objects(&contents);
        let packs = self.ordered(Kind::PackFormat, self.groups(&objects, Kind::PackFormat));
        let channels = self.ordered(Kind::ChannelFormat, self.groups(&packs, Kind::ChannelFormat));
        let stream_groups = channels
            .iter()
            .map(|c| self.referrers(*c, Kind::StreamFormat))
            .collect();
        let streams = self.ordered(Kind::StreamFormat, stream_groups);
        let mut format_groups = self.groups(&streams, Kind::TrackFormat);
        format_groups.extend(self.groups(&self.tracks, Kind::TrackFormat));
        let track_formats = self.ordered(Kind::TrackFormat, format_groups);

        self.assign(&programmes, Kind::Programme, |_, n| AdmId::Programme(n))?;
        self.assign(&contents, Kind::Content, |_, n| AdmId::Content(n))?;
        self.assign(&objects, Kind::Object, |_, n| AdmId::Object(n))?;
        self.assign(&packs, Kind::PackFormat, |type_def, number| AdmId::PackFormat {
            type_def,
            number,
        })?;
        self.assign(&channels, Kind::ChannelFormat, |type_def, number| {
            AdmId::ChannelFormat { type_def, number }
        })?;
        self.assign_blocks(&channels);
        self.assign(&streams, Kind::StreamFormat, |type_def, number| {
            AdmId::StreamFormat { type_def, number }
        })?;
        self.assign(&track_formats, Kind::TrackFormat, |type_def, number| {
            AdmId::TrackFormat {
                type_def,
                number,
                sub: 1,
            }
        })?;

        let tracks = self.tracks.clone();
        for (i, handle) in tracks.iter().enumerate() {
            self.entities[handle.index()].id = EntityId::Canonical(AdmId::Track(i as u32 + 1));
        }

        tracing::info!(entities = self.len(), "Canonical IDs assigned");
        Ok(())
    }

    /// Recompute each object's time span from the blocks of every channel
    /// under its pack and its child objects.
    pub fn update_limits(&mut self) -> Result<()> {
        for object in self.handles_of(Kind::Object) {
            let mut span: Option<(u64, u64)> = None;
            for channel in self.channels_for_object(object)? {
                for block in self.channel_blocks(channel)? {
                    span = Some(match span {
                        Some((start, end)) => (start.min(block.start), end.max(block.end())),
                        None => (block.start, block.end()),
                    });
                }
            }
            if let EntityBody::Object(attrs) = &mut self.entities[object.index()].body {
                attrs.start = span.map(|(start, _)| start);
                attrs.duration = span.map(|(start, end)| end - start);
            }
        }
        Ok(())
    }

    /// Run `sort_tracks`, `connect_references`, `change_temporary_ids` and
    /// `update_limits` in order, stopping at the first failure.
    pub fn finalize(&mut self) -> Result<()> {
        self.sort_tracks()?;
        self.connect_references()?;
        self.change_temporary_ids()?;
        self.update_limits()
    }

    fn sibling_key(&self, handle: Handle) -> (String, Option<AdmId>, usize) {
        let entity = self.entity(handle);
        (
            entity
                .and_then(|e| e.name())
                .unwrap_or_default()
                .to_string(),
            entity.and_then(|e| e.id().canonical()),
            handle.index(),
        )
    }

    fn groups(&self, parents: &[Handle], kind: Kind) -> Vec<Vec<Handle>> {
        parents.iter().map(|p| self.refs_of(*p, kind)).collect()
    }

    /// Flatten sibling groups into a visit order, then append unreached
    /// entities of `kind`.
    fn ordered(&self, kind: Kind, groups: Vec<Vec<Handle>>) -> Vec<Handle> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        for group in groups {
            self.visit_group(group, &mut seen, &mut order);
        }
        self.append_unreached(kind, &mut seen, &mut order);
        order
    }

    /// Objects reached from contents, then breadth-first through child
    /// objects, then unreached objects.
    fn ordered_objects(&self, contents: &[Handle]) -> Vec<Handle> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        for group in self.groups(contents, Kind::Object) {
            self.visit_group(group, &mut seen, &mut order);
        }
        let mut i = 0;
        while i < order.len() {
            let children = self.refs_of(order[i], Kind::Object);
            self.visit_group(children, &mut seen, &mut order);
            i += 1;
        }
        self.append_unreached(Kind::Object, &mut seen, &mut order);
        order
    }

    fn visit_group(&self, mut group: Vec<Handle>, seen: &mut HashSet<Handle>, order: &mut Vec<Handle>) {
        group.sort_by_cached_key(|h| self.sibling_key(*h));
        order.extend(group.into_iter().filter(|h| seen.insert(*h)));
    }

    fn append_unreached(&self, kind: Kind, seen: &mut HashSet<Handle>, order: &mut Vec<Handle>) {
        let rest: Vec<Handle> = self
            .handles_of(kind)
            .into_iter()
            .filter(|h| !seen.contains(h))
            .collect();
        if !rest.is_empty() {
            tracing::debug!(%kind, count = rest.len(), "Numbering unreached entities");
        }
        self.visit_group(rest, seen, order);
    }

    fn assign(
        &mut self,
        order: &[Handle],
        kind: Kind,
        make: impl Fn(TypeDefinition, u16) -> AdmId,
    ) -> Result<()> {
        let default_type = self.config.default_type;
        let mut number = FIRST_NUMBER;
        for (i, handle) in order.iter().enumerate() {
            if i > 0 {
                number = number
                    .checked_add(1)
                    .ok_or(ModelError::IdSpaceExhausted(kind))?;
            }
            let entity = &mut self.entities[handle.index()];
            let type_def = entity.body.type_definition().unwrap_or(default_type);
            entity.id = EntityId::Canonical(make(type_def, number));
        }
        Ok(())
    }

    fn assign_blocks(&mut self, channels: &[Handle]) {
        for handle in channels {
            let entity = &mut self.entities[handle.index()];
            let Some(AdmId::ChannelFormat { type_def, number }) = entity.id.canonical() else {
                continue;
            };
            if let Some(attrs) = entity.as_channel_mut() {
                for (i, block) in attrs.blocks.iter_mut().enumerate() {
                    block.id = EntityId::Canonical(AdmId::BlockFormat {
                        type_def,
                        number,
                        index: i as u32 + 1,
                    });
                }
            }
        }
    }
}
