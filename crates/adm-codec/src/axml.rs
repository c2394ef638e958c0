//! The `axml` chunk: the graph as an EBU Core `audioFormatExtended` tree.
//!
//! Every entity becomes one element under
//! `ebuCoreMain/coreMetadata/format/audioFormatExtended`, keyed by its
//! canonical ID. References are `...IDRef` child elements whose text is the
//! target ID. Block formats nest inside their channel format.
//!
//! Decoding runs in two passes so that references may point forward in the
//! document: every element is created first, then every reference is
//! resolved. Elements the codec does not model are carried through
//! [`AdmGraph::extras`] unchanged. Track numbers are not part of the tree;
//! they come from the `chna` index.

use std::collections::HashMap;
use std::str::FromStr;

use adm_model::{
    AdmGraph, AdmId, BlockFormat, BlockParams, ChannelAttrs, EntityBody, FactoryConfig,
    FormatAttrs, Handle, Kind, Nanos, ObjectAttrs, PackAttrs, Position, TrackAttrs, TreeNode,
    TypeDefinition,
};

use crate::chna::{canonical, AudioId, ChnaChunk};
use crate::error::{CodecError, Result};
use crate::time::{format_time, parse_time};

/// Path from the document root to the element holding the entities.
pub const FORMAT_PATH: [&str; 3] = ["coreMetadata", "format", "audioFormatExtended"];

const EBU_CORE_NAMESPACE: &str = "urn:ebu:metadata-schema:ebuCore_2016";

/// Element and attribute names for one entity kind.
struct Tags {
    element: &'static str,
    id: &'static str,
    name: Option<&'static str>,
    reference: &'static str,
}

fn tags(kind: Kind) -> Tags {
    let (element, id, name, reference) = match kind {
        Kind::Programme => (
            "audioProgramme",
            "audioProgrammeID",
            Some("audioProgrammeName"),
            "audioProgrammeIDRef",
        ),
        Kind::Content => (
            "audioContent",
            "audioContentID",
            Some("audioContentName"),
            "audioContentIDRef",
        ),
        Kind::Object => (
            "audioObject",
            "audioObjectID",
            Some("audioObjectName"),
            "audioObjectIDRef",
        ),
        Kind::PackFormat => (
            "audioPackFormat",
            "audioPackFormatID",
            Some("audioPackFormatName"),
            "audioPackFormatIDRef",
        ),
        Kind::ChannelFormat => (
            "audioChannelFormat",
            "audioChannelFormatID",
            Some("audioChannelFormatName"),
            "audioChannelFormatIDRef",
        ),
        Kind::StreamFormat => (
            "audioStreamFormat",
            "audioStreamFormatID",
            Some("audioStreamFormatName"),
            "audioStreamFormatIDRef",
        ),
        Kind::TrackFormat => (
            "audioTrackFormat",
            "audioTrackFormatID",
            Some("audioTrackFormatName"),
            "audioTrackFormatIDRef",
        ),
        Kind::Track => ("audioTrackUID", "UID", None, "audioTrackUIDRef"),
    };
    Tags {
        element,
        id,
        name,
        reference,
    }
}

fn kind_of_element(element: &str) -> Option<Kind> {
    Kind::ALL.into_iter().find(|kind| tags(*kind).element == element)
}

fn kind_of_reference(element: &str) -> Option<Kind> {
    Kind::ALL
        .into_iter()
        .find(|kind| tags(*kind).reference == element)
}

fn invalid(field: &str, value: &str) -> CodecError {
    CodecError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Render a finalized graph as an EBU Core tree.
///
/// # Errors
///
/// [`CodecError::NotFinalized`] if references were never connected or any
/// entity or block still carries a temporary ID.
pub fn encode_tree(graph: &AdmGraph) -> Result<TreeNode> {
    if !graph.is_sealed() {
        return Err(CodecError::NotFinalized(
            "references have not been connected".into(),
        ));
    }

    let mut extended = TreeNode::new(FORMAT_PATH[2]);
    for kind in Kind::ALL {
        let mut entries = graph
            .handles_of(kind)
            .into_iter()
            .map(|handle| Ok((canonical(graph, handle)?, handle)))
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by_key(|(id, _)| *id);
        for (id, handle) in entries {
            extended.push(encode_entity(graph, handle, id)?);
        }
    }
    for extra in graph.extras() {
        extended.push(extra.clone());
    }

    let format = TreeNode::new(FORMAT_PATH[1]).with_child(extended);
    Ok(TreeNode::new("ebuCoreMain")
        .with_attr("xmlns", EBU_CORE_NAMESPACE)
        .with_attr("xml:lang", "en")
        .with_child(TreeNode::new(FORMAT_PATH[0]).with_child(format)))
}

fn encode_entity(graph: &AdmGraph, handle: Handle, id: AdmId) -> Result<TreeNode> {
    let entity = graph.get(handle)?;
    let names = tags(entity.kind());
    let mut node = TreeNode::new(names.element).with_attr(names.id, id.to_string());
    if let (Some(attr), Some(name)) = (names.name, entity.name()) {
        node.set_attr(attr, name);
    }

    match entity.body() {
        EntityBody::Programme | EntityBody::Content => {}
        EntityBody::Object(attrs) => {
            if let Some(start) = attrs.start {
                node.set_attr("start", format_time(start));
            }
            if let Some(duration) = attrs.duration {
                node.set_attr("duration", format_time(duration));
            }
        }
        EntityBody::PackFormat(PackAttrs { type_def })
        | EntityBody::ChannelFormat(ChannelAttrs { type_def, .. }) => {
            node.set_attr("typeLabel", type_def.label());
            node.set_attr("typeDefinition", type_def.name());
        }
        EntityBody::StreamFormat(attrs) | EntityBody::TrackFormat(attrs) => {
            node.set_attr("formatLabel", attrs.format_label.as_str());
            node.set_attr("formatDefinition", attrs.format_definition.as_str());
        }
        EntityBody::Track(attrs) => {
            node.set_attr("sampleRate", attrs.sample_rate.to_string());
            node.set_attr("bitDepth", attrs.bit_depth.to_string());
        }
    }

    for &target in entity.refs() {
        let kind = graph.get(target)?.kind();
        let reference = TreeNode::new(tags(kind).reference);
        node.push(reference.with_text(canonical(graph, target)?.to_string()));
    }

    if let Some(channel) = entity.as_channel() {
        for block in &channel.blocks {
            node.push(encode_block(block)?);
        }
    }
    Ok(node)
}

fn encode_block(block: &BlockFormat) -> Result<TreeNode> {
    let id = block.id().canonical().ok_or_else(|| {
        CodecError::NotFinalized(format!("block format at {}", format_time(block.start)))
    })?;
    let params = &block.params;
    let value = |name: &str, v: f64| TreeNode::new(name).with_text(v.to_string());
    let coordinate = |axis: &str, v: f64| value("position", v).with_attr("coordinate", axis);

    Ok(TreeNode::new("audioBlockFormat")
        .with_attr("audioBlockFormatID", id.to_string())
        .with_attr("rtime", format_time(block.start))
        .with_attr("duration", format_time(block.duration))
        .with_child(coordinate("azimuth", params.position.azimuth))
        .with_child(coordinate("elevation", params.position.elevation))
        .with_child(coordinate("distance", params.position.distance))
        .with_child(value("gain", params.gain))
        .with_child(value("width", params.width))
        .with_child(value("height", params.height))
        .with_child(value("depth", params.depth)))
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Rebuild a graph from an EBU Core tree and its `chna` index.
///
/// The returned graph holds canonical IDs but is not sealed; the caller runs
/// `sort_tracks` and `connect_references`.
///
/// # Errors
///
/// [`CodecError::MissingElement`] if the tree has no `audioFormatExtended`
/// or an `audioTrackUID` has no `chna` record; [`CodecError::UnknownReference`]
/// for an `...IDRef` naming no element of the expected kind;
/// [`CodecError::DuplicateId`] for a repeated ID.
pub fn decode_tree(root: &TreeNode, chna: &ChnaChunk, config: FactoryConfig) -> Result<AdmGraph> {
    let extended = if root.name == FORMAT_PATH[2] {
        root
    } else {
        root.descend(&FORMAT_PATH)
            .ok_or_else(|| CodecError::MissingElement(FORMAT_PATH.join("/")))?
    };

    let mut records: HashMap<&str, &AudioId> = HashMap::new();
    for record in &chna.records {
        if records.insert(record.uid.as_str(), record).is_some() {
            return Err(CodecError::DuplicateId(record.uid.clone()));
        }
    }

    let mut decoder = Decoder {
        graph: AdmGraph::with_config(config),
        ids: HashMap::new(),
    };

    let mut pending = Vec::new();
    for node in &extended.children {
        let Some(kind) = kind_of_element(&node.name) else {
            tracing::debug!(element = %node.name, "Keeping unmodelled element");
            decoder.graph.extras_mut().push(node.clone());
            continue;
        };
        let handle = decoder.create(kind, node, &records)?;
        pending.push((handle, node));
    }

    for record in &chna.records {
        if !decoder.ids.contains_key(&record.uid) {
            tracing::debug!(uid = %record.uid, "Track listed only in chna");
            decoder.create_track(record, None)?;
        }
    }

    for (handle, node) in pending {
        for child in &node.children {
            let Some(kind) = kind_of_reference(&child.name) else {
                continue;
            };
            let target = child.text.as_deref().map(str::trim).unwrap_or_default();
            decoder.link(handle, target, kind)?;
        }
    }

    for record in &chna.records {
        let track = decoder.ids.get(&record.uid).copied().ok_or_else(|| {
            CodecError::MissingElement(format!("track {}", record.uid))
        })?;
        decoder.link(track, &record.track_format, Kind::TrackFormat)?;
        if let Some(pack) = &record.pack_format {
            decoder.link(track, pack, Kind::PackFormat)?;
        }
    }

    tracing::info!(
        entities = decoder.graph.len(),
        extras = decoder.graph.extras().len(),
        "Decoded ADM tree"
    );
    Ok(decoder.graph)
}

struct Decoder {
    graph: AdmGraph,
    ids: HashMap<String, Handle>,
}

impl Decoder {
    fn register(&mut self, id: &str, handle: Handle) -> Result<()> {
        if self.ids.insert(id.to_string(), handle).is_some() {
            return Err(CodecError::DuplicateId(id.to_string()));
        }
        Ok(())
    }

    fn create(
        &mut self,
        kind: Kind,
        node: &TreeNode,
        records: &HashMap<&str, &AudioId>,
    ) -> Result<Handle> {
        let names = tags(kind);
        let raw = node.attr(names.id).ok_or_else(|| {
            CodecError::MissingElement(format!("{} on <{}>", names.id, names.element))
        })?;

        let id = AdmId::parse_kind(raw, kind).map_err(|_| invalid(names.id, raw))?;
        let name = names.name.and_then(|attr| node.attr(attr)).map(str::to_string);
        let config = self.graph.config().clone();
        let type_def = || type_definition(node, &id, config.default_type);

        let body = match kind {
            Kind::Programme => EntityBody::Programme,
            Kind::Content => EntityBody::Content,
            Kind::Object => EntityBody::Object(ObjectAttrs {
                start: time_attr(node, "start")?,
                duration: time_attr(node, "duration")?,
            }),
            Kind::PackFormat => EntityBody::PackFormat(PackAttrs {
                type_def: type_def()?,
            }),
            Kind::ChannelFormat => EntityBody::ChannelFormat(ChannelAttrs {
                type_def: type_def()?,
                blocks: Vec::new(),
            }),
            Kind::StreamFormat => EntityBody::StreamFormat(format_attrs(node, type_def()?)),
            Kind::TrackFormat => EntityBody::TrackFormat(format_attrs(node, type_def()?)),
            Kind::Track => {
                let record = records
                    .get(raw)
                    .ok_or_else(|| CodecError::MissingElement(format!("chna record for {raw}")))?;
                return self.create_track(record, Some(node));
            }
        };

        let handle = self.graph.insert_with_id(id, body, name)?;
        self.register(raw, handle)?;
        if kind == Kind::ChannelFormat {
            self.decode_blocks(handle, node)?;
        }
        Ok(handle)
    }

    fn create_track(&mut self, record: &AudioId, node: Option<&TreeNode>) -> Result<Handle> {
        let id = AdmId::parse_kind(&record.uid, Kind::Track)
            .map_err(|_| invalid("UID", &record.uid))?;
        let config = self.graph.config();
        let sample_rate = match node.and_then(|n| n.attr("sampleRate")) {
            Some(raw) => number(raw, "sampleRate")?,
            None => config.default_sample_rate,
        };
        let bit_depth = match node.and_then(|n| n.attr("bitDepth")) {
            Some(raw) => number(raw, "bitDepth")?,
            None => config.default_bit_depth,
        };
        let number = u32::from(record.track_index)
            .checked_sub(1)
            .ok_or_else(|| invalid("chna track index", "0"))?;
        let body = EntityBody::Track(TrackAttrs {
            number,
            sample_rate,
            bit_depth,
        });
        let handle = self.graph.insert_with_id(id, body, None)?;
        self.register(&record.uid, handle)?;
        Ok(handle)
    }

    fn decode_blocks(&mut self, channel: Handle, node: &TreeNode) -> Result<()> {
        let blocks: Vec<&TreeNode> = node.children_named("audioBlockFormat").collect();
        let starts = blocks
            .iter()
            .map(|b| Ok(time_attr(b, "rtime")?.unwrap_or(0)))
            .collect::<Result<Vec<Nanos>>>()?;

        for (i, block) in blocks.iter().enumerate() {
            let raw = block.attr("audioBlockFormatID").ok_or_else(|| {
                CodecError::MissingElement("audioBlockFormatID on <audioBlockFormat>".into())
            })?;
            let id = AdmId::from_str(raw).map_err(|_| invalid("audioBlockFormatID", raw))?;
            let start = starts[i];
            let duration = match time_attr(block, "duration")? {
                Some(duration) => duration,
                None => starts
                    .get(i + 1)
                    .map(|next| next.saturating_sub(start))
                    .unwrap_or(0),
            };
            let format = BlockFormat::new(start, duration, block_params(block)?);
            self.graph.insert_block_with_id(channel, id, format)?;
        }
        Ok(())
    }

    /// Resolve `target` as an entity of `kind` and link `from` to it.
    ///
    /// References the model does not carry in this direction (for example a
    /// stream format's pack reference) are checked for existence only.
    fn link(&mut self, from: Handle, target: &str, kind: Kind) -> Result<()> {
        let to = self
            .ids
            .get(target)
            .copied()
            .filter(|h| self.graph.entity(*h).map(|e| e.kind()) == Some(kind))
            .ok_or_else(|| CodecError::UnknownReference {
                from: self.graph.label(from),
                id: target.to_string(),
            })?;
        let from_kind = self.graph.get(from)?.kind();
        if !from_kind.may_reference(kind) {
            tracing::debug!(from = %self.graph.label(from), %target, "Ignoring unmodelled reference");
            return Ok(());
        }
        self.graph.link(from, to)?;
        Ok(())
    }
}

fn type_definition(node: &TreeNode, id: &AdmId, fallback: TypeDefinition) -> Result<TypeDefinition> {
    if let Some(name) = node.attr("typeDefinition") {
        return TypeDefinition::from_name(name).ok_or_else(|| invalid("typeDefinition", name));
    }
    if let Some(label) = node.attr("typeLabel") {
        return u16::from_str_radix(label, 16)
            .ok()
            .and_then(TypeDefinition::from_code)
            .ok_or_else(|| invalid("typeLabel", label));
    }
    Ok(id.type_definition().unwrap_or(fallback))
}

fn format_attrs(node: &TreeNode, type_def: TypeDefinition) -> FormatAttrs {
    let mut attrs = FormatAttrs::pcm(type_def);
    if let Some(label) = node.attr("formatLabel") {
        attrs.format_label = label.to_string();
    }
    if let Some(definition) = node.attr("formatDefinition") {
        attrs.format_definition = definition.to_string();
    }
    attrs
}

fn time_attr(node: &TreeNode, attr: &str) -> Result<Option<Nanos>> {
    node.attr(attr).map(parse_time).transpose()
}

fn number<T: FromStr>(raw: &str, field: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| invalid(field, raw))
}

fn block_params(block: &TreeNode) -> Result<BlockParams> {
    let mut position = Position::front();
    for coordinate in block.children_named("position") {
        let raw = coordinate.text.as_deref().unwrap_or_default();
        let value: f64 = number(raw, "position")?;
        match coordinate.attr("coordinate") {
            Some("azimuth") => position.azimuth = value,
            Some("elevation") => position.elevation = value,
            Some("distance") => position.distance = value,
            other => return Err(invalid("position coordinate", other.unwrap_or_default())),
        }
    }

    let mut params = BlockParams::new(position);
    for (name, slot) in [
        ("gain", &mut params.gain),
        ("width", &mut params.width),
        ("height", &mut params.height),
        ("depth", &mut params.depth),
    ] {
        if let Some(raw) = block.child_text(name) {
            *slot = number(raw, name)?;
        }
    }
    Ok(params)
}
