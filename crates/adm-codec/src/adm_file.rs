//! Reading and writing the ADM chunk pair through a chunk container.

use adm_format::{BwfFile, ChunkContainer, ChunkTag, FormatError, MAX_CHUNK_SIZE};
use adm_model::{AdmGraph, FactoryConfig};

use crate::axml::{decode_tree, encode_tree};
use crate::backend::{BackendRegistry, TreeBackend};
use crate::chna::ChnaChunk;
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};

/// Serialized `chna` and `axml` payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmChunks {
    pub chna: Vec<u8>,
    pub axml: Vec<u8>,
}

/// Serialize a finalized graph without touching any container.
pub fn encode_chunks(graph: &AdmGraph, backend: &dyn TreeBackend, indent: usize) -> Result<AdmChunks> {
    let chna = ChnaChunk::from_graph(graph)?.to_bytes()?;
    let tree = encode_tree(graph)?;
    let axml = backend.serialize(&tree, indent)?;
    tracing::debug!(
        backend = backend.name(),
        chna = chna.len(),
        axml = axml.len(),
        "Encoded ADM chunks"
    );
    Ok(AdmChunks { chna, axml })
}

/// Rebuild a graph from raw payloads, sorted and with references connected.
///
/// Nothing is returned unless every step succeeds.
pub fn decode_chunks(
    chna: &[u8],
    axml: &[u8],
    backend: &dyn TreeBackend,
    config: FactoryConfig,
) -> Result<AdmGraph> {
    let index = ChnaChunk::parse(chna)?;
    let tree = backend.parse(axml)?;
    let mut graph = decode_tree(&tree, &index, config)?;
    graph.sort_tracks()?;
    graph.connect_references()?;
    Ok(graph)
}

/// Write `graph` as `chna` and `axml` chunks.
///
/// The backend is resolved and both payloads are produced before the
/// container is modified, so a failure leaves the container untouched.
///
/// # Errors
///
/// [`CodecError::NoBackend`] or [`CodecError::UnknownBackend`] if no backend
/// can be resolved; [`CodecError::NotFinalized`] if the graph still carries
/// temporary IDs; [`CodecError::Container`] if either payload exceeds
/// [`MAX_CHUNK_SIZE`] or the container refuses the chunks.
pub fn write_adm<C: ChunkContainer + ?Sized>(
    container: &mut C,
    graph: &AdmGraph,
    registry: &BackendRegistry,
    config: &CodecConfig,
) -> Result<()> {
    let backend = registry.resolve(config.backend.as_deref())?;
    let chunks = encode_chunks(graph, backend.as_ref(), config.indent)?;
    check_size(ChunkTag::CHNA, chunks.chna.len())?;
    check_size(ChunkTag::AXML, chunks.axml.len())?;

    container.add_chunk(ChunkTag::CHNA)?.write_data(&chunks.chna)?;
    container.add_chunk(ChunkTag::AXML)?.write_data(&chunks.axml)?;
    tracing::info!(
        tracks = graph.tracks().len(),
        entities = graph.len(),
        "Wrote ADM chunks"
    );
    Ok(())
}

fn check_size(tag: ChunkTag, len: usize) -> Result<()> {
    let size = len as u64;
    if size > MAX_CHUNK_SIZE {
        return Err(FormatError::ChunkTooLarge {
            tag,
            size,
            limit: MAX_CHUNK_SIZE,
        }
        .into());
    }
    Ok(())
}

/// Read the `chna` and `axml` chunks of a container into a graph.
///
/// # Errors
///
/// [`CodecError::MissingElement`] if either chunk is absent, plus any
/// parse or structural error from [`decode_chunks`].
pub fn read_adm<C: ChunkContainer + ?Sized>(
    container: &C,
    registry: &BackendRegistry,
    config: &CodecConfig,
) -> Result<AdmGraph> {
    let backend = registry.resolve(config.backend.as_deref())?;
    let chna = container
        .get_chunk(ChunkTag::CHNA)
        .ok_or_else(|| CodecError::MissingElement("chna chunk".into()))?;
    let axml = container
        .get_chunk(ChunkTag::AXML)
        .ok_or_else(|| CodecError::MissingElement("axml chunk".into()))?;

    let graph = decode_chunks(
        chna.data(),
        axml.data(),
        backend.as_ref(),
        config.factory.clone(),
    )?;
    tracing::info!(
        tracks = graph.tracks().len(),
        entities = graph.len(),
        "Read ADM chunks"
    );
    Ok(graph)
}

/// Like [`read_adm`], with track sample rate and bit depth defaulting to the
/// file's `fmt ` chunk.
pub fn read_bwf(file: &BwfFile, registry: &BackendRegistry, config: &CodecConfig) -> Result<AdmGraph> {
    let mut config = config.clone();
    if let Some(format) = file.wave_format().transpose()? {
        config.factory = config
            .factory
            .with_sample_rate(format.sample_rate)
            .with_bit_depth(format.bits_per_sample);
    }
    read_adm(file, registry, &config)
}
