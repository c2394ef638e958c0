//! Graph → chunks → graph through in-memory and on-disk containers.

use adm_codec::{
    decode_chunks, encode_chunks, read_adm, read_bwf, write_adm, BackendRegistry, CodecConfig,
    CodecError, ErrorCategory, QuickXmlBackend, Result, TreeBackend,
};
use adm_format::{BwfFile, ChunkContainer, ChunkTag, WaveFormat};
use adm_model::{
    AdmGraph, BlockFormat, BlockParams, FactoryConfig, Kind, ObjectNames, Position, TreeNode,
};
use adm_timeline::{ReadCursor, WriteCursor};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn at(azimuth: f64) -> BlockParams {
    BlockParams::new(Position::new(azimuth, 0.0, 1.0).unwrap())
}

fn names(object: &str, track: u32) -> ObjectNames {
    ObjectNames {
        programme: Some("Show".into()),
        content: Some("Main".into()),
        object: Some(object.to_string()),
        track: Some(track),
        ..ObjectNames::default()
    }
    .with_formats(object)
}

/// One object per name, each with a block every `step` nanoseconds.
fn scene(objects: &[&str], blocks: u64, step: u64) -> AdmGraph {
    let mut graph = AdmGraph::new();
    for (i, name) in objects.iter().enumerate() {
        graph.create_objects(&names(name, i as u32)).unwrap();
        let channel = graph.find_by_name(Kind::ChannelFormat, name).unwrap();
        for b in 0..blocks {
            let azimuth = (b as f64 * 7.5) % 180.0;
            graph
                .create_block_format(channel, BlockFormat::new(b * step, step, at(azimuth)))
                .unwrap();
        }
    }
    graph.finalize().unwrap();
    graph
}

#[test]
fn test_disk_round_trip_preserves_graph() {
    init_tracing();
    let graph = scene(&["Wasp", "Ant", "Moth"], 4, 250_000_000);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.wav");
    let registry = BackendRegistry::with_defaults();
    let config = CodecConfig::default();

    let mut file = BwfFile::create(&path, WaveFormat::pcm(3, 48000, 24)).unwrap();
    write_adm(&mut file, &graph, &registry, &config).unwrap();
    file.close().unwrap();

    let file = BwfFile::open(&path).unwrap();
    let decoded = read_bwf(&file, &registry, &config).unwrap();
    assert!(decoded.is_sealed());
    assert_eq!(decoded.snapshot().unwrap(), graph.snapshot().unwrap());
}

#[test]
fn test_forward_references_and_unmodelled_elements() {
    let axml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ebuCoreMain xmlns="urn:ebu:metadata-schema:ebuCore_2016">
  <coreMetadata>
    <format>
      <audioFormatExtended>
        <audioProgramme audioProgrammeID="APR_1001" audioProgrammeName="Show">
          <audioContentIDRef>ACO_1001</audioContentIDRef>
        </audioProgramme>
        <audioContent audioContentID="ACO_1001" audioContentName="Main">
          <audioObjectIDRef>AO_1001</audioObjectIDRef>
        </audioContent>
        <audioObject audioObjectID="AO_1001" audioObjectName="Bird">
          <audioPackFormatIDRef>AP_00031001</audioPackFormatIDRef>
          <audioTrackUIDRef>ATU_00000001</audioTrackUIDRef>
        </audioObject>
        <audioTrackUID UID="ATU_00000001" sampleRate="48000" bitDepth="24">
          <audioTrackFormatIDRef>AT_00031001_01</audioTrackFormatIDRef>
          <audioPackFormatIDRef>AP_00031001</audioPackFormatIDRef>
        </audioTrackUID>
        <audioPackFormat audioPackFormatID="AP_00031001" audioPackFormatName="Bird" typeLabel="0003" typeDefinition="Objects">
          <audioChannelFormatIDRef>AC_00031001</audioChannelFormatIDRef>
        </audioPackFormat>
        <audioChannelFormat audioChannelFormatID="AC_00031001" audioChannelFormatName="Bird" typeLabel="0003" typeDefinition="Objects">
          <audioBlockFormat audioBlockFormatID="AB_00031001_00000001" rtime="00:00:00.00000" duration="00:00:01.00000">
            <position coordinate="azimuth">-30.0</position>
            <position coordinate="elevation">0.0</position>
            <position coordinate="distance">1.0</position>
          </audioBlockFormat>
        </audioChannelFormat>
        <audioStreamFormat audioStreamFormatID="AS_00031001" audioStreamFormatName="Bird" formatLabel="0001" formatDefinition="PCM">
          <audioChannelFormatIDRef>AC_00031001</audioChannelFormatIDRef>
          <audioPackFormatIDRef>AP_00031001</audioPackFormatIDRef>
          <audioTrackFormatIDRef>AT_00031001_01</audioTrackFormatIDRef>
        </audioStreamFormat>
        <audioTrackFormat audioTrackFormatID="AT_00031001_01" audioTrackFormatName="Bird" formatLabel="0001" formatDefinition="PCM">
          <audioStreamFormatIDRef>AS_00031001</audioStreamFormatIDRef>
        </audioTrackFormat>
        <audioFormatCustom>
          <note lang="en">kept as-is</note>
        </audioFormatCustom>
      </audioFormatExtended>
    </format>
  </coreMetadata>
</ebuCoreMain>"#;
    let chna = adm_codec::ChnaChunk {
        num_tracks: 1,
        records: vec![adm_codec::AudioId {
            track_index: 1,
            uid: "ATU_00000001".into(),
            track_format: "AT_00031001_01".into(),
            pack_format: Some("AP_00031001".into()),
        }],
    }
    .to_bytes()
    .unwrap();

    let mut file = BwfFile::in_memory();
    file.add_chunk(ChunkTag::CHNA).unwrap().write_data(&chna).unwrap();
    file.add_chunk(ChunkTag::AXML)
        .unwrap()
        .write_data(axml.as_bytes())
        .unwrap();

    let registry = BackendRegistry::with_defaults();
    let graph = read_adm(&file, &registry, &CodecConfig::default()).unwrap();
    assert_eq!(graph.len(), 8);

    let programme = graph.find_by_name(Kind::Programme, "Show").unwrap();
    let content = graph.first_ref(programme, Kind::Content).unwrap();
    assert_eq!(graph.get(content).unwrap().name(), Some("Main"));

    let track = graph.track_by_number(0).unwrap();
    let object = graph.find_by_name(Kind::Object, "Bird").unwrap();
    assert_eq!(graph.objects_for_track(track).unwrap(), vec![object]);
    let mut replay = ReadCursor::for_track(&graph, track).unwrap();
    assert_eq!(replay.params_at(500_000_000).unwrap(), Some(at(-30.0)));

    assert_eq!(graph.extras().len(), 1);
    let extra: &TreeNode = &graph.extras()[0];
    assert_eq!(extra.name, "audioFormatCustom");
    assert_eq!(extra.child("note").unwrap().attr("lang"), Some("en"));

    let mut copy = BwfFile::in_memory();
    write_adm(&mut copy, &graph, &registry, &CodecConfig::default()).unwrap();
    let text = String::from_utf8(copy.get_chunk(ChunkTag::AXML).unwrap().data().to_vec()).unwrap();
    assert!(text.contains("<audioFormatCustom>"));
    let again = read_adm(&copy, &registry, &CodecConfig::default()).unwrap();
    assert_eq!(again.snapshot().unwrap(), graph.snapshot().unwrap());
}

#[test]
fn test_unmodelled_text_keeps_its_whitespace() {
    let mut graph = scene(&["Solo"], 1, 1_000);
    graph.extras_mut().push(
        TreeNode::new("vendorNote")
            .with_child(TreeNode::new("text").with_text("  padded value  "))
            .with_child(TreeNode::new("blank").with_text(" "))
            .with_child(TreeNode::new("cleared").with_text("")),
    );
    let registry = BackendRegistry::with_defaults();
    for indent in [0, 2] {
        let config = CodecConfig::default().with_indent(indent);
        let mut file = BwfFile::in_memory();
        write_adm(&mut file, &graph, &registry, &config).unwrap();
        let decoded = read_adm(&file, &registry, &config).unwrap();
        assert_eq!(decoded.extras(), graph.extras(), "indent {indent}");
        assert_eq!(decoded.snapshot().unwrap(), graph.snapshot().unwrap());
    }
}

#[test]
fn test_trajectory_survives_file_round_trip() {
    let mut graph = AdmGraph::new();
    graph.create_objects(&names("Drone", 0)).unwrap();
    let track = graph.track_by_number(0).unwrap();

    let mut cursor = WriteCursor::new();
    cursor.register_track(&graph, track).unwrap();
    for (t, azimuth) in [(0, -90.0), (40_000_000, -90.0), (80_000_000, 0.0), (120_000_000, 90.0)] {
        cursor.set_position(&mut graph, t, at(azimuth)).unwrap();
    }
    cursor.seek(200_000_000).unwrap();
    cursor.end_position_changes(&mut graph).unwrap();
    graph.finalize().unwrap();

    let registry = BackendRegistry::with_defaults();
    let mut file = BwfFile::in_memory();
    write_adm(&mut file, &graph, &registry, &CodecConfig::default()).unwrap();
    let decoded = read_adm(&file, &registry, &CodecConfig::default()).unwrap();

    let track = decoded.track_by_number(0).unwrap();
    let mut replay = ReadCursor::for_track(&decoded, track).unwrap();
    assert_eq!(replay.params_at(0).unwrap(), Some(at(-90.0)));
    assert_eq!(replay.params_at(79_999_999).unwrap(), Some(at(-90.0)));
    assert_eq!(replay.params_at(100_000_000).unwrap(), Some(at(0.0)));
    assert_eq!(replay.params_at(199_999_999).unwrap(), Some(at(90.0)));

    let object = decoded.find_by_name(Kind::Object, "Drone").unwrap();
    let limits = decoded.get(object).unwrap().as_object().unwrap();
    assert_eq!((limits.start, limits.duration), (Some(0), Some(200_000_000)));
}

#[test]
fn test_repeated_names_are_written_once() {
    let mut graph = AdmGraph::new();
    graph.create_objects(&names("Echo", 0)).unwrap();
    let before = graph.len();
    graph.create_objects(&names("Echo", 0)).unwrap();
    assert_eq!(graph.len(), before);
    graph.finalize().unwrap();

    let backend = QuickXmlBackend::new();
    let chunks = encode_chunks(&graph, &backend, 2).unwrap();
    let text = String::from_utf8(chunks.axml.clone()).unwrap();
    assert_eq!(text.matches("<audioPackFormat ").count(), 1);
    assert_eq!(text.matches("<audioTrackUID ").count(), 1);

    let decoded = decode_chunks(&chunks.chna, &chunks.axml, &backend, FactoryConfig::default())
        .unwrap();
    assert_eq!(decoded.len(), before);
}

#[test]
fn test_finalization_is_idempotent_across_round_trip() {
    let mut graph = scene(&["Wasp", "Ant", "Moth"], 2, 1_000);
    let first = graph.snapshot().unwrap();
    graph.finalize().unwrap();
    assert_eq!(graph.snapshot().unwrap(), first);

    let backend = QuickXmlBackend::new();
    let chunks = encode_chunks(&graph, &backend, 0).unwrap();
    let mut decoded =
        decode_chunks(&chunks.chna, &chunks.axml, &backend, FactoryConfig::default()).unwrap();
    decoded.finalize().unwrap();
    assert_eq!(decoded.snapshot().unwrap(), first);
}

#[test]
fn test_truncated_chna_is_a_format_error() {
    let graph = scene(&["A", "B", "C"], 1, 1_000);
    let backend = QuickXmlBackend::new();
    let mut chunks = encode_chunks(&graph, &backend, 2).unwrap();
    chunks.chna[2..4].copy_from_slice(&5u16.to_le_bytes());

    let mut file = BwfFile::in_memory();
    file.add_chunk(ChunkTag::CHNA).unwrap().write_data(&chunks.chna).unwrap();
    file.add_chunk(ChunkTag::AXML).unwrap().write_data(&chunks.axml).unwrap();

    let err = read_adm(&file, &BackendRegistry::with_defaults(), &CodecConfig::default())
        .unwrap_err();
    assert!(matches!(
        err,
        CodecError::TruncatedIndex {
            declared: 5,
            available: 3
        }
    ));
    assert_eq!(err.category(), ErrorCategory::Format);
}

#[test]
fn test_backend_failures_happen_before_any_write() {
    let graph = scene(&["Solo"], 1, 1_000);
    let mut file = BwfFile::in_memory();

    let err = write_adm(
        &mut file,
        &graph,
        &BackendRegistry::with_defaults(),
        &CodecConfig::default().with_backend("libxml"),
    )
    .unwrap_err();
    assert!(matches!(err, CodecError::UnknownBackend(_)));
    assert_eq!(err.category(), ErrorCategory::Fatal);
    assert!(file.get_chunk(ChunkTag::CHNA).is_none());
    assert!(file.get_chunk(ChunkTag::AXML).is_none());
}

#[test]
fn test_read_only_container_is_a_resource_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ro.wav");
    BwfFile::create(&path, WaveFormat::pcm(1, 48000, 24))
        .unwrap()
        .close()
        .unwrap();

    let mut file = BwfFile::open(&path).unwrap();
    let err = write_adm(
        &mut file,
        &scene(&["Solo"], 1, 1_000),
        &BackendRegistry::with_defaults(),
        &CodecConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Resource);
}

/// Delegates to quick-xml but always writes a single line.
struct Compact(QuickXmlBackend);

impl TreeBackend for Compact {
    fn name(&self) -> &str {
        "compact"
    }

    fn parse(&self, text: &[u8]) -> Result<TreeNode> {
        self.0.parse(text)
    }

    fn serialize(&self, root: &TreeNode, _indent: usize) -> Result<Vec<u8>> {
        self.0.serialize(root, 0)
    }
}

#[test]
fn test_registered_backend_is_selectable() {
    let mut registry = BackendRegistry::with_defaults();
    registry.register(Compact(QuickXmlBackend::new()));
    let graph = scene(&["Solo"], 2, 1_000);

    let mut file = BwfFile::in_memory();
    let config = CodecConfig::default().with_backend("compact");
    write_adm(&mut file, &graph, &registry, &config).unwrap();
    assert!(!file.get_chunk(ChunkTag::AXML).unwrap().data().contains(&b'\n'));

    let decoded = read_adm(&file, &registry, &CodecConfig::default()).unwrap();
    assert_eq!(decoded.snapshot().unwrap(), graph.snapshot().unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn round_trip_preserves_snapshot(
        objects in prop::collection::btree_set("[A-Za-z]{1,8}", 1..6),
        blocks in 0u64..6,
        indent in 0usize..4,
    ) {
        let objects: Vec<&str> = objects.iter().map(String::as_str).collect();
        let graph = scene(&objects, blocks, 10_000);
        let backend = QuickXmlBackend::new();
        let chunks = encode_chunks(&graph, &backend, indent).unwrap();
        let decoded =
            decode_chunks(&chunks.chna, &chunks.axml, &backend, FactoryConfig::default()).unwrap();
        prop_assert_eq!(decoded.snapshot().unwrap(), graph.snapshot().unwrap());
    }
}
