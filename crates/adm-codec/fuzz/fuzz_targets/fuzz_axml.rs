//! Fuzz target for the `axml` decoder.
//!
//! Feeds arbitrary text through the XML backend and the EBU Core mapping,
//! with and without a one-record `chna` index. Malformed documents must be
//! rejected with an error.

#![no_main]

use adm_codec::{decode_chunks, AudioId, ChnaChunk, QuickXmlBackend};
use adm_model::FactoryConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let backend = QuickXmlBackend::new();
    let _ = decode_chunks(&[0, 0, 0, 0], data, &backend, FactoryConfig::default());

    let index = ChnaChunk {
        num_tracks: 1,
        records: vec![AudioId {
            track_index: 1,
            uid: "ATU_00000001".into(),
            track_format: "AT_00031001_01".into(),
            pack_format: Some("AP_00031001".into()),
        }],
    };
    if let Ok(chna) = index.to_bytes() {
        let _ = decode_chunks(&chna, data, &backend, FactoryConfig::default());
    }
});
