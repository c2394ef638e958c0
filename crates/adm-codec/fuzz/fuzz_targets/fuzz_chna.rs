//! Fuzz target for the `chna` index parser.
//!
//! Arbitrary bytes must produce a record list or an error, never a panic.
//! Anything that parses must serialize back to a payload that parses to
//! the same records.

#![no_main]

use adm_codec::ChnaChunk;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(chunk) = ChnaChunk::parse(data) else {
        return;
    };
    let bytes = chunk.to_bytes().expect("parsed records fit their fields");
    assert_eq!(ChnaChunk::parse(&bytes).expect("re-parse"), chunk);
});
