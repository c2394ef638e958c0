//! # adm-codec
//!
//! Encodes an [`AdmGraph`](adm_model::AdmGraph) into the two Broadcast Wave
//! chunks that carry ADM metadata, and decodes it back:
//!
//! - **`chna`**: a binary index mapping each physical track to its
//!   `audioTrackUID`, track format and pack format ([`chna`]).
//! - **`axml`**: the EBU Core XML document holding every entity ([`axml`]),
//!   rendered through a pluggable [`TreeBackend`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use adm_codec::{read_adm, write_adm, BackendRegistry, CodecConfig};
//! use adm_format::BwfFile;
//! use adm_model::{AdmGraph, ObjectNames};
//!
//! let mut graph = AdmGraph::new();
//! graph
//!     .create_objects(&ObjectNames {
//!         object: Some("Voice".into()),
//!         track: Some(0),
//!         ..ObjectNames::new().with_formats("Voice")
//!     })
//!     .unwrap();
//! graph.finalize().unwrap();
//!
//! let registry = BackendRegistry::with_defaults();
//! let mut file = BwfFile::in_memory();
//! write_adm(&mut file, &graph, &registry, &CodecConfig::default()).unwrap();
//! let decoded = read_adm(&file, &registry, &CodecConfig::default()).unwrap();
//! assert_eq!(decoded.len(), graph.len());
//! ```

pub mod adm_file;
pub mod axml;
pub mod backend;
pub mod chna;
pub mod config;
pub mod error;
pub mod time;
pub mod xml;

pub use adm_file::{decode_chunks, encode_chunks, read_adm, read_bwf, write_adm, AdmChunks};
pub use axml::{decode_tree, encode_tree};
pub use backend::{BackendRegistry, TreeBackend};
pub use chna::{AudioId, ChnaChunk};
pub use config::CodecConfig;
pub use error::{CodecError, ErrorCategory, Result};
pub use time::{format_time, parse_time};
pub use xml::QuickXmlBackend;
