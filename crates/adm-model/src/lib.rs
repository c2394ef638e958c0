//! # adm-model
//!
//! The Audio Definition Model entity graph.
//!
//! Entities (programmes, contents, objects, pack/channel/stream/track
//! formats and tracks) live in an arena owned by [`AdmGraph`] and refer to
//! each other through [`Handle`]s. Block formats are owned, in order, by
//! their channel format.
//!
//! ## Lifecycle
//!
//! 1. **Build** with the factory: [`AdmGraph::create_objects`],
//!    [`AdmGraph::get_or_create`], [`AdmGraph::create_block_format`].
//! 2. **Finalize** with [`AdmGraph::finalize`], or the individual passes
//!    `sort_tracks`, `connect_references` (which seals the reference set),
//!    `change_temporary_ids` and `update_limits`.
//! 3. **Inspect** through queries or a [`GraphSnapshot`].

pub mod block;
pub mod config;
pub mod entity;
pub mod error;
pub mod factory;
pub mod graph;
pub mod id;
pub mod resolve;
pub mod snapshot;
pub mod tree;

pub use block::{BlockFormat, BlockParams, Nanos, Position};
pub use config::FactoryConfig;
pub use entity::{
    ChannelAttrs, Entity, EntityBody, FormatAttrs, Handle, ObjectAttrs, PackAttrs, TrackAttrs,
};
pub use error::{ModelError, Result, StructuralIssue};
pub use factory::ObjectNames;
pub use graph::AdmGraph;
pub use id::{AdmId, EntityId, Kind, TypeDefinition};
pub use snapshot::{GraphSnapshot, NodeSnapshot};
pub use tree::TreeNode;
