//! keybake-scene-core: output-document model (engine-agnostic).
//!
//! This crate is the "document side" collaborator of the animation exporter:
//! a scene tree of typed nodes, append-only internal resources, node-path
//! addressing, plain string builders for the text serialization, and the
//! coordinate-space corrections applied when leaving authoring space.

pub mod document;
pub mod path;
pub mod spatial;
pub mod value;
pub mod writer;

pub use document::{InternalResource, NodeId, ResourceId, SceneDocument, SceneNode, SkeletonBone};
pub use path::NodePath;
pub use spatial::{fix_bone_attachment_transform, fix_directional_transform, fix_matrix};
pub use value::Value;
pub use writer::{ArrayBuilder, MapBuilder, Property};
