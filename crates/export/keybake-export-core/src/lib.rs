//! Animation export: converts keyframed source data (object and bone
//! transforms, shape keys, light and camera attributes) into named animation
//! resources owned by player nodes in a scene document.
//!
//! The pipeline in order: reconstruct per-frame transform state from sparse
//! channel curves, bake constraint effects into plain curve sets where
//! needed, build typed tracks, assemble them into resources, and register
//! everything into the document through [`AnimationExporter::finish`].

pub mod baking;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod frames;
pub mod mappings;
pub mod player;
pub mod resource;
pub mod source;
pub mod tracks;

pub use baking::{
    bake_constraint_to_action, has_object_constraint, has_pose_constraint, BakeDomain,
    ConstraintSolver, PoseSample, BAKING_SUFFIX,
};
pub use config::ExportConfig;
pub use dispatch::{ActionDomain, AnimationExporter};
pub use error::ExportError;
pub use frames::{FrameWindow, TransformFrame};
pub use player::{PlayerScope, ScopePolicy};
pub use resource::AnimationResource;
pub use source::{
    Action, ActionId, AnimationSlot, CameraSettings, CurveInterpolation, FCurve, KeyPoint,
    NlaStrip, NlaTrack, ObjectId, PoseBone, RotationMode, SourceObject, SourceScene,
};
pub use tracks::{
    AttributeConvertInfo, AttributeKind, Track, TrackInterpolation, TrackKind, ValueMap,
};
