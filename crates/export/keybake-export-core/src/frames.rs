//! Frame reconstruction: turn independently-evaluated per-component channel
//! curves back into one composite transform per frame.
//!
//! Channels arrive separated (location.x, location.y, rotation.w, …), each
//! with its own keyframes. For every frame of the export window a
//! `TransformFrame` accumulator starts from the entity's rest pose and is
//! overwritten component-by-component as matching curves are found, then
//! collapses into a single matrix.

use glam::{EulerRot, Mat4, Quat, Vec3};
use keybake_scene_core::SceneNode;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::source::{
    bone_name_from_path, split_data_path, Action, RotationMode, SourceObject,
};

/// Integer half-open frame range `[first, last)` all per-frame work iterates.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FrameWindow {
    pub first: i32,
    pub last: i32,
}

impl FrameWindow {
    /// Fallback window when no action declares an extent (frames 1–250).
    pub const DEFAULT: FrameWindow = FrameWindow {
        first: 1,
        last: 250,
    };

    pub fn from_action(action: &Action) -> Self {
        let (first, last) = action.frame_range();
        Self { first, last }
    }

    pub fn iter(&self) -> std::ops::Range<i32> {
        self.first..self.last
    }

    pub fn len(&self) -> usize {
        (self.last - self.first).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.last <= self.first
    }
}

/// The four attribute names a transform channel can target.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransformAttribute {
    Location,
    Scale,
    RotationQuaternion,
    RotationEuler,
}

impl TransformAttribute {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "location" => Some(Self::Location),
            "scale" => Some(Self::Scale),
            "rotation_quaternion" => Some(Self::RotationQuaternion),
            "rotation_euler" => Some(Self::RotationEuler),
            _ => None,
        }
    }
}

fn glam_order(mode: RotationMode) -> EulerRot {
    // The authoring order names the axis applied first; glam's intrinsic
    // orders name the axis applied last first, so the order reverses.
    match mode {
        RotationMode::Quaternion | RotationMode::EulerXyz => EulerRot::ZYX,
        RotationMode::EulerXzy => EulerRot::YZX,
        RotationMode::EulerYxz => EulerRot::ZXY,
        RotationMode::EulerYzx => EulerRot::XZY,
        RotationMode::EulerZxy => EulerRot::YXZ,
        RotationMode::EulerZyx => EulerRot::XYZ,
    }
}

/// Compose a quaternion from per-axis angles stored as `[x, y, z]`.
pub fn euler_to_quat(mode: RotationMode, e: [f32; 3]) -> Quat {
    let order = glam_order(mode);
    let (a, b, c) = match order {
        EulerRot::ZYX => (e[2], e[1], e[0]),
        EulerRot::YZX => (e[1], e[2], e[0]),
        EulerRot::ZXY => (e[2], e[0], e[1]),
        EulerRot::XZY => (e[0], e[2], e[1]),
        EulerRot::YXZ => (e[1], e[0], e[2]),
        EulerRot::XYZ => (e[0], e[1], e[2]),
        _ => (e[0], e[1], e[2]),
    };
    Quat::from_euler(order, a, b, c)
}

/// Decompose a quaternion into per-axis angles stored as `[x, y, z]`.
pub fn quat_to_euler(mode: RotationMode, q: Quat) -> [f32; 3] {
    let order = glam_order(mode);
    let (a, b, c) = q.to_euler(order);
    match order {
        EulerRot::ZYX => [c, b, a],
        EulerRot::YZX => [c, a, b],
        EulerRot::ZXY => [b, c, a],
        EulerRot::XZY => [a, c, b],
        EulerRot::YXZ => [b, a, c],
        EulerRot::XYZ => [a, b, c],
        _ => [a, b, c],
    }
}

/// Mutable accumulator for one (entity, frame) pair. Quaternion components
/// are stored in the authoring component order `(w, x, y, z)` so that curve
/// array indices write the right slot.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TransformFrame {
    pub location: Vec3,
    pub scale: Vec3,
    pub rotation_mode: RotationMode,
    pub rotation_quaternion: [f32; 4],
    pub rotation_euler: [f32; 3],
}

impl TransformFrame {
    /// Seed every component from the entity's rest transform. Note the
    /// decomposition loses negative scale.
    pub fn from_rest(rest: Mat4, rotation_mode: RotationMode) -> Self {
        let (scale, rotation, location) = rest.to_scale_rotation_translation();
        Self {
            location,
            scale,
            rotation_mode,
            rotation_quaternion: [rotation.w, rotation.x, rotation.y, rotation.z],
            rotation_euler: quat_to_euler(rotation_mode, rotation),
        }
    }

    /// Overwrite one component from curve data. Out-of-range component
    /// indices are ignored.
    pub fn update(&mut self, attribute: TransformAttribute, index: usize, value: f32) {
        match attribute {
            TransformAttribute::Location => {
                if index < 3 {
                    self.location[index] = value;
                }
            }
            TransformAttribute::Scale => {
                if index < 3 {
                    self.scale[index] = value;
                }
            }
            TransformAttribute::RotationQuaternion => {
                if index < 4 {
                    self.rotation_quaternion[index] = value;
                }
            }
            TransformAttribute::RotationEuler => {
                if index < 3 {
                    self.rotation_euler[index] = value;
                }
            }
        }
    }

    /// Collapse to a composite matrix: translation × rotation × scale. The
    /// rotation representation follows the entity's declared convention.
    pub fn to_matrix(&self) -> Mat4 {
        let rotation = match self.rotation_mode {
            RotationMode::Quaternion => {
                let [w, x, y, z] = self.rotation_quaternion;
                Quat::from_xyzw(x, y, z, w).normalize()
            }
            mode => euler_to_quat(mode, self.rotation_euler),
        };
        Mat4::from_translation(self.location)
            * Mat4::from_quat(rotation)
            * Mat4::from_scale(self.scale)
    }
}

/// Reconstruct per-frame transforms for every entity path an action touches.
///
/// Curves are grouped by entity path (the object itself has the empty path,
/// bones have `pose.bones["…"]`). A group is discarded, with a warning, when
/// its bone target cannot be resolved in the output skeleton; this is an
/// exclusion, not an error. Non-transform attributes are ignored here.
/// Insertion order of groups is preserved.
pub fn reconstruct_transform_frames(
    action: &Action,
    object: &SourceObject,
    target: &SceneNode,
    window: FrameWindow,
) -> Vec<(String, Vec<TransformFrame>)> {
    let mut groups: Vec<(String, Vec<TransformFrame>)> = Vec::new();
    let mut excluded: Vec<String> = Vec::new();

    for fcurve in &action.fcurves {
        let (object_path, attribute_name) = split_data_path(&fcurve.data_path);
        let attribute = match TransformAttribute::from_name(attribute_name) {
            Some(a) => a,
            None => continue,
        };
        if excluded.iter().any(|p| p == object_path) {
            continue;
        }

        let known = groups.iter().any(|(p, _)| p == object_path);
        if !known {
            match init_frame_values(object_path, object, target, window) {
                Some(frames) => groups.push((object_path.to_string(), frames)),
                None => {
                    excluded.push(object_path.to_string());
                    continue;
                }
            }
        }

        let frames = groups
            .iter_mut()
            .find_map(|(p, f)| if p == object_path { Some(f) } else { None })
            .unwrap();
        for frame in window.iter() {
            frames[(frame - window.first) as usize].update(
                attribute,
                fcurve.array_index,
                fcurve.evaluate(frame as f32),
            );
        }
    }

    groups
}

fn init_frame_values(
    object_path: &str,
    object: &SourceObject,
    target: &SceneNode,
    window: FrameWindow,
) -> Option<Vec<TransformFrame>> {
    let default_frame = if object_path.starts_with("pose") {
        let bone_name = bone_name_from_path(object_path)?;

        if target.class != "Skeleton" {
            warn!(
                "skip a bone curve in non-skeleton object '{}'",
                object.name
            );
            return None;
        }
        if target.find_bone_id(bone_name).is_none() {
            warn!(
                "skip curve for bone '{}' absent from exported skeleton '{}'",
                bone_name, target.name
            );
            return None;
        }

        let bone = object.find_bone(bone_name)?;
        TransformFrame::from_rest(bone.rest_matrix, bone.rotation_mode)
    } else {
        TransformFrame::from_rest(object.rest_matrix, object.rotation_mode)
    };

    Some(vec![default_frame; window.len()])
}
