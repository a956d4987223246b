//! Authoring-side data model consumed by the exporter.
//!
//! This mirrors what the authoring tool hands us per object: a rest pose and
//! rotation convention, a store of named actions (each a bundle of per-channel
//! keyframe curves addressable by data path), an animation slot holding the
//! active action plus layered timeline strips, and pose bones for skeletons.
//! The exporter reads this model; the only mutation it performs is the
//! create→use→delete cycle of baked actions and the temporary rename around a
//! bake.

use glam::Mat4;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

/// Rotation convention declared per object/bone. Euler variants name the
/// authoring tool's application order (x applied first for `EulerXyz`).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RotationMode {
    Quaternion,
    EulerXyz,
    EulerXzy,
    EulerYxz,
    EulerYzx,
    EulerZxy,
    EulerZyx,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CurveInterpolation {
    /// Hold-left between control points.
    Constant,
    /// Piecewise-linear between control points.
    Linear,
}

/// One control point of a channel curve.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub frame: f32,
    pub value: f32,
}

/// One scalar animation channel: a data path plus a component index (for
/// multi-component attributes) and an ordered control-point list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FCurve {
    pub data_path: String,
    pub array_index: usize,
    pub interpolation: CurveInterpolation,
    pub points: Vec<KeyPoint>,
}

impl FCurve {
    pub fn new(data_path: &str, array_index: usize) -> Self {
        Self {
            data_path: data_path.to_string(),
            array_index,
            interpolation: CurveInterpolation::Linear,
            points: Vec::new(),
        }
    }

    /// Authored frame extent as a half-open `[first, last)` integer range.
    pub fn range(&self) -> (i32, i32) {
        if self.points.is_empty() {
            return (0, 1);
        }
        let first = self.points[0].frame as i32;
        let last = self.points[self.points.len() - 1].frame as i32;
        (first, last + 1)
    }

    /// Continuous evaluation at any frame. Constant-extrapolated outside the
    /// authored range; between points the curve's interpolation mode applies.
    pub fn evaluate(&self, frame: f32) -> f32 {
        let points = &self.points;
        match points.len() {
            0 => 0.0,
            1 => points[0].value,
            _ => {
                if frame <= points[0].frame {
                    return points[0].value;
                }
                let last = &points[points.len() - 1];
                if frame >= last.frame {
                    return last.value;
                }
                // Invariant: points are ordered by frame. A point at exactly
                // `frame` must land on the left of the segment so hold-left
                // takes the key's own value at its frame.
                let mut right = 1;
                while points[right].frame <= frame {
                    right += 1;
                }
                let (p0, p1) = (&points[right - 1], &points[right]);
                match self.interpolation {
                    CurveInterpolation::Constant => p0.value,
                    CurveInterpolation::Linear => {
                        let denom = (p1.frame - p0.frame).max(f32::EPSILON);
                        let t = (frame - p0.frame) / denom;
                        p0.value + (p1.value - p0.value) * t
                    }
                }
            }
        }
    }
}

/// A named, reusable bundle of keyframe curves.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub fcurves: Vec<FCurve>,
}

impl Action {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fcurves: Vec::new(),
        }
    }

    /// Declared frame extent as a half-open range over all curves.
    pub fn frame_range(&self) -> (i32, i32) {
        let mut first = i32::MAX;
        let mut last = i32::MIN;
        for curve in &self.fcurves {
            let (a, b) = curve.range();
            first = first.min(a);
            last = last.max(b);
        }
        if first > last {
            (0, 1)
        } else {
            (first, last)
        }
    }

    /// First curve matching a full data path, component index 0 convention
    /// for single-component attributes. Absence is "nothing to export".
    pub fn find_curve(&self, data_path: &str) -> Option<&FCurve> {
        self.fcurves.iter().find(|c| c.data_path == data_path)
    }
}

/// A placement of an action on the layered timeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NlaStrip {
    pub action: Option<ActionId>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NlaTrack {
    pub strips: Vec<NlaStrip>,
}

/// Per-object animation slot: the current (default) action plus the layered
/// strips referencing named alternates.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnimationSlot {
    pub active_action: Option<ActionId>,
    pub nla_tracks: Vec<NlaTrack>,
}

/// One bone of a skeleton object, with its own rest transform and rotation
/// convention.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoseBone {
    pub name: String,
    pub rest_matrix: Mat4,
    pub rotation_mode: RotationMode,
    pub constrained: bool,
}

impl PoseBone {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rest_matrix: Mat4::IDENTITY,
            rotation_mode: RotationMode::Quaternion,
            constrained: false,
        }
    }
}

/// Rest-state camera optics, the fallback when only one of the two
/// fov-driving channels is animated.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub focal_length: f32,
    pub sensor_width: f32,
}

/// One animated entity handed over by the authoring tool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceObject {
    pub name: String,
    /// Un-animated local transform, baseline for sparse channel coverage.
    pub rest_matrix: Mat4,
    /// Parent-space re-basing matrix applied to object-level transforms.
    pub matrix_parent_inverse: Mat4,
    pub rotation_mode: RotationMode,
    /// Whole-object procedural constraints present.
    pub constrained: bool,
    /// Set when the object is parented to a skeleton bone; length of that
    /// bone, needed for the attachment offset correction.
    pub attachment_bone_length: Option<f32>,
    pub bones: Vec<PoseBone>,
    pub animation: Option<AnimationSlot>,
    pub camera: Option<CameraSettings>,
}

impl SourceObject {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rest_matrix: Mat4::IDENTITY,
            matrix_parent_inverse: Mat4::IDENTITY,
            rotation_mode: RotationMode::Quaternion,
            constrained: false,
            attachment_bone_length: None,
            bones: Vec::new(),
            animation: None,
            camera: None,
        }
    }

    pub fn find_bone(&self, name: &str) -> Option<&PoseBone> {
        self.bones.iter().find(|b| b.name == name)
    }
}

/// The authoring scene: frame rate, objects and the action store.
#[derive(Debug)]
pub struct SourceScene {
    pub frame_rate: f32,
    objects: Vec<SourceObject>,
    actions: Vec<(ActionId, Action)>,
    next_action: u32,
}

impl SourceScene {
    pub fn new(frame_rate: f32) -> Self {
        Self {
            frame_rate,
            objects: Vec::new(),
            actions: Vec::new(),
            next_action: 0,
        }
    }

    pub fn add_object(&mut self, object: SourceObject) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    pub fn object(&self, id: ObjectId) -> &SourceObject {
        &self.objects[id.0 as usize]
    }

    pub fn object_mut(&mut self, id: ObjectId) -> &mut SourceObject {
        &mut self.objects[id.0 as usize]
    }

    pub fn add_action(&mut self, action: Action) -> ActionId {
        let id = ActionId(self.next_action);
        self.next_action = self.next_action.wrapping_add(1);
        self.actions.push((id, action));
        id
    }

    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions
            .iter()
            .find_map(|(a, d)| if *a == id { Some(d) } else { None })
    }

    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut Action> {
        self.actions
            .iter_mut()
            .find_map(|(a, d)| if *a == id { Some(d) } else { None })
    }

    /// Delete an action from the store (baked curve sets after consumption).
    pub fn remove_action(&mut self, id: ActionId) {
        self.actions.retain(|(a, _)| *a != id);
    }

    pub fn actions(&self) -> impl Iterator<Item = &(ActionId, Action)> {
        self.actions.iter()
    }
}

/// Split a channel data path into the entity path and the attribute name:
/// `pose.bones["arm"].location` → (`pose.bones["arm"]`, `location`).
/// A bare attribute splits into an empty entity path (the object itself).
pub fn split_data_path(data_path: &str) -> (&str, &str) {
    match data_path.rsplit_once('.') {
        Some((object_path, attribute)) => (object_path, attribute),
        None => ("", data_path),
    }
}

fn quoted_segment<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    let rest = rest.strip_prefix("[\"")?;
    let end = rest.find('"')?;
    Some(&rest[..end])
}

/// Bone name inside a pose-bone entity path (`pose.bones["name"]`).
pub fn bone_name_from_path(object_path: &str) -> Option<&str> {
    quoted_segment(object_path, "pose.bones")
}

/// Shapekey name inside a key-block entity path (`key_blocks["name"]`).
pub fn shapekey_name_from_path(object_path: &str) -> Option<&str> {
    quoted_segment(object_path, "key_blocks")
}
