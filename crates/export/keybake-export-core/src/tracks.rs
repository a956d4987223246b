//! Track building: typed (frame, value) lists for one target path.
//!
//! Values append in frame order and are never reordered. Interpolation mode
//! decides how the resource assembler serializes the track: linear tracks get
//! identical-run coalescing, nearest tracks keep every authored point.

use keybake_scene_core::{NodePath, Value};
use serde::{Deserialize, Serialize};

use crate::source::FCurve;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TrackKind {
    Transform,
    Value,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Transform => "transform",
            TrackKind::Value => "value",
        }
    }
}

/// Interpolation mode carried into the output format; numeric values match
/// the format's own encoding.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TrackInterpolation {
    Nearest = 0,
    Linear = 1,
}

/// One animation track: a path into the scene tree plus parallel frame and
/// value lists.
#[derive(Clone, Debug)]
pub struct Track {
    pub kind: TrackKind,
    pub path: NodePath,
    pub interpolation: TrackInterpolation,
    pub frames: Vec<i32>,
    pub values: Vec<Value>,
}

impl Track {
    pub fn new(kind: TrackKind, path: NodePath) -> Self {
        Self {
            kind,
            path,
            interpolation: TrackInterpolation::Linear,
            frames: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn with_keys(
        kind: TrackKind,
        path: NodePath,
        frames: impl IntoIterator<Item = i32>,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        let mut track = Self::new(kind, path);
        track.frames.extend(frames);
        track.values.extend(values);
        track
    }

    pub fn add_frame_data(&mut self, frame: i32, value: Value) {
        self.frames.push(frame);
        self.values.push(value);
    }

    /// Frame number of the last key, 0 for an empty track.
    pub fn frame_end(&self) -> i32 {
        self.frames.last().copied().unwrap_or(0)
    }

    pub fn frame_begin(&self) -> i32 {
        self.frames.first().copied().unwrap_or(0)
    }
}

/// Plain-data value transform applied point-wise while building a value
/// track. Kept as data rather than closures so mapping tables stay inert
/// configuration.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ValueMap {
    /// Scalar comparison producing a boolean.
    GreaterThan(f32),
    /// Multiply by a constant factor.
    Scale(f32),
    /// Radians to degrees.
    Degrees,
    /// Full cone angle in radians to half angle in degrees.
    HalfAngleDegrees,
    /// 0 stays 0, anything else becomes 1.
    BinaryStep,
}

impl ValueMap {
    pub fn apply(&self, v: f32) -> Value {
        match self {
            ValueMap::GreaterThan(threshold) => Value::Bool(v > *threshold),
            ValueMap::Scale(factor) => Value::Float(v * factor),
            ValueMap::Degrees => Value::Float(v.to_degrees()),
            ValueMap::HalfAngleDegrees => Value::Float((v * 0.5).to_degrees()),
            ValueMap::BinaryStep => Value::Float(if v == 0.0 { 0.0 } else { 1.0 }),
        }
    }
}

fn map_or_float(map: Option<ValueMap>, v: f32) -> Value {
    match map {
        Some(m) => m.apply(v),
        None => Value::Float(v),
    }
}

/// How an attribute's value converts into the output format.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Converted as a bool, no interpolation.
    Bool,
    /// Converted as a float.
    Float,
    /// Vector or matrix attribute mapping to several curves; handled by a
    /// dedicated exporter path, not the generic table walk.
    MultiValue,
}

/// One entry of a per-node-class attribute mapping table: source attribute
/// path, target property name, optional value transform, value kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeConvertInfo {
    pub source_path: String,
    pub target_property: String,
    pub map: Option<ValueMap>,
    pub kind: AttributeKind,
}

impl AttributeConvertInfo {
    pub fn new(
        source_path: &str,
        target_property: &str,
        map: Option<ValueMap>,
        kind: AttributeKind,
    ) -> Self {
        Self {
            source_path: source_path.to_string(),
            target_property: target_property.to_string(),
            map,
            kind,
        }
    }
}

/// Build a value track from a constant-interpolation curve: one key per
/// authored control point, verbatim, marked nearest.
pub fn build_const_interp_value_track(
    path: NodePath,
    map: Option<ValueMap>,
    fcurve: &FCurve,
) -> Track {
    let mut track = Track::new(TrackKind::Value, path);
    track.interpolation = TrackInterpolation::Nearest;
    for point in &fcurve.points {
        track.add_frame_data(point.frame as i32, map_or_float(map, point.value));
    }
    track
}

/// Build a value track by continuously evaluating every integer frame of the
/// curve's authored range.
pub fn build_linear_interp_value_track(
    path: NodePath,
    map: Option<ValueMap>,
    fcurve: &FCurve,
) -> Track {
    let mut track = Track::new(TrackKind::Value, path);
    let (first, last) = fcurve.range();
    for frame in first..last {
        track.add_frame_data(frame, map_or_float(map, fcurve.evaluate(frame as f32)));
    }
    track
}
