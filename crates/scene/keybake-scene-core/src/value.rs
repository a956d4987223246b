//! Value: the key value carried by one animation track keyframe.

use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Heterogeneous track key value. Transform tracks carry a composite matrix,
/// value tracks carry scalars, booleans or colors.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// Scalar float
    Float(f32),

    /// Boolean (step-only)
    Bool(bool),

    /// RGB color (linear by convention)
    Color([f32; 3]),

    /// Composite transform matrix in parent space
    Transform(Mat4),
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Mat4> for Value {
    fn from(m: Mat4) -> Self {
        Value::Transform(m)
    }
}
