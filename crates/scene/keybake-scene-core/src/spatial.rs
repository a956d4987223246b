//! Coordinate-space corrections applied when a transform leaves authoring
//! space (z-up, y-forward) for document space (y-up, -z-forward).

use glam::{Mat4, Vec4};
use std::f32::consts::FRAC_PI_2;

/// Change-of-basis matrix: x stays, authoring z becomes up, authoring y
/// becomes back.
fn axis_conversion() -> Mat4 {
    Mat4::from_cols(
        Vec4::new(1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, -1.0, 0.0),
        Vec4::new(0.0, 1.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 0.0, 1.0),
    )
}

/// Re-express a full transform in the document's up-axis convention.
pub fn fix_matrix(m: Mat4) -> Mat4 {
    let conv = axis_conversion();
    conv * m * conv.inverse()
}

/// Cameras and directional lights look down -z in the document but down the
/// authoring tool's z; rotate the local frame to compensate.
pub fn fix_directional_transform(m: Mat4) -> Mat4 {
    m * Mat4::from_rotation_x(-FRAC_PI_2)
}

/// Objects parented to a skeleton bone are offset by the bone's length along
/// its y axis; the authoring transform does not include that offset.
pub fn fix_bone_attachment_transform(bone_length: f32, m: Mat4) -> Mat4 {
    let mut fixed = m;
    fixed.w_axis.y += bone_length;
    fixed
}
