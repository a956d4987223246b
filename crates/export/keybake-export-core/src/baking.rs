//! Constraint baking: sample the resolved pose at every integer frame and
//! write it back as an explicit curve set.
//!
//! Procedural constraints (IK and friends) cannot be represented in the
//! output format, so constrained objects are exported from a baked action
//! instead of their raw curves. Pose evaluation itself belongs to the
//! authoring collaborator, reached through [`ConstraintSolver`]; a solver
//! failure is fatal for the whole export call. Baked actions exist only for
//! the duration of one export and are removed by the caller afterwards.

use glam::Mat4;

use crate::error::ExportError;
use crate::frames::{quat_to_euler, FrameWindow};
use crate::source::{
    Action, ActionId, CurveInterpolation, FCurve, KeyPoint, ObjectId, RotationMode, SourceObject,
    SourceScene,
};

/// Suffix appended to an action while it is being baked, so the bake output
/// can take the original name. Always reverted before returning.
pub const BAKING_SUFFIX: &str = "--being-baked";

/// Which constraint domain a bake pass resolves.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BakeDomain {
    /// Whole-object constraints; the pass writes object-level channels.
    Object,
    /// Per-bone constraints; the pass writes pose-bone channels.
    Pose,
}

/// Fully resolved pose of one object at one frame.
#[derive(Clone, Debug)]
pub struct PoseSample {
    /// Resolved local transform of the object itself.
    pub object_transform: Mat4,
    /// Resolved bone-space transforms, by bone name.
    pub bone_transforms: Vec<(String, Mat4)>,
}

/// Authoring-tool collaborator able to evaluate an object's resolved pose at
/// a given frame, with `action` (if any) driving the evaluation.
pub trait ConstraintSolver {
    fn sample(
        &mut self,
        scene: &SourceScene,
        object: ObjectId,
        action: Option<ActionId>,
        frame: i32,
        domain: BakeDomain,
    ) -> Result<PoseSample, String>;
}

pub fn has_object_constraint(object: &SourceObject) -> bool {
    object.constrained
}

pub fn has_pose_constraint(object: &SourceObject) -> bool {
    object.bones.iter().any(|b| b.constrained)
}

/// Bake one constraint domain into an explicit curve set.
///
/// Samples every integer frame of `base_action`'s declared range (or the
/// fixed fallback window when there is no action) and writes one key per
/// frame. With `in_place` the keys land in `base_action` itself (used for the
/// second pass of a combined Object→Pose bake); otherwise a new action is
/// created, named after the base action minus its temporary suffix, or
/// `<object>Action` when baking without one.
pub fn bake_constraint_to_action(
    scene: &mut SourceScene,
    solver: &mut dyn ConstraintSolver,
    object_id: ObjectId,
    base_action: Option<ActionId>,
    domain: BakeDomain,
    in_place: bool,
) -> Result<ActionId, ExportError> {
    let window = match base_action {
        Some(id) => {
            let action = scene.action(id).ok_or(ExportError::MissingAction(id))?;
            FrameWindow::from_action(action)
        }
        None => FrameWindow::DEFAULT,
    };
    let object_name = scene.object(object_id).name.clone();

    let mut samples: Vec<(i32, PoseSample)> = Vec::with_capacity(window.len());
    for frame in window.iter() {
        let sample = solver
            .sample(scene, object_id, base_action, frame, domain)
            .map_err(|reason| ExportError::Bake {
                object: object_name.clone(),
                reason,
            })?;
        samples.push((frame, sample));
    }

    let target = if in_place {
        base_action.expect("in-place bake requires a base action")
    } else {
        let name = match base_action {
            Some(id) => {
                let base_name = &scene.action(id).ok_or(ExportError::MissingAction(id))?.name;
                base_name
                    .strip_suffix(BAKING_SUFFIX)
                    .unwrap_or(base_name)
                    .to_string()
            }
            None => format!("{}Action", object_name),
        };
        scene.add_action(Action::new(&name))
    };

    match domain {
        BakeDomain::Object => {
            let mode = scene.object(object_id).rotation_mode;
            let keys: Vec<(i32, Mat4)> = samples
                .iter()
                .map(|(f, s)| (*f, s.object_transform))
                .collect();
            let action = scene
                .action_mut(target)
                .ok_or(ExportError::MissingAction(target))?;
            write_transform_channels(action, "", mode, &keys);
        }
        BakeDomain::Pose => {
            let bone_modes: Vec<(String, RotationMode)> = scene
                .object(object_id)
                .bones
                .iter()
                .map(|b| (b.name.clone(), b.rotation_mode))
                .collect();
            // Per-bone key lists, gathered before mutating the store.
            let mut per_bone: Vec<(String, RotationMode, Vec<(i32, Mat4)>)> = Vec::new();
            for (name, mode) in bone_modes {
                let keys: Vec<(i32, Mat4)> = samples
                    .iter()
                    .filter_map(|(f, s)| {
                        s.bone_transforms
                            .iter()
                            .find(|(n, _)| *n == name)
                            .map(|(_, m)| (*f, *m))
                    })
                    .collect();
                if !keys.is_empty() {
                    per_bone.push((name, mode, keys));
                }
            }
            let action = scene
                .action_mut(target)
                .ok_or(ExportError::MissingAction(target))?;
            for (name, mode, keys) in per_bone {
                let prefix = format!("pose.bones[\"{}\"]", name);
                write_transform_channels(action, &prefix, mode, &keys);
            }
        }
    }

    Ok(target)
}

/// Append location/rotation/scale channels for one entity path, one key per
/// sampled frame, linear interpolation.
fn write_transform_channels(
    action: &mut Action,
    entity_path: &str,
    mode: RotationMode,
    keys: &[(i32, Mat4)],
) {
    let path = |attribute: &str| -> String {
        if entity_path.is_empty() {
            attribute.to_string()
        } else {
            format!("{}.{}", entity_path, attribute)
        }
    };

    let mut location = new_channels(&path("location"), 3);
    let mut scale = new_channels(&path("scale"), 3);
    let mut rotation = match mode {
        RotationMode::Quaternion => new_channels(&path("rotation_quaternion"), 4),
        _ => new_channels(&path("rotation_euler"), 3),
    };

    for (frame, matrix) in keys {
        let (sca, rot, loc) = matrix.to_scale_rotation_translation();
        let frame = *frame as f32;
        for (i, curve) in location.iter_mut().enumerate() {
            curve.points.push(KeyPoint {
                frame,
                value: loc[i],
            });
        }
        for (i, curve) in scale.iter_mut().enumerate() {
            curve.points.push(KeyPoint {
                frame,
                value: sca[i],
            });
        }
        match mode {
            RotationMode::Quaternion => {
                // Authoring component order (w, x, y, z).
                let components = [rot.w, rot.x, rot.y, rot.z];
                for (i, curve) in rotation.iter_mut().enumerate() {
                    curve.points.push(KeyPoint {
                        frame,
                        value: components[i],
                    });
                }
            }
            _ => {
                let euler = quat_to_euler(mode, rot);
                for (i, curve) in rotation.iter_mut().enumerate() {
                    curve.points.push(KeyPoint {
                        frame,
                        value: euler[i],
                    });
                }
            }
        }
    }

    action.fcurves.append(&mut location);
    action.fcurves.append(&mut rotation);
    action.fcurves.append(&mut scale);
}

fn new_channels(data_path: &str, count: usize) -> Vec<FCurve> {
    (0..count)
        .map(|index| {
            let mut curve = FCurve::new(data_path, index);
            curve.interpolation = CurveInterpolation::Linear;
            curve
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    struct FixedSolver(Mat4);

    impl ConstraintSolver for FixedSolver {
        fn sample(
            &mut self,
            _scene: &SourceScene,
            _object: ObjectId,
            _action: Option<ActionId>,
            frame: i32,
            _domain: BakeDomain,
        ) -> Result<PoseSample, String> {
            Ok(PoseSample {
                object_transform: Mat4::from_translation(Vec3::new(frame as f32, 0.0, 0.0))
                    * self.0,
                bone_transforms: Vec::new(),
            })
        }
    }

    struct FailingSolver;

    impl ConstraintSolver for FailingSolver {
        fn sample(
            &mut self,
            _scene: &SourceScene,
            _object: ObjectId,
            _action: Option<ActionId>,
            _frame: i32,
            _domain: BakeDomain,
        ) -> Result<PoseSample, String> {
            Err("no active object".to_string())
        }
    }

    #[test]
    fn bake_without_action_uses_fallback_window() {
        let mut scene = SourceScene::new(24.0);
        let obj = scene.add_object(SourceObject::new("Cube"));
        let mut solver = FixedSolver(Mat4::IDENTITY);
        let baked =
            bake_constraint_to_action(&mut scene, &mut solver, obj, None, BakeDomain::Object, false)
                .unwrap();
        let action = scene.action(baked).unwrap();
        assert_eq!(action.name, "CubeAction");
        let loc_x = action
            .fcurves
            .iter()
            .find(|c| c.data_path == "location" && c.array_index == 0)
            .unwrap();
        assert_eq!(loc_x.points.len(), FrameWindow::DEFAULT.len());
        assert_eq!(loc_x.points[0].frame, 1.0);
        assert_eq!(loc_x.points[0].value, 1.0);
    }

    #[test]
    fn bake_strips_temporary_suffix_from_name() {
        let mut scene = SourceScene::new(24.0);
        let obj = scene.add_object(SourceObject::new("Cube"));
        let mut base = Action::new(&format!("walk{}", BAKING_SUFFIX));
        let mut curve = FCurve::new("location", 0);
        curve.points.push(KeyPoint {
            frame: 1.0,
            value: 0.0,
        });
        curve.points.push(KeyPoint {
            frame: 10.0,
            value: 9.0,
        });
        base.fcurves.push(curve);
        let base_id = scene.add_action(base);

        let mut solver = FixedSolver(Mat4::IDENTITY);
        let baked = bake_constraint_to_action(
            &mut scene,
            &mut solver,
            obj,
            Some(base_id),
            BakeDomain::Object,
            false,
        )
        .unwrap();
        assert_eq!(scene.action(baked).unwrap().name, "walk");
        // One key per frame of the half-open action range [1, 11).
        let loc = scene.action(baked).unwrap().find_curve("location").unwrap();
        assert_eq!(loc.points.len(), 10);
    }

    #[test]
    fn solver_failure_is_fatal() {
        let mut scene = SourceScene::new(24.0);
        let obj = scene.add_object(SourceObject::new("Cube"));
        let err = bake_constraint_to_action(
            &mut scene,
            &mut FailingSolver,
            obj,
            None,
            BakeDomain::Pose,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::Bake { .. }));
    }
}
