//! Shared builders for exporter tests: source scenes, curve bundles, scene
//! documents and canned constraint solvers.

use glam::{Mat4, Vec3};
use keybake_export_core::{
    Action, ActionId, AnimationSlot, BakeDomain, ConstraintSolver, CurveInterpolation, FCurve,
    KeyPoint, NlaStrip, NlaTrack, ObjectId, PoseSample, SourceObject, SourceScene,
};
use keybake_scene_core::{NodeId, SceneDocument, SceneNode};

pub fn curve(
    data_path: &str,
    array_index: usize,
    interpolation: CurveInterpolation,
    points: &[(f32, f32)],
) -> FCurve {
    let mut c = FCurve::new(data_path, array_index);
    c.interpolation = interpolation;
    c.points = points
        .iter()
        .map(|(frame, value)| KeyPoint {
            frame: *frame,
            value: *value,
        })
        .collect();
    c
}

pub fn linear_curve(data_path: &str, array_index: usize, points: &[(f32, f32)]) -> FCurve {
    curve(data_path, array_index, CurveInterpolation::Linear, points)
}

pub fn constant_curve(data_path: &str, array_index: usize, points: &[(f32, f32)]) -> FCurve {
    curve(data_path, array_index, CurveInterpolation::Constant, points)
}

pub fn action(name: &str, fcurves: Vec<FCurve>) -> Action {
    let mut a = Action::new(name);
    a.fcurves = fcurves;
    a
}

/// A 24 fps scene holding one default-constructed object.
pub fn scene_with_object(name: &str) -> (SourceScene, ObjectId) {
    let mut scene = SourceScene::new(24.0);
    let object = scene.add_object(SourceObject::new(name));
    (scene, object)
}

/// Store `action` and make it the object's active action.
pub fn activate(scene: &mut SourceScene, object: ObjectId, action: Action) -> ActionId {
    let id = scene.add_action(action);
    scene
        .object_mut(object)
        .animation
        .get_or_insert_with(AnimationSlot::default)
        .active_action = Some(id);
    id
}

/// Store `action` and reference it from a new timeline strip.
pub fn add_strip(scene: &mut SourceScene, object: ObjectId, action: Action) -> ActionId {
    let id = scene.add_action(action);
    let slot = scene
        .object_mut(object)
        .animation
        .get_or_insert_with(AnimationSlot::default);
    slot.nla_tracks.push(NlaTrack {
        strips: vec![NlaStrip { action: Some(id) }],
    });
    id
}

/// A two-node document: a `Spatial` root plus one child of the given name
/// and class. Returns the document and the child.
pub fn document_with_entity(name: &str, class: &str) -> (SceneDocument, NodeId) {
    let mut doc = SceneDocument::new();
    let root = doc.add_node(SceneNode::new("Root", "Spatial", None));
    let entity = doc.add_node(SceneNode::new(name, class, Some(root)));
    (doc, entity)
}

/// Solver answering every sample with a per-frame x translation on both the
/// object and each of its bones. Deterministic, domain-independent.
pub struct SlidingSolver;

impl ConstraintSolver for SlidingSolver {
    fn sample(
        &mut self,
        scene: &SourceScene,
        object: ObjectId,
        _action: Option<ActionId>,
        frame: i32,
        _domain: BakeDomain,
    ) -> Result<PoseSample, String> {
        let transform = Mat4::from_translation(Vec3::new(frame as f32, 0.0, 0.0));
        let bone_transforms = scene
            .object(object)
            .bones
            .iter()
            .map(|b| (b.name.clone(), transform))
            .collect();
        Ok(PoseSample {
            object_transform: transform,
            bone_transforms,
        })
    }
}

/// Solver that fails every sample, for fatal-error paths.
pub struct FailingSolver;

impl ConstraintSolver for FailingSolver {
    fn sample(
        &mut self,
        _scene: &SourceScene,
        _object: ObjectId,
        _action: Option<ActionId>,
        _frame: i32,
        _domain: BakeDomain,
    ) -> Result<PoseSample, String> {
        Err("evaluation context unavailable".to_string())
    }
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}
