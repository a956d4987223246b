//! Bake lifecycle through the dispatcher: temporary renames, baked-action
//! cleanup, active-action restoration and strip deduplication.

use keybake_export_core::{
    ActionDomain, AnimationExporter, ExportConfig, ExportError, FrameWindow, ScopePolicy,
    BAKING_SUFFIX,
};
use keybake_scene_core::{SkeletonBone, Value};
use keybake_test_fixtures::{
    action, activate, add_strip, approx, document_with_entity, linear_curve, scene_with_object,
    FailingSolver, SlidingSolver,
};

fn config() -> ExportConfig {
    ExportConfig {
        export_animation: true,
        scope: ScopePolicy::SceneGlobal,
    }
}

#[test]
fn strips_get_named_resources_deduplicated_by_action() {
    let (mut doc, cube) = document_with_entity("Cube", "MeshInstance");
    let (mut scene, object) = scene_with_object("Cube");
    activate(
        &mut scene,
        object,
        action("idle", vec![linear_curve("location", 0, &[(1.0, 0.0), (5.0, 1.0)])]),
    );
    let walk = add_strip(
        &mut scene,
        object,
        action("walk", vec![linear_curve("location", 0, &[(1.0, 0.0), (9.0, 8.0)])]),
    );
    // Second strip re-placing the same action.
    scene
        .object_mut(object)
        .animation
        .as_mut()
        .unwrap()
        .nla_tracks[0]
        .strips
        .push(keybake_export_core::NlaStrip { action: Some(walk) });

    let mut exporter = AnimationExporter::new(&mut doc, config());
    exporter
        .export_animation_data(
            &mut scene,
            &mut SlidingSolver,
            cube,
            object,
            ActionDomain::Transform,
        )
        .unwrap();

    let animations = &exporter.scopes()[0].animations;
    // Default resource for the active action plus one for "walk", not two.
    assert_eq!(animations.len(), 2);
    assert_eq!(animations[0].name, "idle");
    assert_eq!(animations[1].name, "walk");
}

#[test]
fn strip_sharing_the_active_action_exports_once() {
    let (mut doc, cube) = document_with_entity("Cube", "MeshInstance");
    let (mut scene, object) = scene_with_object("Cube");
    let idle = activate(
        &mut scene,
        object,
        action("idle", vec![linear_curve("location", 0, &[(1.0, 0.0), (5.0, 1.0)])]),
    );
    scene
        .object_mut(object)
        .animation
        .as_mut()
        .unwrap()
        .nla_tracks
        .push(keybake_export_core::NlaTrack {
            strips: vec![keybake_export_core::NlaStrip { action: Some(idle) }],
        });

    let mut exporter = AnimationExporter::new(&mut doc, config());
    exporter
        .export_animation_data(
            &mut scene,
            &mut SlidingSolver,
            cube,
            object,
            ActionDomain::Transform,
        )
        .unwrap();

    assert_eq!(exporter.scopes()[0].animations.len(), 1);
}

#[test]
fn constrained_object_without_animation_gets_a_baked_resource() {
    let (mut doc, cube) = document_with_entity("Cube", "MeshInstance");
    let (mut scene, object) = scene_with_object("Cube");
    scene.object_mut(object).constrained = true;

    let mut exporter = AnimationExporter::new(&mut doc, config());
    exporter
        .export_animation_data(
            &mut scene,
            &mut SlidingSolver,
            cube,
            object,
            ActionDomain::Transform,
        )
        .unwrap();

    let resource = &exporter.scopes()[0].animations[0];
    assert_eq!(resource.name, "CubeAction");
    let track = &resource.tracks()[0];
    // Fallback window when nothing declares an extent.
    assert_eq!(track.frames.len(), FrameWindow::DEFAULT.len());
    match track.values[0] {
        Value::Transform(m) => assert!(approx(m.w_axis.x, 1.0)),
        ref other => panic!("expected transform value, got {other:?}"),
    }
    // The baked action is consumed, not left in the store.
    assert_eq!(scene.actions().count(), 0);
}

#[test]
fn bake_restores_names_and_removes_temporary_actions() {
    let (mut doc, cube) = document_with_entity("Cube", "MeshInstance");
    let (mut scene, object) = scene_with_object("Cube");
    scene.object_mut(object).constrained = true;
    let walk = activate(
        &mut scene,
        object,
        action("walk", vec![linear_curve("location", 0, &[(1.0, 0.0), (5.0, 4.0)])]),
    );

    let mut exporter = AnimationExporter::new(&mut doc, config());
    exporter
        .export_animation_data(
            &mut scene,
            &mut SlidingSolver,
            cube,
            object,
            ActionDomain::Transform,
        )
        .unwrap();

    // Rename reverted, baked copy removed, active selection restored.
    assert_eq!(scene.action(walk).unwrap().name, "walk");
    assert_eq!(scene.actions().count(), 1);
    assert_eq!(
        scene.object(object).animation.as_ref().unwrap().active_action,
        Some(walk)
    );

    let resource = &exporter.scopes()[0].animations[0];
    assert_eq!(resource.name, "walk");
    let track = &resource.tracks()[0];
    // Constrained export reflects the solver's pose, not the raw curves.
    match track.values[2] {
        Value::Transform(m) => assert!(approx(m.w_axis.x, 3.0)),
        ref other => panic!("expected transform value, got {other:?}"),
    }
}

#[test]
fn solver_failure_is_fatal_and_reverts_the_rename() {
    let (mut doc, cube) = document_with_entity("Cube", "MeshInstance");
    let (mut scene, object) = scene_with_object("Cube");
    scene.object_mut(object).constrained = true;
    let walk = activate(
        &mut scene,
        object,
        action("walk", vec![linear_curve("location", 0, &[(1.0, 0.0), (5.0, 4.0)])]),
    );

    let mut exporter = AnimationExporter::new(&mut doc, config());
    let err = exporter
        .export_animation_data(
            &mut scene,
            &mut FailingSolver,
            cube,
            object,
            ActionDomain::Transform,
        )
        .unwrap_err();
    assert!(matches!(err, ExportError::Bake { .. }));

    let name = &scene.action(walk).unwrap().name;
    assert!(!name.ends_with(BAKING_SUFFIX), "name = {name}");
    assert_eq!(
        scene.object(object).animation.as_ref().unwrap().active_action,
        Some(walk)
    );
}

#[test]
fn combined_constraints_bake_object_and_bone_tracks_into_one_resource() {
    let (mut doc, skel) = document_with_entity("Skel", "Skeleton");
    doc.node_mut(skel).bones.push(SkeletonBone {
        source_name: "arm".to_string(),
        exported_name: "arm".to_string(),
    });

    let (mut scene, object) = scene_with_object("Skel");
    scene.object_mut(object).constrained = true;
    let mut bone = keybake_export_core::PoseBone::new("arm");
    bone.constrained = true;
    scene.object_mut(object).bones.push(bone);
    let walk = activate(
        &mut scene,
        object,
        action("walk", vec![linear_curve("location", 0, &[(1.0, 0.0), (4.0, 3.0)])]),
    );

    let mut exporter = AnimationExporter::new(&mut doc, config());
    exporter
        .export_animation_data(
            &mut scene,
            &mut SlidingSolver,
            skel,
            object,
            ActionDomain::Transform,
        )
        .unwrap();

    // One resource carrying both the object-level and the bone-level track:
    // the object pass bakes into an intermediate, the pose pass appends its
    // bone channels in place on top.
    let animations = &exporter.scopes()[0].animations;
    assert_eq!(animations.len(), 1);
    let resource = &animations[0];
    assert_eq!(resource.name, "walk");

    let object_track = resource
        .tracks()
        .iter()
        .find(|t| t.path.relative() == "Skel")
        .unwrap();
    let bone_track = resource
        .tracks()
        .iter()
        .find(|t| t.path.relative() == "Skel:arm")
        .unwrap();
    assert_eq!(object_track.frames, bone_track.frames);
    match (object_track.values[1], bone_track.values[1]) {
        (Value::Transform(o), Value::Transform(b)) => {
            assert!(approx(o.w_axis.x, 2.0));
            assert!(approx(b.w_axis.x, 2.0));
        }
        other => panic!("expected transform values, got {other:?}"),
    }

    // The intermediate is consumed: only the original action survives, with
    // its name reverted.
    assert_eq!(scene.actions().count(), 1);
    assert_eq!(scene.action(walk).unwrap().name, "walk");
}

#[test]
fn pose_constraints_bake_bone_tracks() {
    let (mut doc, skel) = document_with_entity("Skel", "Skeleton");
    doc.node_mut(skel).bones.push(SkeletonBone {
        source_name: "arm".to_string(),
        exported_name: "arm".to_string(),
    });

    let (mut scene, object) = scene_with_object("Skel");
    let mut bone = keybake_export_core::PoseBone::new("arm");
    bone.constrained = true;
    scene.object_mut(object).bones.push(bone);
    activate(
        &mut scene,
        object,
        action(
            "wave",
            vec![linear_curve(
                "pose.bones[\"arm\"].location",
                0,
                &[(1.0, 0.0), (4.0, 3.0)],
            )],
        ),
    );

    let mut exporter = AnimationExporter::new(&mut doc, config());
    exporter
        .export_animation_data(
            &mut scene,
            &mut SlidingSolver,
            skel,
            object,
            ActionDomain::Transform,
        )
        .unwrap();

    let resource = &exporter.scopes()[0].animations[0];
    let track = resource
        .tracks()
        .iter()
        .find(|t| t.path.relative() == "Skel:arm")
        .unwrap();
    assert_eq!(track.frames, vec![1, 2, 3, 4]);
    match track.values[1] {
        Value::Transform(m) => assert!(approx(m.w_axis.x, 2.0)),
        ref other => panic!("expected transform value, got {other:?}"),
    }
}
