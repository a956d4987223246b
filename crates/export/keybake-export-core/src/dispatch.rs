//! Action dispatch: enumerate an object's stored actions and route each to
//! the right per-domain exporter.
//!
//! Per object the order is fixed: the active action first (or a bake-only
//! synthetic pass when constraints exist without animation data),
//! establishing the scope's default resource, then every action referenced by
//! timeline strips, each into its own named resource, deduplicated by
//! identity. The object's active-action slot is saved before anything runs
//! and restored on every exit path, success or error.

use glam::Mat4;
use hashbrown::{HashMap, HashSet};
use keybake_scene_core::{
    fix_bone_attachment_transform, fix_directional_transform, NodeId, NodePath, Property,
    SceneDocument, Value,
};
use serde::{Deserialize, Serialize};

use crate::baking::{
    bake_constraint_to_action, has_object_constraint, has_pose_constraint, BakeDomain,
    ConstraintSolver, BAKING_SUFFIX,
};
use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::frames::{reconstruct_transform_frames, FrameWindow};
use crate::mappings::default_attribute_tables;
use crate::player::{resolve_player, PlayerScope};
use crate::source::{
    bone_name_from_path, shapekey_name_from_path, split_data_path, Action, ActionId,
    CameraSettings, ObjectId, SourceObject, SourceScene,
};
use crate::tracks::{AttributeConvertInfo, Track, TrackInterpolation, TrackKind, ValueMap};

/// Export subject of one dispatch call; closed set, one exporter each.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ActionDomain {
    Transform,
    ShapeKey,
    Light,
    Camera,
}

/// Export context: the document under construction, resolved player scopes,
/// and the per-node-class attribute mapping tables.
pub struct AnimationExporter<'doc> {
    doc: &'doc mut SceneDocument,
    config: ExportConfig,
    scopes: Vec<PlayerScope>,
    attribute_tables: HashMap<String, Vec<AttributeConvertInfo>>,
}

impl<'doc> AnimationExporter<'doc> {
    pub fn new(doc: &'doc mut SceneDocument, config: ExportConfig) -> Self {
        Self {
            doc,
            config,
            scopes: Vec::new(),
            attribute_tables: default_attribute_tables(),
        }
    }

    /// Replace or add the mapping table for one node class.
    pub fn register_attribute_table(&mut self, class: &str, table: Vec<AttributeConvertInfo>) {
        self.attribute_tables.insert(class.to_string(), table);
    }

    pub fn scopes(&self) -> &[PlayerScope] {
        &self.scopes
    }

    /// Export all animation of one object for one domain.
    pub fn export_animation_data(
        &mut self,
        scene: &mut SourceScene,
        solver: &mut dyn ConstraintSolver,
        node: NodeId,
        object_id: ObjectId,
        domain: ActionDomain,
    ) -> Result<(), ExportError> {
        if !self.config.export_animation {
            return Ok(());
        }

        let (has_obj_cst, has_pose_cst, has_slot, prior_active) = {
            let object = scene.object(object_id);
            (
                has_object_constraint(object),
                has_pose_constraint(object),
                object.animation.is_some(),
                object.animation.as_ref().and_then(|a| a.active_action),
            )
        };
        let need_bake = domain == ActionDomain::Transform && (has_obj_cst || has_pose_cst);
        if !has_slot && !need_bake {
            return Ok(());
        }

        let scope = resolve_player(self.doc, &mut self.scopes, self.config.scope, node);

        let result = self.export_all_actions(
            scene,
            solver,
            node,
            object_id,
            domain,
            scope,
            need_bake,
            has_obj_cst,
            has_pose_cst,
            has_slot,
            prior_active,
        );

        // Restore the active-action selection on every exit path; baking
        // temporarily re-points it.
        if let Some(slot) = scene.object_mut(object_id).animation.as_mut() {
            slot.active_action = prior_active;
        }

        result
    }

    /// Register every owned resource into the document and assign the
    /// player `anims/<name>` properties. Call once, after all objects.
    pub fn finish(self) {
        for scope in self.scopes {
            for animation in &scope.animations {
                let id = self.doc.force_add_internal_resource(animation.serialize());
                self.doc.node_mut(scope.node).set_property(
                    &format!("anims/{}", animation.name),
                    Property::Raw(id.reference()),
                );
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn export_all_actions(
        &mut self,
        scene: &mut SourceScene,
        solver: &mut dyn ConstraintSolver,
        node: NodeId,
        object_id: ObjectId,
        domain: ActionDomain,
        scope: usize,
        need_bake: bool,
        has_obj_cst: bool,
        has_pose_cst: bool,
        has_slot: bool,
        active: Option<ActionId>,
    ) -> Result<(), ExportError> {
        // Same action reused across strips must not duplicate resources.
        let mut exported: HashSet<ActionId> = HashSet::new();

        if active.is_some() || (!has_slot && need_bake) {
            self.export_active_action(
                scene,
                solver,
                node,
                object_id,
                domain,
                scope,
                need_bake,
                has_obj_cst,
                has_pose_cst,
                active,
                &mut exported,
            )?;
        }

        let strip_actions: Vec<ActionId> = scene
            .object(object_id)
            .animation
            .as_ref()
            .map(|slot| {
                slot.nla_tracks
                    .iter()
                    .flat_map(|t| t.strips.iter())
                    .filter_map(|s| s.action)
                    .collect()
            })
            .unwrap_or_default();

        for strip_action in strip_actions {
            if exported.contains(&strip_action) {
                continue;
            }
            self.export_strip_action(
                scene,
                solver,
                node,
                object_id,
                domain,
                scope,
                need_bake,
                has_obj_cst,
                has_pose_cst,
                strip_action,
                &mut exported,
            )?;
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn export_active_action(
        &mut self,
        scene: &mut SourceScene,
        solver: &mut dyn ConstraintSolver,
        node: NodeId,
        object_id: ObjectId,
        domain: ActionDomain,
        scope: usize,
        need_bake: bool,
        has_obj_cst: bool,
        has_pose_cst: bool,
        active: Option<ActionId>,
        exported: &mut HashSet<ActionId>,
    ) -> Result<(), ExportError> {
        let action_to_export = if need_bake {
            if let Some(base) = active {
                let action = scene.action_mut(base).ok_or(ExportError::MissingAction(base))?;
                action.name.push_str(BAKING_SUFFIX);
                exported.insert(base);
            }
            match bake_for_constraints(scene, solver, object_id, active, has_obj_cst, has_pose_cst)
            {
                Ok(baked) => baked,
                Err(err) => {
                    if let Some(base) = active {
                        revert_baking_rename(scene, base);
                    }
                    return Err(err);
                }
            }
        } else {
            match active {
                Some(a) => {
                    exported.insert(a);
                    a
                }
                None => return Ok(()),
            }
        };

        let frame_rate = scene.frame_rate;
        if self.scopes[scope].default_animation.is_none() {
            let name = scene
                .action(action_to_export)
                .ok_or(ExportError::MissingAction(action_to_export))?
                .name
                .clone();
            self.scopes[scope].add_default_animation_resource(&name, frame_rate);
        }
        let slot = self.scopes[scope]
            .default_animation
            .expect("default resource just established");
        self.export_action_into(scene, node, object_id, domain, scope, slot, action_to_export)?;

        if need_bake {
            // Baked curve sets exist only for this export.
            scene.remove_action(action_to_export);
            if let Some(base) = active {
                revert_baking_rename(scene, base);
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn export_strip_action(
        &mut self,
        scene: &mut SourceScene,
        solver: &mut dyn ConstraintSolver,
        node: NodeId,
        object_id: ObjectId,
        domain: ActionDomain,
        scope: usize,
        need_bake: bool,
        has_obj_cst: bool,
        has_pose_cst: bool,
        strip_action: ActionId,
        exported: &mut HashSet<ActionId>,
    ) -> Result<(), ExportError> {
        exported.insert(strip_action);

        let action_to_export = if need_bake {
            let action = scene
                .action_mut(strip_action)
                .ok_or(ExportError::MissingAction(strip_action))?;
            action.name.push_str(BAKING_SUFFIX);
            // The bake evaluates with the strip's action active.
            if let Some(slot) = scene.object_mut(object_id).animation.as_mut() {
                slot.active_action = Some(strip_action);
            }
            match bake_for_constraints(
                scene,
                solver,
                object_id,
                Some(strip_action),
                has_obj_cst,
                has_pose_cst,
            ) {
                Ok(baked) => baked,
                Err(err) => {
                    revert_baking_rename(scene, strip_action);
                    return Err(err);
                }
            }
        } else {
            strip_action
        };

        let frame_rate = scene.frame_rate;
        let name = scene
            .action(action_to_export)
            .ok_or(ExportError::MissingAction(action_to_export))?
            .name
            .clone();
        let slot = self.scopes[scope].create_animation_resource(&name, frame_rate);
        self.export_action_into(scene, node, object_id, domain, scope, slot, action_to_export)?;

        if need_bake {
            scene.remove_action(action_to_export);
            revert_baking_rename(scene, strip_action);
        }
        Ok(())
    }

    /// Closed per-domain dispatch.
    fn export_action_into(
        &mut self,
        scene: &SourceScene,
        node: NodeId,
        object_id: ObjectId,
        domain: ActionDomain,
        scope: usize,
        slot: usize,
        action_id: ActionId,
    ) -> Result<(), ExportError> {
        let action = scene
            .action(action_id)
            .ok_or(ExportError::MissingAction(action_id))?;
        let object = scene.object(object_id);
        let player_node = self.scopes[scope].node;
        let doc: &SceneDocument = self.doc;
        let table = self
            .attribute_tables
            .get(doc.node(node).class.as_str())
            .map(|t| t.as_slice());
        let resource = &mut self.scopes[scope].animations[slot];

        match domain {
            ActionDomain::Transform => {
                export_transform_action(doc, player_node, node, object, action, resource)
            }
            ActionDomain::ShapeKey => {
                export_shapekey_action(doc, player_node, node, action, resource)
            }
            ActionDomain::Light => {
                export_light_action(doc, player_node, node, action, resource, table)
            }
            ActionDomain::Camera => {
                export_camera_action(doc, player_node, node, object, action, resource, table)
            }
        }
        Ok(())
    }
}

/// Bake whichever constraint domains are present. With both, object
/// constraints bake first into an intermediate and pose constraints bake on
/// top of it in place, yielding one curve set reflecting both.
fn bake_for_constraints(
    scene: &mut SourceScene,
    solver: &mut dyn ConstraintSolver,
    object_id: ObjectId,
    base: Option<ActionId>,
    has_obj_cst: bool,
    has_pose_cst: bool,
) -> Result<ActionId, ExportError> {
    if has_obj_cst && has_pose_cst {
        let intermediate =
            bake_constraint_to_action(scene, solver, object_id, base, BakeDomain::Object, false)?;
        bake_constraint_to_action(
            scene,
            solver,
            object_id,
            Some(intermediate),
            BakeDomain::Pose,
            true,
        )
    } else if has_pose_cst {
        bake_constraint_to_action(scene, solver, object_id, base, BakeDomain::Pose, false)
    } else {
        bake_constraint_to_action(scene, solver, object_id, base, BakeDomain::Object, false)
    }
}

fn revert_baking_rename(scene: &mut SourceScene, id: ActionId) {
    if let Some(action) = scene.action_mut(id) {
        if let Some(stripped) = action.name.strip_suffix(BAKING_SUFFIX) {
            action.name = stripped.to_string();
        }
    }
}

fn base_paths(doc: &SceneDocument, player_node: NodeId, node: NodeId) -> (String, String) {
    let player_parent = doc
        .node(player_node)
        .parent
        .expect("player scope always has a parent");
    (doc.node_path(player_parent), doc.node_path(node))
}

fn export_transform_action(
    doc: &SceneDocument,
    player_node: NodeId,
    node: NodeId,
    object: &SourceObject,
    action: &Action,
    resource: &mut crate::resource::AnimationResource,
) {
    let window = FrameWindow::from_action(action);
    let target = doc.node(node);
    let groups = reconstruct_transform_frames(action, object, target, window);
    let (base, target_abs) = base_paths(doc, player_node, node);

    for (object_path, frame_values) in groups {
        let (track_path, matrices): (NodePath, Vec<Mat4>) = if object_path.is_empty() {
            // The object itself: re-base into parent space.
            let mut mats: Vec<Mat4> = frame_values
                .iter()
                .map(|f| object.matrix_parent_inverse * f.to_matrix())
                .collect();

            let attached_to_bone = target
                .parent
                .map(|p| doc.node(p).class == "BoneAttachment")
                .unwrap_or(false);
            if attached_to_bone {
                if let Some(bone_length) = object.attachment_bone_length {
                    for m in &mut mats {
                        *m = fix_bone_attachment_transform(bone_length, *m);
                    }
                }
            }

            if matches!(
                target.class.as_str(),
                "Camera" | "SpotLight" | "DirectionalLight"
            ) {
                for m in &mut mats {
                    *m = fix_directional_transform(*m);
                }
            }

            (NodePath::new(&base, &target_abs), mats)
        } else if object_path.starts_with("pose") {
            let source_bone = match bone_name_from_path(&object_path) {
                Some(n) => n,
                None => continue,
            };
            let exported_bone = match target.find_bone_name(source_bone) {
                Some(n) => n,
                None => continue,
            };
            (
                NodePath::new(&base, &target_abs).with_subname(exported_bone),
                frame_values.iter().map(|f| f.to_matrix()).collect(),
            )
        } else {
            continue;
        };

        resource.add_track(Track::with_keys(
            TrackKind::Transform,
            track_path,
            window.iter(),
            matrices.into_iter().map(Value::Transform),
        ));
    }
}

fn export_shapekey_action(
    doc: &SceneDocument,
    player_node: NodeId,
    node: NodeId,
    action: &Action,
    resource: &mut crate::resource::AnimationResource,
) {
    let window = FrameWindow::from_action(action);
    let (base, target_abs) = base_paths(doc, player_node, node);

    for fcurve in &action.fcurves {
        let (object_path, attribute) = split_data_path(&fcurve.data_path);
        if attribute != "value" {
            continue;
        }
        let shapekey = match shapekey_name_from_path(object_path) {
            Some(n) => n,
            None => continue,
        };

        let path = NodePath::new(&base, &target_abs)
            .with_subname(&format!("blend_shapes/{}", shapekey));
        let mut track = Track::new(TrackKind::Value, path);
        for frame in window.iter() {
            track.add_frame_data(frame, Value::Float(fcurve.evaluate(frame as f32)));
        }
        resource.add_track(track);
    }
}

fn export_light_action(
    doc: &SceneDocument,
    player_node: NodeId,
    node: NodeId,
    action: &Action,
    resource: &mut crate::resource::AnimationResource,
    table: Option<&[AttributeConvertInfo]>,
) {
    let window = FrameWindow::from_action(action);
    let (base, target_abs) = base_paths(doc, player_node, node);
    let base_path = NodePath::new(&base, &target_abs);

    resource.add_simple_value_track(
        action,
        "use_negative",
        base_path.with_subname("light_negative"),
        Some(ValueMap::GreaterThan(0.0)),
        TrackInterpolation::Nearest,
    );

    if let Some(table) = table {
        resource.add_tracks_via_attr_mapping(action, table, &base_path);
    }

    // Color channels are not one-to-one with curves; accumulate components
    // per frame like transform channels.
    let mut color_groups: Vec<(String, Vec<[f32; 3]>)> = Vec::new();
    for fcurve in &action.fcurves {
        let (_, attribute) = split_data_path(&fcurve.data_path);
        if attribute != "color" && attribute != "shadow_color" {
            continue;
        }
        if !color_groups.iter().any(|(a, _)| a == attribute) {
            color_groups.push((attribute.to_string(), vec![[0.0; 3]; window.len()]));
        }
        let colors = color_groups
            .iter_mut()
            .find_map(|(a, c)| if a == attribute { Some(c) } else { None })
            .unwrap();
        if fcurve.array_index >= 3 {
            continue;
        }
        for frame in window.iter() {
            colors[(frame - window.first) as usize][fcurve.array_index] =
                fcurve.evaluate(frame as f32);
        }
    }

    for (attribute, colors) in color_groups {
        let property = if attribute == "color" {
            "light_color"
        } else {
            "shadow_color"
        };
        resource.add_track(Track::with_keys(
            TrackKind::Value,
            base_path.with_subname(property),
            window.iter(),
            colors.into_iter().map(Value::Color),
        ));
    }
}

fn export_camera_action(
    doc: &SceneDocument,
    player_node: NodeId,
    node: NodeId,
    object: &SourceObject,
    action: &Action,
    resource: &mut crate::resource::AnimationResource,
    table: Option<&[AttributeConvertInfo]>,
) {
    let window = FrameWindow::from_action(action);
    let (base, target_abs) = base_paths(doc, player_node, node);
    let base_path = NodePath::new(&base, &target_abs);

    if let Some(table) = table {
        resource.add_tracks_via_attr_mapping(action, table, &base_path);
    }

    resource.add_simple_value_track(
        action,
        "type",
        base_path.with_subname("projection"),
        Some(ValueMap::BinaryStep),
        TrackInterpolation::Nearest,
    );

    // The source animates focal length and sensor width; the target wants
    // the field of view directly.
    let lens_curve = action.find_curve("lens");
    let sensor_curve = action.find_curve("sensor_width");
    if lens_curve.is_none() && sensor_curve.is_none() {
        return;
    }

    let rest = object.camera.unwrap_or(CameraSettings {
        focal_length: 50.0,
        sensor_width: 36.0,
    });
    let mut track = Track::new(TrackKind::Value, base_path.with_subname("fov"));
    for frame in window.iter() {
        let focal = lens_curve
            .map(|c| c.evaluate(frame as f32))
            .unwrap_or(rest.focal_length);
        let sensor = sensor_curve
            .map(|c| c.evaluate(frame as f32))
            .unwrap_or(rest.sensor_width);
        let fov = 2.0 * (sensor / 2.0 / focal).atan().to_degrees();
        track.add_frame_data(frame, Value::Float(fov));
    }
    resource.add_track(track);
}
