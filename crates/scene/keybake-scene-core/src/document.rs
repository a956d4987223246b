//! SceneDocument: the node tree and the append-only internal resource list
//! that exported animation data is registered into.

use serde::{Deserialize, Serialize};

use crate::writer::Property;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Reference to an internal resource. Ids are 1-based to match the
/// sub-resource numbering of the text format.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

impl ResourceId {
    /// Literal reference usable in a node property assignment.
    pub fn reference(&self) -> String {
        format!("SubResource( {} )", self.0)
    }
}

/// One bone retained in an exported skeleton. Bone names may be rewritten on
/// export, so track paths must go through the exported name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonBone {
    pub source_name: String,
    pub exported_name: String,
}

/// A typed node in the output scene tree.
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub class: String,
    pub parent: Option<NodeId>,
    properties: Vec<(String, Property)>,
    /// Non-empty only for skeleton-class nodes.
    pub bones: Vec<SkeletonBone>,
}

impl SceneNode {
    pub fn new(name: &str, class: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            class: class.to_string(),
            parent,
            properties: Vec::new(),
            bones: Vec::new(),
        }
    }

    /// Assign a property. Assigning the same key twice is a programmer error.
    pub fn set_property(&mut self, key: &str, value: Property) {
        assert!(
            !self.properties.iter().any(|(k, _)| k == key),
            "duplicate property '{}' on node '{}'",
            key,
            self.name
        );
        self.properties.push((key.to_string(), value));
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find_map(|(k, v)| if k == key { Some(v) } else { None })
    }

    pub fn properties(&self) -> impl Iterator<Item = &(String, Property)> {
        self.properties.iter()
    }

    /// Index of a retained bone by its source name; `None` when the bone was
    /// dropped from the exported skeleton.
    pub fn find_bone_id(&self, source_name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.source_name == source_name)
    }

    /// Exported name of a retained bone, looked up by source name.
    pub fn find_bone_name(&self, source_name: &str) -> Option<&str> {
        self.bones
            .iter()
            .find(|b| b.source_name == source_name)
            .map(|b| b.exported_name.as_str())
    }
}

/// A named, typed resource embedded in the document.
#[derive(Clone, Debug)]
pub struct InternalResource {
    pub rtype: String,
    pub name: String,
    properties: Vec<(String, Property)>,
}

impl InternalResource {
    pub fn new(rtype: &str, name: &str) -> Self {
        Self {
            rtype: rtype.to_string(),
            name: name.to_string(),
            properties: Vec::new(),
        }
    }

    /// Append a property. Key collisions are a programmer error and panic
    /// rather than silently overwriting.
    pub fn insert(&mut self, key: &str, value: Property) {
        assert!(
            !self.properties.iter().any(|(k, _)| k == key),
            "duplicate key '{}' in resource '{}'",
            key,
            self.name
        );
        self.properties.push((key.to_string(), value));
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find_map(|(k, v)| if k == key { Some(v) } else { None })
    }

    pub fn properties(&self) -> impl Iterator<Item = &(String, Property)> {
        self.properties.iter()
    }
}

/// The output document under construction.
#[derive(Default, Debug)]
pub struct SceneDocument {
    nodes: Vec<SceneNode>,
    resources: Vec<InternalResource>,
}

impl SceneDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Direct children of `id`, in insertion order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent == Some(id))
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    /// Absolute slash-separated path of a node, root included.
    pub fn node_path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut cursor = Some(id);
        while let Some(nid) = cursor {
            let node = self.node(nid);
            segments.push(node.name.clone());
            cursor = node.parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// Register an internal resource, always appending. Resources are never
    /// deduplicated by content: identical inputs can legitimately serialize
    /// to different parent-space data.
    pub fn force_add_internal_resource(&mut self, resource: InternalResource) -> ResourceId {
        self.resources.push(resource);
        ResourceId(self.resources.len() as u32)
    }

    pub fn resource(&self, id: ResourceId) -> &InternalResource {
        &self.resources[(id.0 - 1) as usize]
    }

    pub fn resource_mut(&mut self, id: ResourceId) -> &mut InternalResource {
        &mut self.resources[(id.0 - 1) as usize]
    }

    pub fn resources(&self) -> impl Iterator<Item = &InternalResource> {
        self.resources.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_paths_join_from_root() {
        let mut doc = SceneDocument::new();
        let root = doc.add_node(SceneNode::new("Root", "Spatial", None));
        let arm = doc.add_node(SceneNode::new("Arm", "Skeleton", Some(root)));
        let cube = doc.add_node(SceneNode::new("Cube", "MeshInstance", Some(arm)));
        assert_eq!(doc.node_path(cube), "Root/Arm/Cube");
        assert_eq!(doc.children(root), vec![arm]);
    }

    #[test]
    fn resource_ids_are_one_based_and_never_deduped() {
        let mut doc = SceneDocument::new();
        let a = doc.force_add_internal_resource(InternalResource::new("Animation", "walk"));
        let b = doc.force_add_internal_resource(InternalResource::new("Animation", "walk"));
        assert_eq!(a, ResourceId(1));
        assert_eq!(b, ResourceId(2));
        assert_eq!(a.reference(), "SubResource( 1 )");
    }

    #[test]
    #[should_panic(expected = "duplicate key")]
    fn duplicate_resource_key_panics() {
        let mut res = InternalResource::new("Animation", "walk");
        res.insert("length", Property::Float(1.0));
        res.insert("length", Property::Float(2.0));
    }

    #[test]
    fn skeleton_bone_lookup_uses_source_names() {
        let mut node = SceneNode::new("Skel", "Skeleton", None);
        node.bones.push(SkeletonBone {
            source_name: "forearm.L".into(),
            exported_name: "forearm_L".into(),
        });
        assert_eq!(node.find_bone_id("forearm.L"), Some(0));
        assert_eq!(node.find_bone_name("forearm.L"), Some("forearm_L"));
        assert_eq!(node.find_bone_id("missing"), None);
    }
}
