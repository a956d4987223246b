//! Player/scope resolution: which animation-player node owns an entity's
//! exported animation, per export-mode policy.

use keybake_scene_core::{NodeId, NodePath, Property, SceneDocument, SceneNode};
use serde::{Deserialize, Serialize};

use crate::resource::AnimationResource;

const PLAYER_CLASS: &str = "AnimationPlayer";

/// Export-mode policy selecting the owning scope.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ScopePolicy {
    /// A scope directly under each animated entity.
    PerObject,
    /// One shared scope at the hierarchy root.
    SceneGlobal,
    /// The nearest ancestor scope, creating one at the entity when none is
    /// found on the way up.
    HierarchyNearest,
}

/// One animation-player scope: the player node plus the resources it owns.
/// The default resource is the unlabeled current action; alternates are
/// named per action.
#[derive(Debug)]
pub struct PlayerScope {
    pub node: NodeId,
    pub default_animation: Option<usize>,
    pub animations: Vec<AnimationResource>,
}

impl PlayerScope {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            default_animation: None,
            animations: Vec::new(),
        }
    }

    /// Create a new resource owned by this scope and return its slot.
    pub fn create_animation_resource(&mut self, name: &str, frame_rate: f32) -> usize {
        self.animations.push(AnimationResource::new(name, frame_rate));
        self.animations.len() - 1
    }

    /// First-use creation of the default resource; it may later receive
    /// tracks from other objects sharing this scope.
    pub fn add_default_animation_resource(&mut self, name: &str, frame_rate: f32) -> usize {
        let slot = self.create_animation_resource(name, frame_rate);
        self.default_animation = Some(slot);
        slot
    }
}

fn find_player_child(doc: &SceneDocument, parent: NodeId) -> Option<NodeId> {
    doc.children(parent)
        .into_iter()
        .find(|&c| doc.node(c).class == PLAYER_CLASS)
}

fn create_player(doc: &mut SceneDocument, base: NodeId) -> NodeId {
    let player = doc.add_node(SceneNode::new("AnimationPlayer", PLAYER_CLASS, Some(base)));
    // The player animates relative to its parent.
    let root_path = NodePath::new(&doc.node_path(player), &doc.node_path(base));
    doc.node_mut(player)
        .set_property("root_node", Property::Raw(root_path.to_string()));
    player
}

/// Resolve the scope owning `node`'s animation, creating at most one player
/// when none exists on the policy's search path. Returns an index into
/// `scopes`; a player node found in the document without a scope entry gets
/// one.
pub fn resolve_player(
    doc: &mut SceneDocument,
    scopes: &mut Vec<PlayerScope>,
    policy: ScopePolicy,
    node: NodeId,
) -> usize {
    let player = match policy {
        ScopePolicy::PerObject => find_player_child(doc, node),
        ScopePolicy::SceneGlobal => {
            let mut cursor = node;
            while let Some(parent) = doc.node(cursor).parent {
                cursor = parent;
            }
            find_player_child(doc, cursor).or_else(|| {
                // Base at the hierarchy root instead of the entity.
                Some(create_player(doc, cursor))
            })
        }
        ScopePolicy::HierarchyNearest => {
            let mut found = None;
            let mut cursor = Some(node);
            while let Some(level) = cursor {
                if let Some(p) = find_player_child(doc, level) {
                    found = Some(p);
                    break;
                }
                cursor = doc.node(level).parent;
            }
            found
        }
    };

    let player = player.unwrap_or_else(|| create_player(doc, node));

    match scopes.iter().position(|s| s.node == player) {
        Some(index) => index,
        None => {
            scopes.push(PlayerScope::new(player));
            scopes.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (SceneDocument, NodeId, NodeId, NodeId) {
        let mut doc = SceneDocument::new();
        let root = doc.add_node(SceneNode::new("Root", "Spatial", None));
        let mid = doc.add_node(SceneNode::new("Mid", "Spatial", Some(root)));
        let leaf = doc.add_node(SceneNode::new("Cube", "MeshInstance", Some(mid)));
        (doc, root, mid, leaf)
    }

    #[test]
    fn per_object_creates_then_reuses() {
        let (mut doc, _, _, leaf) = tree();
        let mut scopes = Vec::new();
        let a = resolve_player(&mut doc, &mut scopes, ScopePolicy::PerObject, leaf);
        let b = resolve_player(&mut doc, &mut scopes, ScopePolicy::PerObject, leaf);
        assert_eq!(a, b);
        assert_eq!(scopes.len(), 1);
        let player = scopes[0].node;
        assert_eq!(doc.node(player).parent, Some(leaf));
        assert_eq!(
            doc.node(player).property("root_node").unwrap().to_string(),
            "NodePath(\"..\")"
        );
    }

    #[test]
    fn scene_global_shares_one_player_at_root() {
        let (mut doc, root, mid, leaf) = tree();
        let mut scopes = Vec::new();
        let a = resolve_player(&mut doc, &mut scopes, ScopePolicy::SceneGlobal, leaf);
        let b = resolve_player(&mut doc, &mut scopes, ScopePolicy::SceneGlobal, mid);
        assert_eq!(a, b);
        assert_eq!(doc.node(scopes[a].node).parent, Some(root));
    }

    #[test]
    fn hierarchy_nearest_reuses_ancestor_player() {
        let (mut doc, _, mid, leaf) = tree();
        let mut scopes = Vec::new();
        // Seed a player on the ancestor.
        let seeded = resolve_player(&mut doc, &mut scopes, ScopePolicy::PerObject, mid);
        let resolved = resolve_player(&mut doc, &mut scopes, ScopePolicy::HierarchyNearest, leaf);
        assert_eq!(seeded, resolved);
        assert_eq!(scopes.len(), 1);
    }

    #[test]
    fn hierarchy_nearest_creates_at_entity_when_no_ancestor_has_one() {
        let (mut doc, _, _, leaf) = tree();
        let mut scopes = Vec::new();
        let resolved =
            resolve_player(&mut doc, &mut scopes, ScopePolicy::HierarchyNearest, leaf);
        assert_eq!(doc.node(scopes[resolved].node).parent, Some(leaf));
    }
}
