//! Row tree: node identities, arena storage, per-stage output shapes.
//!
//! The tree built by the group stage is immutable once built; the filter and
//! sort stages never touch it. Each stage produces a new output structure
//! (`ChildLists`, then the flattened display list) so cache invalidation is
//! a matter of replacing one output, not un-mutating a shared tree.
//!
//! Key invariants:
//! - A node's id is unique across the store for its lifetime.
//! - Leaf ids are assigned monotonically at row-store insertion, never reused.
//! - Group ids are derived from the group key path, so re-grouping an
//!   unchanged row set reproduces the same ids (expand/selection state
//!   survives non-structural rebuilds).

use std::hash::{Hash, Hasher};

use rowgrid_core::value::{NormalizedValue, RowValue};
use rustc_hash::{FxHashMap, FxHasher};

/// Stable node identity, independent of tree position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// High bit marks ids derived from group key paths; leaf ids come from a
/// monotonic counter and never reach it.
const GROUP_ID_BIT: u64 = 1 << 63;

impl NodeId {
    pub fn is_group_id(self) -> bool {
        self.0 & GROUP_ID_BIT != 0
    }
}

/// Derive a group node id from its parent's seed, the grouped field, and the
/// normalized key value. Deterministic for an unchanged key path.
pub(crate) fn derive_group_id(parent_seed: u64, field: &str, key: &NormalizedValue) -> (u64, NodeId) {
    let mut hasher = FxHasher::default();
    parent_seed.hash(&mut hasher);
    field.hash(&mut hasher);
    key.hash(&mut hasher);
    let seed = hasher.finish();
    (seed, NodeId(seed | GROUP_ID_BIT))
}

/// What a tree node represents.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A raw data row; `slot` indexes into the row store.
    Leaf { slot: usize },
    /// A synthetic group for one distinct key value of `field`.
    Group { field: String, key: RowValue },
}

/// One arena entry. `parent` and `children` are arena indices; `parent` is a
/// back-reference for ancestor lookups, not an ownership edge.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: NodeId,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub level: u32,
    pub kind: NodeKind,
}

impl TreeNode {
    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group { .. })
    }

    /// The group key, for group nodes.
    pub fn group_key(&self) -> Option<&RowValue> {
        match &self.kind {
            NodeKind::Group { key, .. } => Some(key),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// The row-store slot, for leaf nodes.
    pub fn row_slot(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Leaf { slot } => Some(slot),
            NodeKind::Group { .. } => None,
        }
    }
}

/// Arena-owned node tree produced by the group stage.
#[derive(Debug, Clone, Default)]
pub struct RowTree {
    nodes: Vec<TreeNode>,
    roots: Vec<usize>,
    index_of: FxHashMap<NodeId, usize>,
}

impl RowTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node, wiring it under `parent` (or as a root).
    /// Returns the new node's arena index.
    pub fn add_node(&mut self, parent: Option<usize>, id: NodeId, kind: NodeKind) -> usize {
        let level = match parent {
            Some(p) => self.nodes[p].level + 1,
            None => 0,
        };
        let index = self.nodes.len();
        self.nodes.push(TreeNode { id, parent, children: Vec::new(), level, kind });
        match parent {
            Some(p) => self.nodes[p].children.push(index),
            None => self.roots.push(index),
        }
        let previous = self.index_of.insert(id, index);
        debug_assert!(previous.is_none(), "duplicate node id in tree");
        index
    }

    pub fn node(&self, index: usize) -> &TreeNode {
        &self.nodes[index]
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Arena index for a node id, if the id is in this tree.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.index_of.get(&id).copied()
    }

    /// Unpruned sibling lists (the no-filter output shape).
    pub fn full_child_lists(&self) -> ChildLists {
        ChildLists {
            roots: self.roots.clone(),
            children: self.nodes.iter().map(|n| n.children.clone()).collect(),
        }
    }
}

/// Pruned/ordered sibling lists, parallel to the tree arena.
/// The output shape of the filter and sort stages.
#[derive(Debug, Clone, Default)]
pub struct ChildLists {
    pub roots: Vec<usize>,
    children: Vec<Vec<usize>>,
}

impl ChildLists {
    pub fn with_len(len: usize) -> Self {
        Self { roots: Vec::new(), children: vec![Vec::new(); len] }
    }

    pub fn children_of(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_children(&mut self, index: usize, children: Vec<usize>) {
        self.children[index] = children;
    }
}

/// Expand/collapse state, kept outside the tree so it survives rebuilds.
///
/// A group is expanded when an override says so, else per the default flag.
/// `set_all` clears overrides, matching expand-all/collapse-all semantics.
#[derive(Debug, Clone)]
pub struct ExpandState {
    default_expanded: bool,
    overrides: FxHashMap<NodeId, bool>,
}

impl ExpandState {
    pub fn new(default_expanded: bool) -> Self {
        Self { default_expanded, overrides: FxHashMap::default() }
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.overrides.get(&id).copied().unwrap_or(self.default_expanded)
    }

    pub fn set(&mut self, id: NodeId, expanded: bool) {
        if expanded == self.default_expanded {
            self.overrides.remove(&id);
        } else {
            self.overrides.insert(id, expanded);
        }
    }

    /// Flip one group; returns the new state.
    pub fn toggle(&mut self, id: NodeId) -> bool {
        let next = !self.is_expanded(id);
        self.set(id, next);
        next
    }

    /// Expand or collapse every group, recursively.
    pub fn set_all(&mut self, expanded: bool) {
        self.overrides.clear();
        self.default_expanded = expanded;
    }
}

impl Default for ExpandState {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_node_wires_parent_and_level() {
        let mut tree = RowTree::new();
        let g = tree.add_node(None, NodeId(GROUP_ID_BIT | 1), NodeKind::Group {
            field: "cat".into(),
            key: RowValue::Text("A".into()),
        });
        let leaf = tree.add_node(Some(g), NodeId(1), NodeKind::Leaf { slot: 0 });

        assert_eq!(tree.roots(), &[g]);
        assert_eq!(tree.node(g).children, vec![leaf]);
        assert_eq!(tree.node(leaf).parent, Some(g));
        assert_eq!(tree.node(leaf).level, 1);
        assert_eq!(tree.index_of(NodeId(1)), Some(leaf));
    }

    #[test]
    fn test_group_id_deterministic_and_marked() {
        let key = RowValue::Text("A".into()).normalized();
        let (seed1, id1) = derive_group_id(0, "cat", &key);
        let (seed2, id2) = derive_group_id(0, "cat", &key);
        assert_eq!(id1, id2);
        assert_eq!(seed1, seed2);
        assert!(id1.is_group_id());

        let other = RowValue::Text("B".into()).normalized();
        let (_, id3) = derive_group_id(0, "cat", &other);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_expand_state_overrides_and_set_all() {
        let mut expand = ExpandState::new(false);
        let id = NodeId(GROUP_ID_BIT | 7);
        assert!(!expand.is_expanded(id));

        assert!(expand.toggle(id));
        assert!(expand.is_expanded(id));

        // set_all wipes overrides
        expand.set_all(true);
        assert!(expand.is_expanded(id));
        expand.set(id, false);
        assert!(!expand.is_expanded(id));
        expand.set_all(false);
        assert!(!expand.is_expanded(NodeId(GROUP_ID_BIT | 8)));
    }

    #[test]
    fn test_full_child_lists_mirror_tree() {
        let mut tree = RowTree::new();
        let g = tree.add_node(None, NodeId(GROUP_ID_BIT | 1), NodeKind::Group {
            field: "cat".into(),
            key: RowValue::Text("A".into()),
        });
        let a = tree.add_node(Some(g), NodeId(1), NodeKind::Leaf { slot: 0 });
        let b = tree.add_node(Some(g), NodeId(2), NodeKind::Leaf { slot: 1 });

        let lists = tree.full_child_lists();
        assert_eq!(lists.roots, vec![g]);
        assert_eq!(lists.children_of(g), &[a, b]);
        assert!(lists.children_of(a).is_empty());
    }
}
