//! Flatten (map) stage: the sorted tree becomes the display list.
//!
//! Pre-order walk over the sorted sibling lists; a group's children are
//! emitted only while the group is expanded. The output sequence is the
//! authoritative display list: an entry's position is its display index,
//! contiguous from zero. This is the only stage output the window renderer
//! consumes.

use crate::node::{ChildLists, ExpandState, RowTree};

/// Flatten to display order (arena slots).
pub fn flatten(tree: &RowTree, sorted: &ChildLists, expand: &ExpandState) -> Vec<usize> {
    let mut display = Vec::new();
    let mut stack: Vec<usize> = sorted.roots.iter().rev().copied().collect();
    while let Some(slot) = stack.pop() {
        display.push(slot);
        let node = tree.node(slot);
        if node.is_group() && expand.is_expanded(node.id) {
            for &child in sorted.children_of(slot).iter().rev() {
                stack.push(child);
            }
        }
    }
    display
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::build_tree;
    use crate::schema::{Column, GridSchema};
    use crate::store::RowStore;
    use rowgrid_core::value::RowValue;

    struct Rec {
        cat: &'static str,
        v: f64,
    }

    fn grouped() -> (RowTree, ChildLists, RowStore<Rec>) {
        let schema = GridSchema::new(vec![
            Column::new("cat", |r: &Rec| r.cat.into()),
            Column::new("v", |r: &Rec| r.v.into()),
        ])
        .unwrap()
        .with_group_by(&["cat"])
        .unwrap();
        let mut store = RowStore::new();
        store.set_rows(vec![
            Rec { cat: "A", v: 1.0 },
            Rec { cat: "B", v: 2.0 },
            Rec { cat: "A", v: 3.0 },
        ]);
        let tree = build_tree(&store, &schema);
        let lists = tree.full_child_lists();
        (tree, lists, store)
    }

    #[test]
    fn test_collapsed_groups_emit_group_rows_only() {
        let (tree, lists, _store) = grouped();
        let display = flatten(&tree, &lists, &ExpandState::new(false));
        assert_eq!(display.len(), 2);
        assert!(display.iter().all(|&slot| tree.node(slot).is_group()));
    }

    #[test]
    fn test_expanding_inserts_children_directly_after_group() {
        let (tree, lists, store) = grouped();
        let mut expand = ExpandState::new(false);

        let group_a = lists.roots[0];
        assert_eq!(tree.node(group_a).group_key(), Some(&RowValue::Text("A".into())));
        expand.set(tree.node(group_a).id, true);

        let display = flatten(&tree, &lists, &expand);
        assert_eq!(display.len(), 3);
        assert_eq!(display[0], group_a);
        // A's two leaves, in order, directly after it
        let values: Vec<f64> = display[1..]
            .iter()
            .map(|&slot| store.row(tree.node(slot).row_slot().unwrap()).unwrap().data.v)
            .collect();
        assert_eq!(values, vec![1.0, 3.0]);
    }

    #[test]
    fn test_expand_all_emits_preorder() {
        let (tree, lists, _store) = grouped();
        let display = flatten(&tree, &lists, &ExpandState::new(true));
        assert_eq!(display.len(), 5);
        // Pre-order: group A, its leaves, group B, its leaf
        assert!(tree.node(display[0]).is_group());
        assert!(!tree.node(display[1]).is_group());
        assert!(!tree.node(display[2]).is_group());
        assert!(tree.node(display[3]).is_group());
        assert!(!tree.node(display[4]).is_group());
    }

    #[test]
    fn test_empty_tree_flattens_empty() {
        let tree = RowTree::new();
        let lists = tree.full_child_lists();
        assert!(flatten(&tree, &lists, &ExpandState::new(true)).is_empty());
    }
}
