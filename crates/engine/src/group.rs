//! Group stage: partitions the row store into a node tree.
//!
//! Rows are partitioned by each configured group field in turn, outermost
//! first. Sibling groups appear in first-seen row order and group members
//! keep row-store order, so an unchanged row set always produces the same
//! tree. Group identity comes from the key path (see `node::derive_group_id`),
//! which is what lets expand and selection state survive a rebuild.

use rowgrid_core::value::{NormalizedValue, RowValue};
use rustc_hash::FxHashMap;

use crate::node::{derive_group_id, NodeId, NodeKind, RowTree};
use crate::schema::GridSchema;
use crate::store::RowStore;

/// Build the node tree for the store's current rows. With grouping disabled
/// the tree is a flat list of leaves in row-store order.
pub fn build_tree<R>(store: &RowStore<R>, schema: &GridSchema<R>) -> RowTree {
    let mut tree = RowTree::new();
    if !schema.grouping_enabled() {
        for (slot, row) in store.iter_present() {
            tree.add_node(None, row.id, NodeKind::Leaf { slot });
        }
        return tree;
    }

    let rows: Vec<(usize, NodeId)> = store.iter_present().map(|(slot, r)| (slot, r.id)).collect();
    group_level(&mut tree, store, schema, None, 0, 0, &rows);
    tree
}

fn group_level<R>(
    tree: &mut RowTree,
    store: &RowStore<R>,
    schema: &GridSchema<R>,
    parent: Option<usize>,
    parent_seed: u64,
    depth: usize,
    rows: &[(usize, NodeId)],
) {
    if depth == schema.group_fields().len() {
        for &(slot, id) in rows {
            tree.add_node(parent, id, NodeKind::Leaf { slot });
        }
        return;
    }

    let field = &schema.group_fields()[depth];
    let Some(column) = schema.column(field) else {
        // Group fields are validated at configuration time
        debug_assert!(false, "group field without column: {field}");
        return;
    };

    // Buckets in first-seen order; normalized keys decide membership, the
    // first raw value seen becomes the group's display key.
    let mut order: Vec<NormalizedValue> = Vec::new();
    let mut buckets: FxHashMap<NormalizedValue, (RowValue, Vec<(usize, NodeId)>)> =
        FxHashMap::default();
    for &(slot, id) in rows {
        let raw = store
            .row(slot)
            .map(|r| column.value(&r.data))
            .unwrap_or(RowValue::Null);
        let key = raw.normalized();
        buckets
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                (raw, Vec::new())
            })
            .1
            .push((slot, id));
    }

    for key in order {
        let Some((raw, members)) = buckets.remove(&key) else {
            continue;
        };
        let (seed, group_id) = derive_group_id(parent_seed, field, &key);
        let group_index =
            tree.add_node(parent, group_id, NodeKind::Group { field: field.clone(), key: raw });
        group_level(tree, store, schema, Some(group_index), seed, depth + 1, &members);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    struct Item {
        cat: &'static str,
        sub: &'static str,
    }

    fn flat_schema() -> GridSchema<Item> {
        GridSchema::new(vec![
            Column::new("cat", |i: &Item| i.cat.into()),
            Column::new("sub", |i: &Item| i.sub.into()),
        ])
        .unwrap()
    }

    fn rows() -> Vec<Item> {
        vec![
            Item { cat: "A", sub: "x" },
            Item { cat: "B", sub: "x" },
            Item { cat: "A", sub: "y" },
        ]
    }

    #[test]
    fn test_flat_tree_when_grouping_disabled() {
        let mut store = RowStore::new();
        store.set_rows(rows());
        let tree = build_tree(&store, &flat_schema());

        assert_eq!(tree.roots().len(), 3);
        for (position, &root) in tree.roots().iter().enumerate() {
            let node = tree.node(root);
            assert!(!node.is_group());
            assert_eq!(node.row_slot(), Some(position));
            assert_eq!(node.level, 0);
        }
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let schema = flat_schema().with_group_by(&["cat"]).unwrap();
        let mut store = RowStore::new();
        store.set_rows(rows());
        let tree = build_tree(&store, &schema);

        let keys: Vec<RowValue> = tree
            .roots()
            .iter()
            .map(|&r| tree.node(r).group_key().cloned().unwrap())
            .collect();
        assert_eq!(keys, vec![RowValue::Text("A".into()), RowValue::Text("B".into())]);

        // "A" owns rows 0 and 2, in store order
        let a = tree.node(tree.roots()[0]);
        let slots: Vec<usize> =
            a.children.iter().map(|&c| tree.node(c).row_slot().unwrap()).collect();
        assert_eq!(slots, vec![0, 2]);
    }

    #[test]
    fn test_two_level_grouping_levels_and_parents() {
        let schema = flat_schema().with_group_by(&["cat", "sub"]).unwrap();
        let mut store = RowStore::new();
        store.set_rows(rows());
        let tree = build_tree(&store, &schema);

        let a = tree.roots()[0];
        assert_eq!(tree.node(a).level, 0);
        let sub = tree.node(a).children[0];
        assert!(tree.node(sub).is_group());
        assert_eq!(tree.node(sub).level, 1);
        let leaf = tree.node(sub).children[0];
        assert_eq!(tree.node(leaf).level, 2);
        assert_eq!(tree.node(leaf).parent, Some(sub));
    }

    #[test]
    fn test_group_ids_stable_across_rebuild() {
        let schema = flat_schema().with_group_by(&["cat"]).unwrap();
        let mut store = RowStore::new();
        store.set_rows(rows());

        let first = build_tree(&store, &schema);
        let second = build_tree(&store, &schema);
        let first_ids: Vec<NodeId> = first.roots().iter().map(|&r| first.node(r).id).collect();
        let second_ids: Vec<NodeId> = second.roots().iter().map(|&r| second.node(r).id).collect();
        assert_eq!(first_ids, second_ids);
        assert!(first_ids.iter().all(|id| id.is_group_id()));
    }

    #[test]
    fn test_keys_normalized_for_membership_raw_for_display() {
        let schema = GridSchema::new(vec![Column::new("cat", |i: &Item| i.cat.into())])
            .unwrap()
            .with_group_by(&["cat"])
            .unwrap();
        let mut store = RowStore::new();
        store.set_rows(vec![
            Item { cat: "Fruit", sub: "" },
            Item { cat: "fruit ", sub: "" },
        ]);
        let tree = build_tree(&store, &schema);

        assert_eq!(tree.roots().len(), 1);
        let group = tree.node(tree.roots()[0]);
        // Display key is the first raw value seen
        assert_eq!(group.group_key(), Some(&RowValue::Text("Fruit".into())));
        assert_eq!(group.children.len(), 2);
    }
}
