//! Filter stage: prunes the grouped tree down to passing subtrees.
//!
//! A leaf passes when every active column filter accepts its value AND the
//! quick filter (case-insensitive substring) matches its text projection.
//! A group passes when at least one descendant leaf passes; empty groups are
//! pruned from the output but stay in the full tree for later re-filtering.
//! The output keeps node identities; nothing in the tree is mutated.

use rowgrid_core::filter::{ColumnFilter, FilterModel};

use crate::node::{ChildLists, RowTree};
use crate::schema::{Column, GridSchema};
use crate::store::RowStore;

/// Apply the filter model over the grouped tree, producing pruned sibling
/// lists. With no active filter this is an identity copy of the tree shape.
pub fn filter_tree<R>(
    tree: &RowTree,
    store: &RowStore<R>,
    schema: &GridSchema<R>,
    model: &FilterModel,
) -> ChildLists {
    if !model.is_active() {
        return tree.full_child_lists();
    }

    // Resolve field ids to columns once per pass
    let mut active: Vec<(&Column<R>, &ColumnFilter)> = Vec::new();
    for (field, filter) in model.active_column_filters() {
        match schema.column(field) {
            Some(column) => active.push((column, filter)),
            // Filters are validated against the schema when set
            None => debug_assert!(false, "filter on unknown field: {field}"),
        }
    }
    let quick = model.quick_filter();

    let mut lists = ChildLists::with_len(tree.len());
    let roots: Vec<usize> = tree
        .roots()
        .iter()
        .copied()
        .filter(|&root| include(tree, store, schema, &active, quick, &mut lists, root))
        .collect();
    lists.roots = roots;
    lists
}

fn include<R>(
    tree: &RowTree,
    store: &RowStore<R>,
    schema: &GridSchema<R>,
    active: &[(&Column<R>, &ColumnFilter)],
    quick: Option<&str>,
    lists: &mut ChildLists,
    slot: usize,
) -> bool {
    let node = tree.node(slot);

    if let Some(row_slot) = node.row_slot() {
        let Some(row) = store.row(row_slot) else {
            return false;
        };
        return leaf_passes(schema, active, quick, &row.data);
    }

    let kept: Vec<usize> = node
        .children
        .iter()
        .copied()
        .filter(|&child| include(tree, store, schema, active, quick, lists, child))
        .collect();
    if kept.is_empty() {
        return false;
    }
    lists.set_children(slot, kept);
    true
}

fn leaf_passes<R>(
    schema: &GridSchema<R>,
    active: &[(&Column<R>, &ColumnFilter)],
    quick: Option<&str>,
    data: &R,
) -> bool {
    for (column, filter) in active {
        if !filter.passes(&column.value(data)) {
            return false;
        }
    }

    if let Some(needle) = quick {
        // Text projection: every column's display value, computed once per
        // row per filter pass. The needle is already lowercased.
        let projection = schema
            .columns()
            .iter()
            .map(|c| c.value(data).display_string())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if !projection.contains(needle) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::build_tree;
    use rowgrid_core::filter::{TextFilter, TextFilterMode};
    use rowgrid_core::value::RowValue;

    struct Person {
        name: &'static str,
        cat: &'static str,
    }

    fn schema() -> GridSchema<Person> {
        GridSchema::new(vec![
            Column::new("name", |p: &Person| p.name.into()),
            Column::new("cat", |p: &Person| p.cat.into()),
        ])
        .unwrap()
    }

    fn store() -> RowStore<Person> {
        let mut store = RowStore::new();
        store.set_rows(vec![
            Person { name: "Bob", cat: "A" },
            Person { name: "Ann", cat: "A" },
            Person { name: "Cal", cat: "B" },
        ]);
        store
    }

    fn displayed_names(
        tree: &RowTree,
        store: &RowStore<Person>,
        lists: &ChildLists,
    ) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut stack: Vec<usize> = lists.roots.iter().rev().copied().collect();
        while let Some(slot) = stack.pop() {
            let node = tree.node(slot);
            if let Some(row_slot) = node.row_slot() {
                names.push(store.row(row_slot).unwrap().data.name);
            }
            for &child in lists.children_of(slot).iter().rev() {
                stack.push(child);
            }
        }
        names
    }

    #[test]
    fn test_inactive_model_is_identity() {
        let schema = schema();
        let store = store();
        let tree = build_tree(&store, &schema);
        let lists = filter_tree(&tree, &store, &schema, &FilterModel::new());
        assert_eq!(lists.roots, tree.roots());
    }

    #[test]
    fn test_quick_filter_case_insensitive_substring() {
        let schema = schema();
        let store = store();
        let tree = build_tree(&store, &schema);

        let mut model = FilterModel::new();
        model.set_quick_filter(Some("b"));
        let lists = filter_tree(&tree, &store, &schema, &model);
        assert_eq!(displayed_names(&tree, &store, &lists), vec!["Bob"]);
    }

    #[test]
    fn test_empty_groups_pruned() {
        let schema = schema().with_group_by(&["cat"]).unwrap();
        let store = store();
        let tree = build_tree(&store, &schema);

        let mut model = FilterModel::new();
        model.set_quick_filter(Some("cal"));
        let lists = filter_tree(&tree, &store, &schema, &model);

        // Group "A" has no passing leaves and disappears; "B" survives
        assert_eq!(lists.roots.len(), 1);
        let group = tree.node(lists.roots[0]);
        assert_eq!(group.group_key(), Some(&RowValue::Text("B".into())));
        assert_eq!(displayed_names(&tree, &store, &lists), vec!["Cal"]);
    }

    #[test]
    fn test_column_filter_and_quick_filter_combine() {
        let schema = schema();
        let store = store();
        let tree = build_tree(&store, &schema);

        let mut model = FilterModel::new();
        model.set_column_filter(
            "cat",
            ColumnFilter {
                selected: None,
                text_filter: Some(TextFilter {
                    mode: TextFilterMode::Equals,
                    value: "A".into(),
                    case_sensitive: false,
                }),
            },
        );
        // Quick filter alone would match Bob and Ann; cat=A alone too.
        model.set_quick_filter(Some("ann"));
        let lists = filter_tree(&tree, &store, &schema, &model);
        assert_eq!(displayed_names(&tree, &store, &lists), vec!["Ann"]);
    }
}
