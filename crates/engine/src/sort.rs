//! Sort stage: orders each sibling list by the comparator chain.
//!
//! Sorting never moves a node across a group boundary; each group's direct
//! children sort independently. The first non-equal field in the chain
//! decides; the sort is stable, so rows comparing equal keep their
//! group-stage order, for descending directions too (direction inverts the
//! field comparison, never the tie-break).

use std::cmp::Ordering;

use rowgrid_core::sort::{SortDirection, SortSpec};
use rowgrid_core::value::{NormalizedValue, RowValue};

use crate::aggregate::AggregateTable;
use crate::node::{ChildLists, NodeKind, RowTree};
use crate::schema::GridSchema;
use crate::store::RowStore;

/// Sort the filtered sibling lists. An empty spec list is the identity.
pub fn sort_children<R>(
    tree: &RowTree,
    filtered: &ChildLists,
    store: &RowStore<R>,
    schema: &GridSchema<R>,
    specs: &[SortSpec],
    aggregates: &AggregateTable,
) -> ChildLists {
    if specs.is_empty() {
        return filtered.clone();
    }

    let mut sorted = ChildLists::with_len(tree.len());
    sorted.roots = sort_list(tree, store, schema, specs, aggregates, &filtered.roots);
    for slot in 0..tree.len() {
        let children = filtered.children_of(slot);
        if !children.is_empty() {
            sorted.set_children(slot, sort_list(tree, store, schema, specs, aggregates, children));
        }
    }
    sorted
}

fn sort_list<R>(
    tree: &RowTree,
    store: &RowStore<R>,
    schema: &GridSchema<R>,
    specs: &[SortSpec],
    aggregates: &AggregateTable,
    list: &[usize],
) -> Vec<usize> {
    // Precompute the key chain per entry; accessors run once per field
    let mut keyed: Vec<(Vec<NormalizedValue>, usize)> = list
        .iter()
        .map(|&slot| {
            let keys = specs
                .iter()
                .map(|spec| sort_value(tree, store, schema, aggregates, slot, &spec.field))
                .collect();
            (keys, slot)
        })
        .collect();

    keyed.sort_by(|a, b| {
        for (position, spec) in specs.iter().enumerate() {
            let ord = a.0[position].cmp(&b.0[position]);
            let ord = match spec.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    keyed.into_iter().map(|(_, slot)| slot).collect()
}

/// The value a node contributes for one sort field. Group rows sort by
/// their aggregate when the field is aggregated, else by their group key.
fn sort_value<R>(
    tree: &RowTree,
    store: &RowStore<R>,
    schema: &GridSchema<R>,
    aggregates: &AggregateTable,
    slot: usize,
    field: &str,
) -> NormalizedValue {
    let node = tree.node(slot);
    match &node.kind {
        NodeKind::Leaf { slot: row_slot } => schema
            .column(field)
            .and_then(|column| store.row(*row_slot).map(|row| column.value(&row.data)))
            .unwrap_or(RowValue::Null)
            .normalized(),
        NodeKind::Group { key, .. } => {
            if schema.is_aggregated(field) {
                aggregates
                    .value(node.id, field)
                    .cloned()
                    .unwrap_or(RowValue::Null)
                    .normalized()
            } else {
                key.normalized()
            }
        }
    }
}
