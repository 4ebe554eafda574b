//! Aggregation engine: per-group summary values over the filtered tree.
//!
//! Values accumulate bottom-up: a group's value for a field is the reducer
//! applied over its immediate children (leaf children contribute the column
//! value, group children their own aggregate). Aggregates reflect only rows
//! that passed the filter stage, so the engine runs after filtering and on
//! the explicit recompute-aggregates cheap path.

use std::fmt;

use rowgrid_core::value::RowValue;
use rustc_hash::FxHashMap;

use crate::node::{ChildLists, NodeId, RowTree};
use crate::schema::{Column, GridSchema};
use crate::store::RowStore;

/// Reducer for an aggregated column.
pub enum AggFunc {
    Sum,
    Min,
    Max,
    /// Number of leaf rows under the group.
    Count,
    /// Mean over leaf values (weighted, not an average of averages).
    Avg,
    /// First child's value in current child order.
    First,
    /// Custom reducer over the immediate children's values.
    Custom(Box<dyn Fn(&[RowValue]) -> RowValue>),
}

impl fmt::Debug for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggFunc::Sum => write!(f, "Sum"),
            AggFunc::Min => write!(f, "Min"),
            AggFunc::Max => write!(f, "Max"),
            AggFunc::Count => write!(f, "Count"),
            AggFunc::Avg => write!(f, "Avg"),
            AggFunc::First => write!(f, "First"),
            AggFunc::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Computed aggregates, keyed by group node id then aggregate field.
#[derive(Debug, Clone, Default)]
pub struct AggregateTable {
    groups: FxHashMap<NodeId, FxHashMap<String, RowValue>>,
}

impl AggregateTable {
    pub fn value(&self, id: NodeId, field: &str) -> Option<&RowValue> {
        self.groups.get(&id).and_then(|fields| fields.get(field))
    }

    pub fn fields_for(&self, id: NodeId) -> Option<&FxHashMap<String, RowValue>> {
        self.groups.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn insert(&mut self, id: NodeId, field: &str, value: RowValue) {
        self.groups.entry(id).or_default().insert(field.to_string(), value);
    }
}

/// Per-node accumulation carried up one column's walk.
struct ColumnStat {
    /// The node's value for this column (aggregate for groups).
    value: RowValue,
    /// Sum of numeric leaf values underneath (for Sum/Avg).
    sum: f64,
    /// How many leaf values underneath were numeric.
    numeric_count: usize,
    /// Leaf rows underneath (for Count).
    leaf_count: usize,
}

/// Compute aggregates for every group in the filtered tree.
pub fn compute<R>(
    tree: &RowTree,
    filtered: &ChildLists,
    store: &RowStore<R>,
    schema: &GridSchema<R>,
) -> AggregateTable {
    let mut table = AggregateTable::default();
    for column in schema.aggregated_columns() {
        let Some(func) = column.aggregate() else {
            continue;
        };
        for &root in &filtered.roots {
            compute_column(tree, filtered, store, column, func, &mut table, root);
        }
    }
    table
}

fn compute_column<R>(
    tree: &RowTree,
    filtered: &ChildLists,
    store: &RowStore<R>,
    column: &Column<R>,
    func: &AggFunc,
    table: &mut AggregateTable,
    slot: usize,
) -> ColumnStat {
    let node = tree.node(slot);

    if let Some(row_slot) = node.row_slot() {
        let value = match store.row(row_slot) {
            Some(row) => column.value(&row.data),
            None => RowValue::Null,
        };
        let (sum, numeric_count) = match value {
            RowValue::Number(n) => (n, 1),
            _ => (0.0, 0),
        };
        return ColumnStat { value, sum, numeric_count, leaf_count: 1 };
    }

    let mut child_values = Vec::new();
    let mut sum = 0.0;
    let mut numeric_count = 0usize;
    let mut leaf_count = 0usize;
    for &child in filtered.children_of(slot) {
        let stat = compute_column(tree, filtered, store, column, func, table, child);
        sum += stat.sum;
        numeric_count += stat.numeric_count;
        leaf_count += stat.leaf_count;
        child_values.push(stat.value);
    }

    let value = match func {
        AggFunc::Sum => {
            if numeric_count > 0 {
                RowValue::Number(sum)
            } else {
                RowValue::Null
            }
        }
        AggFunc::Avg => {
            if numeric_count > 0 {
                RowValue::Number(sum / numeric_count as f64)
            } else {
                RowValue::Null
            }
        }
        AggFunc::Count => RowValue::Number(leaf_count as f64),
        AggFunc::Min => pick(&child_values, |a, b| a < b),
        AggFunc::Max => pick(&child_values, |a, b| a > b),
        AggFunc::First => child_values.first().cloned().unwrap_or(RowValue::Null),
        AggFunc::Custom(reduce) => reduce(&child_values),
    };

    table.insert(node.id, column.id(), value.clone());
    ColumnStat { value, sum, numeric_count, leaf_count }
}

/// Winner among non-null child values under the normalized ordering.
fn pick(
    values: &[RowValue],
    better: impl Fn(&rowgrid_core::value::NormalizedValue, &rowgrid_core::value::NormalizedValue) -> bool,
) -> RowValue {
    let mut winner: Option<&RowValue> = None;
    for value in values {
        if value.is_null() {
            continue;
        }
        match winner {
            None => winner = Some(value),
            Some(current) => {
                if better(&value.normalized(), &current.normalized()) {
                    winner = Some(value);
                }
            }
        }
    }
    winner.cloned().unwrap_or(RowValue::Null)
}
