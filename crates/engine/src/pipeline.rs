//! Pipeline controller: coarse-to-fine invalidation over the four stages.
//!
//! A requested step recomputes that stage and every stage after it; earlier
//! stages reuse their cached output unconditionally. `Everything` forces the
//! group stage to re-read the row store. Grouping and filtering walk the
//! whole tree, so a pure expand/collapse toggle (Map) or a sort-key change
//! (Sort) must not re-run them.
//!
//! Invalidation is split from recomputation: `invalidate` marks the coarsest
//! pending step, `update` runs it. Marking an equal-or-finer step while a
//! coarser one is pending is absorbed (no duplicate work); generation tokens
//! record which stages actually recomputed.

use rowgrid_core::filter::FilterModel;
use rowgrid_core::sort::SortSpec;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::aggregate::{self, AggregateTable};
use crate::filter::filter_tree;
use crate::flatten::flatten;
use crate::group::build_tree;
use crate::node::{ChildLists, ExpandState, NodeId, RowTree, TreeNode};
use crate::schema::GridSchema;
use crate::store::RowStore;

/// Recompute granularity, coarsest first. A stage recomputes when its
/// position is at or after the requested step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    /// Rebuild from the row store.
    Everything,
    /// Re-group the current rows.
    Group,
    /// Re-filter the grouped tree (also recomputes aggregates).
    Filter,
    /// Re-sort sibling lists.
    Sort,
    /// Re-flatten using current expand state.
    Map,
}

impl Step {
    /// Does a request at `self` recompute `stage`?
    pub fn runs(self, stage: Step) -> bool {
        stage >= self
    }

    /// The coarser of two steps.
    pub fn coarsest(self, other: Step) -> Step {
        self.min(other)
    }
}

/// Monotonic token per stage; bumped every time the stage recomputes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageGenerations {
    pub group: u64,
    pub filter: u64,
    pub sort: u64,
    pub map: u64,
}

/// What one `update` pass did to the display list.
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    /// The step that ran, if anything was pending.
    pub ran: Option<Step>,
    /// Display indices whose previous occupant left the display list
    /// entirely (not merely moved).
    pub removed_indices: Vec<usize>,
    /// True when the new display list differs from the previous one.
    pub display_changed: bool,
}

/// Cached stage outputs plus the pending-step marker.
#[derive(Debug, Default)]
pub struct Pipeline {
    tree: RowTree,
    filtered: ChildLists,
    aggregates: AggregateTable,
    sorted: ChildLists,
    display: Vec<usize>,
    display_ids: Vec<NodeId>,
    display_index_of: FxHashMap<NodeId, usize>,
    generations: StageGenerations,
    counter: u64,
    pending: Option<Step>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a step as pending. A pending coarser step absorbs finer ones.
    pub fn invalidate(&mut self, step: Step) {
        self.pending = Some(match self.pending {
            Some(current) => current.coarsest(step),
            None => step,
        });
    }

    pub fn pending(&self) -> Option<Step> {
        self.pending
    }

    /// Run the pending step, recomputing the minimal suffix of stages.
    /// No pending step means no work and an unchanged display list.
    pub fn update<R>(
        &mut self,
        store: &RowStore<R>,
        schema: &GridSchema<R>,
        filters: &FilterModel,
        sorts: &[SortSpec],
        expand: &ExpandState,
    ) -> StepOutcome {
        let Some(step) = self.pending.take() else {
            return StepOutcome::default();
        };

        if step.runs(Step::Group) {
            self.tree = build_tree(store, schema);
            self.counter += 1;
            self.generations.group = self.counter;
        }
        if step.runs(Step::Filter) {
            self.filtered = filter_tree(&self.tree, store, schema, filters);
            // Aggregates reflect only passing rows
            self.aggregates = aggregate::compute(&self.tree, &self.filtered, store, schema);
            self.counter += 1;
            self.generations.filter = self.counter;
        }
        if step.runs(Step::Sort) {
            self.sorted = crate::sort::sort_children(
                &self.tree,
                &self.filtered,
                store,
                schema,
                sorts,
                &self.aggregates,
            );
            self.counter += 1;
            self.generations.sort = self.counter;
        }

        // Map always runs; it is the finest step
        let display = flatten(&self.tree, &self.sorted, expand);
        let display_ids: Vec<NodeId> =
            display.iter().map(|&slot| self.tree.node(slot).id).collect();
        debug_assert_eq!(
            display_ids.iter().collect::<FxHashSet<_>>().len(),
            display_ids.len(),
            "node appears twice in display list"
        );

        let new_ids: FxHashSet<NodeId> = display_ids.iter().copied().collect();
        let removed_indices: Vec<usize> = self
            .display_ids
            .iter()
            .enumerate()
            .filter(|(_, id)| !new_ids.contains(id))
            .map(|(index, _)| index)
            .collect();
        let display_changed = self.display_ids != display_ids;

        self.display = display;
        self.display_ids = display_ids;
        self.display_index_of = self
            .display_ids
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index))
            .collect();
        self.counter += 1;
        self.generations.map = self.counter;

        log::debug!(
            "pipeline pass step={:?} display_len={} changed={}",
            step,
            self.display.len(),
            display_changed
        );

        StepOutcome { ran: Some(step), removed_indices, display_changed }
    }

    /// Cheap path for value-only updates: recompute aggregates from the
    /// cached filtered tree without re-running filter, sort, or map.
    pub fn recompute_aggregates<R>(&mut self, store: &RowStore<R>, schema: &GridSchema<R>) {
        self.aggregates = aggregate::compute(&self.tree, &self.filtered, store, schema);
    }

    // -------------------------------------------------------------------------
    // Cached-output accessors
    // -------------------------------------------------------------------------

    pub fn tree(&self) -> &RowTree {
        &self.tree
    }

    pub fn aggregates(&self) -> &AggregateTable {
        &self.aggregates
    }

    /// The display list as arena slots.
    pub fn display(&self) -> &[usize] {
        &self.display
    }

    pub fn display_len(&self) -> usize {
        self.display.len()
    }

    pub fn node_at(&self, display_index: usize) -> Option<&TreeNode> {
        self.display.get(display_index).map(|&slot| self.tree.node(slot))
    }

    pub fn id_at(&self, display_index: usize) -> Option<NodeId> {
        self.display_ids.get(display_index).copied()
    }

    /// Current display index of a node, if it is displayed.
    pub fn display_index_of(&self, id: NodeId) -> Option<usize> {
        self.display_index_of.get(&id).copied()
    }

    pub fn generations(&self) -> StageGenerations {
        self.generations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    struct Rec {
        cat: &'static str,
        v: f64,
    }

    fn setup() -> (RowStore<Rec>, GridSchema<Rec>, FilterModel, ExpandState) {
        let schema = GridSchema::new(vec![
            Column::new("cat", |r: &Rec| r.cat.into()),
            Column::new("v", |r: &Rec| r.v.into()),
        ])
        .unwrap();
        let mut store = RowStore::new();
        store.set_rows(vec![
            Rec { cat: "A", v: 3.0 },
            Rec { cat: "B", v: 1.0 },
            Rec { cat: "A", v: 2.0 },
        ]);
        (store, schema, FilterModel::new(), ExpandState::new(false))
    }

    #[test]
    fn test_step_ordering_and_runs() {
        assert!(Step::Everything.runs(Step::Map));
        assert!(Step::Filter.runs(Step::Sort));
        assert!(!Step::Map.runs(Step::Sort));
        assert_eq!(Step::Sort.coarsest(Step::Group), Step::Group);
    }

    #[test]
    fn test_requested_step_skips_upstream_stages() {
        let (store, schema, filters, expand) = setup();
        let mut pipeline = Pipeline::new();

        pipeline.invalidate(Step::Everything);
        pipeline.update(&store, &schema, &filters, &[], &expand);
        let after_full = pipeline.generations();

        pipeline.invalidate(Step::Sort);
        pipeline.update(&store, &schema, &filters, &[], &expand);
        let after_sort = pipeline.generations();

        // Group and filter reused cached output; sort and map recomputed
        assert_eq!(after_sort.group, after_full.group);
        assert_eq!(after_sort.filter, after_full.filter);
        assert!(after_sort.sort > after_full.sort);
        assert!(after_sort.map > after_full.map);
    }

    #[test]
    fn test_pending_absorbs_finer_requests() {
        let (store, schema, filters, expand) = setup();
        let mut pipeline = Pipeline::new();

        pipeline.invalidate(Step::Filter);
        pipeline.invalidate(Step::Map);
        assert_eq!(pipeline.pending(), Some(Step::Filter));

        pipeline.invalidate(Step::Everything);
        assert_eq!(pipeline.pending(), Some(Step::Everything));

        let outcome = pipeline.update(&store, &schema, &filters, &[], &expand);
        assert_eq!(outcome.ran, Some(Step::Everything));
        assert_eq!(pipeline.pending(), None);

        // Nothing pending: no work
        let outcome = pipeline.update(&store, &schema, &filters, &[], &expand);
        assert_eq!(outcome.ran, None);
        assert!(!outcome.display_changed);
    }

    #[test]
    fn test_map_twice_is_idempotent() {
        let (store, schema, filters, expand) = setup();
        let mut pipeline = Pipeline::new();
        pipeline.invalidate(Step::Everything);
        pipeline.update(&store, &schema, &filters, &[], &expand);
        let first: Vec<NodeId> = (0..pipeline.display_len())
            .map(|i| pipeline.id_at(i).unwrap())
            .collect();

        pipeline.invalidate(Step::Map);
        let outcome = pipeline.update(&store, &schema, &filters, &[], &expand);
        let second: Vec<NodeId> = (0..pipeline.display_len())
            .map(|i| pipeline.id_at(i).unwrap())
            .collect();

        assert_eq!(first, second);
        assert!(!outcome.display_changed);
        assert!(outcome.removed_indices.is_empty());
    }

    #[test]
    fn test_removed_indices_on_filter_out() {
        let (store, schema, mut filters, expand) = setup();
        let mut pipeline = Pipeline::new();
        pipeline.invalidate(Step::Everything);
        pipeline.update(&store, &schema, &filters, &[], &expand);
        assert_eq!(pipeline.display_len(), 3);

        filters.set_quick_filter(Some("a"));
        pipeline.invalidate(Step::Filter);
        let outcome = pipeline.update(&store, &schema, &filters, &[], &expand);

        // Row "B" at display index 1 left the display list
        assert_eq!(outcome.removed_indices, vec![1]);
        assert!(outcome.display_changed);
        assert_eq!(pipeline.display_len(), 2);
    }

    #[test]
    fn test_display_index_lookup_tracks_nodes() {
        let (store, schema, filters, expand) = setup();
        let mut pipeline = Pipeline::new();
        pipeline.invalidate(Step::Everything);
        pipeline.update(&store, &schema, &filters, &[], &expand);

        let id = pipeline.id_at(2).unwrap();
        assert_eq!(pipeline.display_index_of(id), Some(2));

        let sorts = [rowgrid_core::sort::SortSpec::asc("v")];
        pipeline.invalidate(Step::Sort);
        pipeline.update(&store, &schema, &filters, &sorts, &expand);

        // v=2.0 was last in store order, now in the middle
        assert_eq!(pipeline.display_index_of(id), Some(1));
    }
}
