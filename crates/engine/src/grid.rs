//! Grid facade: one owner for the store, pipeline, selection, listeners,
//! and paging, exposing the operations the surrounding UI layer calls.
//!
//! The facade has no rendering side effect. Every mutating operation runs
//! the minimal pipeline suffix synchronously, notifies row listeners, and
//! emits a `ModelUpdated` event; the host decides whether to repaint.

use rowgrid_core::filter::{ColumnFilter, FilterModel};
use rowgrid_core::sort::SortSpec;
use rowgrid_core::value::RowValue;
use rustc_hash::FxHashMap;

use crate::events::{
    EventCallback, GridEvent, ModelUpdatedEvent, RowsIngestedEvent, SelectionChangedEvent,
};
use crate::listener::{RowListener, RowListenerRegistry};
use crate::node::{ExpandState, NodeId, NodeKind};
use crate::paging::{PageFetch, PagingAdapter, PagingState, RowDatasource};
use crate::pipeline::{Pipeline, StageGenerations, Step};
use crate::schema::{GridError, GridSchema};
use crate::selection::{SelectionDelta, SelectionTracker};
use crate::store::RowStore;

/// A row as the renderer sees it: one display index's worth of state.
#[derive(Debug)]
pub struct DisplayEntry<'a, R> {
    pub id: NodeId,
    pub level: u32,
    pub is_group: bool,
    /// The grouped field, for group rows.
    pub group_field: Option<&'a str>,
    /// The group key, for group rows.
    pub group_key: Option<&'a RowValue>,
    /// The raw record, for leaf rows.
    pub data: Option<&'a R>,
    /// Aggregate values, for group rows.
    pub aggregates: Option<&'a FxHashMap<String, RowValue>>,
    pub expanded: bool,
    pub selected: bool,
}

pub struct RowGrid<R> {
    store: RowStore<R>,
    schema: GridSchema<R>,
    filter_model: FilterModel,
    sort_specs: Vec<SortSpec>,
    expand: ExpandState,
    pipeline: Pipeline,
    selection: SelectionTracker,
    listeners: RowListenerRegistry,
    paging: PagingAdapter<R>,
    on_event: Option<EventCallback>,
}

impl<R> RowGrid<R> {
    pub fn new(schema: GridSchema<R>) -> Self {
        let expand = ExpandState::new(schema.group_default_expanded());
        Self {
            store: RowStore::new(),
            schema,
            filter_model: FilterModel::new(),
            sort_specs: Vec::new(),
            expand,
            pipeline: Pipeline::new(),
            selection: SelectionTracker::new(),
            listeners: RowListenerRegistry::new(),
            paging: PagingAdapter::new(),
            on_event: None,
        }
    }

    /// Register the event callback. One callback per grid; the host fans
    /// out from there if needed.
    pub fn set_on_event(&mut self, callback: EventCallback) {
        self.on_event = Some(callback);
    }

    fn emit(&mut self, event: GridEvent) {
        if let Some(callback) = self.on_event.as_mut() {
            callback(event);
        }
    }

    // -------------------------------------------------------------------------
    // Rows and pipeline
    // -------------------------------------------------------------------------

    /// Replace all rows. Clears the selection, then rebuilds everything.
    pub fn set_rows(&mut self, rows: Vec<R>) {
        let delta = self.selection.clear();
        self.apply_selection_delta(delta);
        self.store.set_rows(rows);
        self.request_step(Step::Everything);
    }

    /// Recompute the given stage and everything after it.
    pub fn request_step(&mut self, step: Step) {
        self.pipeline.invalidate(step);
        self.update_model(step);
    }

    fn update_model(&mut self, step: Step) {
        let outcome = self.pipeline.update(
            &self.store,
            &self.schema,
            &self.filter_model,
            &self.sort_specs,
            &self.expand,
        );
        if outcome.ran.is_none() {
            return;
        }
        for &index in &outcome.removed_indices {
            self.listeners.notify_removed(index);
        }
        let event = ModelUpdatedEvent {
            step,
            display_len: self.pipeline.display_len(),
            map_generation: self.pipeline.generations().map,
            display_changed: outcome.display_changed,
        };
        self.emit(GridEvent::ModelUpdated(event));
    }

    /// Cheap path for value-only updates: refresh aggregates from the
    /// cached filtered tree without re-running filter, sort, or map.
    pub fn recompute_aggregates(&mut self) {
        self.pipeline.recompute_aggregates(&self.store, &self.schema);
    }

    // -------------------------------------------------------------------------
    // Filtering
    // -------------------------------------------------------------------------

    /// Set the quick filter; empty or whitespace-only deactivates it.
    pub fn set_quick_filter(&mut self, raw: Option<&str>) {
        if self.filter_model.set_quick_filter(raw) {
            self.request_step(Step::Filter);
        }
    }

    pub fn set_column_filter(
        &mut self,
        field: &str,
        filter: ColumnFilter,
    ) -> Result<(), GridError> {
        self.schema.require_column(field)?;
        self.filter_model.set_column_filter(field, filter);
        self.request_step(Step::Filter);
        Ok(())
    }

    pub fn clear_column_filter(&mut self, field: &str) {
        self.filter_model.clear_column_filter(field);
        self.request_step(Step::Filter);
    }

    pub fn clear_filters(&mut self) {
        self.filter_model.clear_all();
        self.request_step(Step::Filter);
    }

    // -------------------------------------------------------------------------
    // Sorting and grouping
    // -------------------------------------------------------------------------

    pub fn set_sort(&mut self, specs: Vec<SortSpec>) -> Result<(), GridError> {
        for spec in &specs {
            self.schema.require_column(&spec.field)?;
        }
        self.sort_specs = specs;
        self.request_step(Step::Sort);
        Ok(())
    }

    pub fn clear_sort(&mut self) {
        self.sort_specs.clear();
        self.request_step(Step::Sort);
    }

    pub fn sort_specs(&self) -> &[SortSpec] {
        &self.sort_specs
    }

    /// Change the grouping fields, outermost first. Rebuilds from the store.
    pub fn set_group_by(&mut self, fields: &[&str]) -> Result<(), GridError> {
        self.schema
            .set_group_fields(fields.iter().map(|f| f.to_string()).collect())?;
        self.request_step(Step::Everything);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Expand / collapse
    // -------------------------------------------------------------------------

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) {
        if !self.is_known_group(id) {
            return;
        }
        self.expand.set(id, expanded);
        self.request_step(Step::Map);
    }

    pub fn toggle_expanded(&mut self, id: NodeId) {
        if !self.is_known_group(id) {
            return;
        }
        self.expand.toggle(id);
        self.request_step(Step::Map);
    }

    /// Expand or collapse every group, recursively.
    pub fn expand_all(&mut self, expanded: bool) {
        self.expand.set_all(expanded);
        self.request_step(Step::Map);
    }

    fn is_known_group(&self, id: NodeId) -> bool {
        self.pipeline
            .tree()
            .index_of(id)
            .map_or(false, |index| self.pipeline.tree().node(index).is_group())
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Select by node identity. Unknown identities are a no-op: identities
    /// race against concurrent pipeline recomputation by design.
    pub fn select_node(&mut self, id: NodeId, additive: bool) {
        if self.pipeline.tree().index_of(id).is_none() {
            return;
        }
        let delta = self.selection.select(id, additive);
        self.apply_selection_delta(delta);
    }

    /// Select by display index. Out-of-range indices are a no-op.
    pub fn select_index(&mut self, index: usize, additive: bool) {
        let Some(id) = self.pipeline.id_at(index) else {
            return;
        };
        let delta = self.selection.select(id, additive);
        self.apply_selection_delta(delta);
    }

    pub fn clear_selection(&mut self) {
        let delta = self.selection.clear();
        self.apply_selection_delta(delta);
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selection.is_selected(id)
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    fn apply_selection_delta(&mut self, delta: SelectionDelta) {
        for (id, selected) in delta.changes {
            let display_index = self.pipeline.display_index_of(id);
            if let Some(index) = display_index {
                self.listeners.notify_selection(index, selected);
            }
            self.emit(GridEvent::SelectionChanged(SelectionChangedEvent {
                node: id,
                selected,
                display_index,
            }));
        }
    }

    // -------------------------------------------------------------------------
    // Row listeners
    // -------------------------------------------------------------------------

    /// Subscribe a listener at a display index. Out-of-range indices are a
    /// no-op, like selection: the index may already be stale.
    pub fn add_row_listener(&mut self, index: usize, listener: Box<dyn RowListener>) {
        if index >= self.pipeline.display_len() {
            return;
        }
        self.listeners.subscribe(index, listener);
    }

    /// Drop all listeners at a display index.
    pub fn remove_row_listeners(&mut self, index: usize) {
        self.listeners.unsubscribe(index);
    }

    // -------------------------------------------------------------------------
    // Paging
    // -------------------------------------------------------------------------

    /// Configure (or remove) an external datasource. Configuring one clears
    /// the store and fetches the first page.
    pub fn set_datasource(&mut self, datasource: Option<Box<dyn RowDatasource<R>>>) {
        let activating = datasource.is_some();
        self.paging.set_datasource(datasource);
        if activating {
            self.store.clear();
            self.request_step(Step::Everything);
            let first_page_end = self.paging.page_size().saturating_sub(1);
            self.ensure_range(0, first_page_end);
        }
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.paging.set_page_size(page_size);
    }

    pub fn paging_state(&self) -> PagingState {
        self.paging.state()
    }

    /// Make sure rows backing display range `[first, last]` are loaded,
    /// requesting missing ones from the datasource when idle.
    pub fn ensure_range(&mut self, first: usize, last: usize) {
        let fetch = self.paging.ensure_range(
            &self.store,
            first,
            last,
            &self.sort_specs,
            self.filter_model.quick_filter(),
        );
        match fetch {
            PageFetch::Completed { start, rows, total } => self.rows_received(start, rows, total),
            PageFetch::Started { .. } | PageFetch::None => {}
        }
    }

    /// Deliver a datasource response. Late responses are merged regardless;
    /// the pipeline pass below decides what is currently visible.
    pub fn rows_received(&mut self, start: usize, rows: Vec<R>, total: Option<usize>) {
        self.paging.complete();
        let count = rows.len();
        self.store.merge_rows(start, rows);
        if total.is_some() {
            self.store.set_total(total);
        }
        self.emit(GridEvent::RowsIngested(RowsIngestedEvent {
            start,
            count,
            total_known: self.store.total_known(),
        }));
        self.request_step(Step::Everything);
    }

    // -------------------------------------------------------------------------
    // Display access
    // -------------------------------------------------------------------------

    pub fn display_len(&self) -> usize {
        self.pipeline.display_len()
    }

    /// Row count for scroll sizing: the display length, extended by the
    /// datasource's known/seen row count while paging.
    pub fn virtual_row_count(&self) -> usize {
        if self.paging.is_active() {
            self.pipeline.display_len().max(self.store.virtual_count())
        } else {
            self.pipeline.display_len()
        }
    }

    pub fn node_id_at(&self, index: usize) -> Option<NodeId> {
        self.pipeline.id_at(index)
    }

    pub fn display_index_of(&self, id: NodeId) -> Option<usize> {
        self.pipeline.display_index_of(id)
    }

    /// Map-stage generation; changes whenever the display list is rebuilt.
    pub fn display_generation(&self) -> u64 {
        self.pipeline.generations().map
    }

    pub fn generations(&self) -> StageGenerations {
        self.pipeline.generations()
    }

    pub fn schema(&self) -> &GridSchema<R> {
        &self.schema
    }

    /// Everything a renderer needs to paint one display index.
    pub fn display_entry(&self, index: usize) -> Option<DisplayEntry<'_, R>> {
        let node = self.pipeline.node_at(index)?;
        let (group_field, group_key, data) = match &node.kind {
            NodeKind::Group { field, key } => (Some(field.as_str()), Some(key), None),
            NodeKind::Leaf { slot } => (None, None, self.store.row(*slot).map(|r| &r.data)),
        };
        Some(DisplayEntry {
            id: node.id,
            level: node.level,
            is_group: node.is_group(),
            group_field,
            group_key,
            data,
            aggregates: self.pipeline.aggregates().fields_for(node.id),
            expanded: node.is_group() && self.expand.is_expanded(node.id),
            selected: self.selection.is_selected(node.id),
        })
    }
}

impl<R> std::fmt::Debug for RowGrid<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowGrid")
            .field("display_len", &self.pipeline.display_len())
            .field("sort_specs", &self.sort_specs)
            .field("paging", &self.paging)
            .finish_non_exhaustive()
    }
}
