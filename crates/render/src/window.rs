//! Window renderer: keeps a live row-view pool in sync with the viewport.
//!
//! `draw_visible_rows` reconciles the bound views against the clamped
//! visible range: views whose index left the range reset and return to a
//! reuse pool (dropped beyond the retention bound), newly visible indices
//! take a pooled or freshly created view, and indices that are already
//! correctly bound are left alone. Work per call is proportional to the
//! visible range plus the old/new range difference — never to the total
//! row count. When the display list itself changed (tracked through the
//! map-stage generation) every in-range index rebinds, since the node at
//! an unchanged index may differ.
//!
//! Call sites: scroll position change, viewport resize, and every pipeline
//! pass that touched the display list.

use rowgrid_engine::grid::{DisplayEntry, RowGrid};
use rustc_hash::FxHashMap;

use crate::viewport::Viewport;

/// A recyclable rendering handle, bound to one display index at a time.
/// Implementations paint through whatever toolkit hosts the grid.
pub trait RowView<R> {
    /// Attach this view to the row at `index`.
    fn bind(&mut self, index: usize, entry: &DisplayEntry<'_, R>);

    /// Detach and clear transient state before pooling.
    fn reset(&mut self);
}

pub struct WindowRenderer<V> {
    bound: FxHashMap<usize, V>,
    pool: Vec<V>,
    pool_retention: usize,
    last_generation: Option<u64>,
}

impl<V> Default for WindowRenderer<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> WindowRenderer<V> {
    pub fn new() -> Self {
        Self { bound: FxHashMap::default(), pool: Vec::new(), pool_retention: 32, last_generation: None }
    }

    /// Cap on idle views kept for reuse; released views beyond it drop.
    pub fn with_pool_retention(mut self, retention: usize) -> Self {
        self.pool_retention = retention;
        self
    }

    /// Reconcile the view pool against the current viewport and display
    /// list. `create` is called only when the reuse pool is empty.
    pub fn draw_visible_rows<R>(
        &mut self,
        viewport: &Viewport,
        grid: &RowGrid<R>,
        mut create: impl FnMut() -> V,
    ) where
        V: RowView<R>,
    {
        let generation = grid.display_generation();
        let rebind_all = self.last_generation != Some(generation);
        self.last_generation = Some(generation);

        let Some((first, last)) = viewport.visible_range(grid.display_len()) else {
            // Empty display list: zero bound views
            let indices: Vec<usize> = self.bound.keys().copied().collect();
            for index in indices {
                self.release(index);
            }
            return;
        };

        let stale: Vec<usize> = self
            .bound
            .keys()
            .copied()
            .filter(|&index| index < first || index > last)
            .collect();
        for index in stale {
            self.release(index);
        }

        let mut created = 0usize;
        let mut rebound = 0usize;
        for index in first..=last {
            if !rebind_all && self.bound.contains_key(&index) {
                continue;
            }
            let Some(entry) = grid.display_entry(index) else {
                continue;
            };
            let mut view = match self.bound.remove(&index) {
                Some(view) => view,
                None => self.pool.pop().unwrap_or_else(|| {
                    created += 1;
                    create()
                }),
            };
            view.bind(index, &entry);
            self.bound.insert(index, view);
            rebound += 1;
        }

        log::trace!(
            "window [{first},{last}] bound={} rebound={rebound} created={created}",
            self.bound.len()
        );
    }

    fn release<R>(&mut self, index: usize)
    where
        V: RowView<R>,
    {
        if let Some(mut view) = self.bound.remove(&index) {
            view.reset();
            if self.pool.len() < self.pool_retention {
                self.pool.push(view);
            }
        }
    }

    /// Force a full rebind on the next draw (e.g. after a cheap aggregates
    /// refresh that does not change the display list).
    pub fn invalidate(&mut self) {
        self.last_generation = None;
    }

    /// Tear down: destroy every live and pooled view.
    pub fn clear(&mut self) {
        self.bound.clear();
        self.pool.clear();
        self.last_generation = None;
    }

    pub fn bound_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.bound.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }

    pub fn pooled_count(&self) -> usize {
        self.pool.len()
    }
}

impl<V> std::fmt::Debug for WindowRenderer<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowRenderer")
            .field("bound", &self.bound.len())
            .field("pooled", &self.pool.len())
            .field("pool_retention", &self.pool_retention)
            .finish()
    }
}
