//! Row listener registry: per-display-index subscriptions.
//!
//! Subscriptions are keyed by display index, not node identity. When a
//! flatten pass drops the node that was at an index, the registry fires
//! `row_removed` to that index's subscribers and discards the whole list —
//! re-subscribing after the row reappears at a new index is the caller's
//! responsibility.

use rustc_hash::FxHashMap;

/// Callbacks for one display index. Handlers default to no-ops so callers
/// implement only what they care about.
pub trait RowListener {
    /// The node at the subscribed index changed selection state.
    fn selection_changed(&mut self, _selected: bool) {}

    /// The node previously at the subscribed index left the display list.
    fn row_removed(&mut self) {}
}

#[derive(Default)]
pub struct RowListenerRegistry {
    by_index: FxHashMap<usize, Vec<Box<dyn RowListener>>>,
}

impl RowListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, display_index: usize, listener: Box<dyn RowListener>) {
        self.by_index.entry(display_index).or_default().push(listener);
    }

    /// Drop every listener at an index without firing anything.
    pub fn unsubscribe(&mut self, display_index: usize) {
        self.by_index.remove(&display_index);
    }

    pub fn has_listeners(&self, display_index: usize) -> bool {
        self.by_index.contains_key(&display_index)
    }

    /// Fire `selection_changed` at one index. Indices with no subscribers
    /// are a no-op.
    pub fn notify_selection(&mut self, display_index: usize, selected: bool) {
        if let Some(listeners) = self.by_index.get_mut(&display_index) {
            for listener in listeners {
                listener.selection_changed(selected);
            }
        }
    }

    /// Fire `row_removed` at one index and drop its subscription list.
    pub fn notify_removed(&mut self, display_index: usize) {
        if let Some(mut listeners) = self.by_index.remove(&display_index) {
            for listener in &mut listeners {
                listener.row_removed();
            }
        }
    }

    pub fn clear(&mut self) {
        self.by_index.clear();
    }
}

impl std::fmt::Debug for RowListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowListenerRegistry")
            .field("subscribed_indices", &self.by_index.len())
            .finish()
    }
}
