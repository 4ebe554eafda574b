//! Selection tracker: the set of selected node identities.
//!
//! Selection is by node id, so it survives re-sort and re-filter. Mutations
//! return the delta (ids whose membership changed) so the owner can notify
//! row listeners and emit events without the tracker knowing about either.

use rustc_hash::FxHashSet;

use crate::node::NodeId;

/// Membership changes from one selection operation, in notification order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionDelta {
    /// (id, now_selected) pairs.
    pub changes: Vec<(NodeId, bool)>,
}

impl SelectionDelta {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    selected: FxHashSet<NodeId>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a node. Non-additive selection clears everything else first;
    /// additive selection toggles the node without touching others.
    pub fn select(&mut self, id: NodeId, additive: bool) -> SelectionDelta {
        let mut delta = SelectionDelta::default();

        if additive {
            if self.selected.remove(&id) {
                delta.changes.push((id, false));
            } else {
                self.selected.insert(id);
                delta.changes.push((id, true));
            }
            return delta;
        }

        for &other in self.selected.iter().filter(|&&other| other != id) {
            delta.changes.push((other, false));
        }
        self.selected.retain(|&other| other == id);
        if self.selected.insert(id) {
            delta.changes.push((id, true));
        }
        delta
    }

    pub fn clear(&mut self) -> SelectionDelta {
        let mut delta = SelectionDelta::default();
        for &id in &self.selected {
            delta.changes.push((id, false));
        }
        self.selected.clear();
        delta
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selected.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.selected.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_selection_replaces() {
        let mut tracker = SelectionTracker::new();
        tracker.select(NodeId(1), false);
        let delta = tracker.select(NodeId(2), false);

        assert!(tracker.is_selected(NodeId(2)));
        assert!(!tracker.is_selected(NodeId(1)));
        assert_eq!(tracker.len(), 1);
        assert!(delta.changes.contains(&(NodeId(1), false)));
        assert!(delta.changes.contains(&(NodeId(2), true)));
    }

    #[test]
    fn test_reselect_same_node_is_noop() {
        let mut tracker = SelectionTracker::new();
        tracker.select(NodeId(1), false);
        let delta = tracker.select(NodeId(1), false);
        assert!(delta.is_empty());
        assert!(tracker.is_selected(NodeId(1)));
    }

    #[test]
    fn test_additive_toggles_membership() {
        let mut tracker = SelectionTracker::new();
        tracker.select(NodeId(1), false);

        let delta = tracker.select(NodeId(2), true);
        assert_eq!(delta.changes, vec![(NodeId(2), true)]);
        assert_eq!(tracker.len(), 2);

        let delta = tracker.select(NodeId(2), true);
        assert_eq!(delta.changes, vec![(NodeId(2), false)]);
        assert!(tracker.is_selected(NodeId(1)));
    }

    #[test]
    fn test_clear_reports_all_removed() {
        let mut tracker = SelectionTracker::new();
        tracker.select(NodeId(1), true);
        tracker.select(NodeId(2), true);

        let delta = tracker.clear();
        assert_eq!(delta.changes.len(), 2);
        assert!(delta.changes.iter().all(|&(_, selected)| !selected));
        assert!(tracker.is_empty());
    }
}
