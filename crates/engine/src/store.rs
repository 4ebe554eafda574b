//! Row store: owns the raw row collection and assigns node identities.
//!
//! Slots are `Option` so a paging datasource can merge rows at an absolute
//! offset before earlier ranges have arrived. `set_rows` is the non-paged
//! path: it replaces everything and the slot vector is fully populated.

use crate::node::NodeId;

/// A raw record wrapped with its stable identity.
#[derive(Debug, Clone)]
pub struct StoredRow<R> {
    pub id: NodeId,
    pub data: R,
}

#[derive(Debug, Clone)]
pub struct RowStore<R> {
    slots: Vec<Option<StoredRow<R>>>,
    /// Next leaf id. Monotonically increasing, never reused.
    next_id: u64,
    /// Total row count reported by a datasource, if known.
    total_known: Option<usize>,
}

impl<R> Default for RowStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> RowStore<R> {
    pub fn new() -> Self {
        Self { slots: Vec::new(), next_id: 1, total_known: None }
    }

    fn take_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Replace the whole collection. Every row gets a fresh identity.
    pub fn set_rows(&mut self, rows: Vec<R>) {
        self.slots = rows
            .into_iter()
            .map(|data| {
                let id = self.next_id;
                self.next_id += 1;
                Some(StoredRow { id: NodeId(id), data })
            })
            .collect();
        self.total_known = Some(self.slots.len());
    }

    /// Merge rows at an absolute offset, growing the slot vector as needed.
    /// A row landing on an occupied slot keeps that slot's identity (value
    /// update); an empty slot gets a fresh identity.
    pub fn merge_rows(&mut self, start: usize, rows: Vec<R>) {
        let end = start + rows.len();
        if self.slots.len() < end {
            self.slots.resize_with(end, || None);
        }
        for (offset, data) in rows.into_iter().enumerate() {
            let idx = start + offset;
            match self.slots[idx].take() {
                Some(existing) => self.slots[idx] = Some(StoredRow { id: existing.id, data }),
                None => {
                    let id = self.take_id();
                    self.slots[idx] = Some(StoredRow { id, data });
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.total_known = None;
    }

    pub fn set_total(&mut self, total: Option<usize>) {
        self.total_known = total;
    }

    pub fn total_known(&self) -> Option<usize> {
        self.total_known
    }

    /// Row count to present to scrolling when a datasource may still owe us
    /// rows: the reported total when known, else "at least as many rows as
    /// the highest index seen so far".
    pub fn virtual_count(&self) -> usize {
        match self.total_known {
            Some(total) => total.max(self.slots.len()),
            None => self.slots.len(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn row(&self, slot: usize) -> Option<&StoredRow<R>> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Present rows in slot order.
    pub fn iter_present(&self) -> impl Iterator<Item = (usize, &StoredRow<R>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, row)| row.as_ref().map(|r| (slot, r)))
    }
}
