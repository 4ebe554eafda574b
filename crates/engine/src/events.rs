//! Event types for grid change notifications.
//!
//! These let the surrounding UI layer repaint without polling the model.
//! The grid has no rendering side effect of its own: after any pipeline
//! pass it emits `ModelUpdated` and the host decides whether to redraw.

use crate::node::NodeId;
use crate::pipeline::Step;

/// Events emitted by the grid facade.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    /// A pipeline pass completed.
    ModelUpdated(ModelUpdatedEvent),

    /// A node's selection membership changed.
    SelectionChanged(SelectionChangedEvent),

    /// A paging response was merged into the row store.
    RowsIngested(RowsIngestedEvent),
}

/// Emitted after every pipeline pass, including no-change passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelUpdatedEvent {
    /// The step that was requested.
    pub step: Step,
    /// Length of the new display list.
    pub display_len: usize,
    /// Map-stage generation that produced this display list.
    pub map_generation: u64,
    /// Whether the display list differs from the previous pass.
    pub display_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionChangedEvent {
    pub node: NodeId,
    pub selected: bool,
    /// The node's display index at notification time, if displayed.
    pub display_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowsIngestedEvent {
    /// Absolute offset the rows were merged at.
    pub start: usize,
    pub count: usize,
    /// Total row count if the datasource has reported one.
    pub total_known: Option<usize>,
}

/// Callback type for receiving grid events.
pub type EventCallback = Box<dyn FnMut(GridEvent)>;

/// Simple event collector for testing.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<GridEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: GridEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GridEvent] {
        &self.events
    }

    pub fn take(&mut self) -> Vec<GridEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn model_updates(&self) -> impl Iterator<Item = &ModelUpdatedEvent> {
        self.events.iter().filter_map(|e| match e {
            GridEvent::ModelUpdated(ev) => Some(ev),
            _ => None,
        })
    }

    pub fn selection_changes(&self) -> impl Iterator<Item = &SelectionChangedEvent> {
        self.events.iter().filter_map(|e| match e {
            GridEvent::SelectionChanged(ev) => Some(ev),
            _ => None,
        })
    }
}
