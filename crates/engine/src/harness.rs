//! Test harness for grid operations with event tracking.
//!
//! `GridHarness` wraps a `RowGrid` over a small fixed row type, wires an
//! event collector, and hands out probe row listeners, so scenario tests
//! can assert on notification counts without any rendering dependency.

use std::cell::RefCell;
use std::rc::Rc;

use crate::aggregate::AggFunc;
use crate::events::EventCollector;
use crate::grid::RowGrid;
use crate::listener::RowListener;
use crate::schema::{Column, GridSchema};

#[derive(Debug, Clone)]
pub struct TestRow {
    pub cat: &'static str,
    pub name: &'static str,
    pub v: f64,
}

pub fn row(cat: &'static str, name: &'static str, v: f64) -> TestRow {
    TestRow { cat, name, v }
}

/// What a probe listener observed at its index.
#[derive(Debug, Default)]
pub struct ProbeLog {
    pub selections: Vec<bool>,
    pub removed: usize,
}

struct Probe(Rc<RefCell<ProbeLog>>);

impl RowListener for Probe {
    fn selection_changed(&mut self, selected: bool) {
        self.0.borrow_mut().selections.push(selected);
    }

    fn row_removed(&mut self) {
        self.0.borrow_mut().removed += 1;
    }
}

pub struct GridHarness {
    pub grid: RowGrid<TestRow>,
    pub events: Rc<RefCell<EventCollector>>,
}

impl GridHarness {
    /// Flat grid (no grouping) over cat/name/v columns, v summed.
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Same columns, grouped by cat.
    pub fn grouped() -> Self {
        Self::build(true)
    }

    fn build(grouped: bool) -> Self {
        let mut schema = GridSchema::new(vec![
            Column::new("cat", |r: &TestRow| r.cat.into()),
            Column::new("name", |r: &TestRow| r.name.into()),
            Column::new("v", |r: &TestRow| r.v.into()).with_aggregate(AggFunc::Sum),
        ])
        .expect("fixed columns");
        if grouped {
            schema.set_group_fields(vec!["cat".into()]).expect("cat exists");
        }

        let events = Rc::new(RefCell::new(EventCollector::new()));
        let sink = events.clone();
        let mut grid = RowGrid::new(schema);
        grid.set_on_event(Box::new(move |event| sink.borrow_mut().push(event)));
        Self { grid, events }
    }

    /// Names in display order; group rows render as `[key]`.
    pub fn displayed(&self) -> Vec<String> {
        (0..self.grid.display_len())
            .map(|index| {
                let entry = self.grid.display_entry(index).expect("index in range");
                match (entry.data, entry.group_key) {
                    (Some(data), _) => data.name.to_string(),
                    (None, Some(key)) => format!("[{}]", key.display_string()),
                    _ => String::new(),
                }
            })
            .collect()
    }

    /// Subscribe a probe listener at a display index.
    pub fn probe(&mut self, index: usize) -> Rc<RefCell<ProbeLog>> {
        let log = Rc::new(RefCell::new(ProbeLog::default()));
        self.grid.add_row_listener(index, Box::new(Probe(log.clone())));
        log
    }
}
