//! Paging adapter: lazily fills the row store from an external datasource.
//!
//! Explicit state machine: `NoDatasource -> Active (idle <-> loading)`.
//! While idle, a range request scans the store for missing slots, aligns
//! the gap to the page size, and issues exactly one outstanding request.
//! While loading, further range requests (including requests for indices
//! already in flight) are ignored, so a datasource never sees duplicate
//! calls for the same gap. There is no retry and no cancellation: a request
//! that never resolves leaves the range unfilled, and a late response is
//! merged regardless, with the next pipeline pass deciding visibility.

use rowgrid_core::sort::SortSpec;

use crate::store::RowStore;

/// A row range the grid needs, half-open, plus the view state the
/// datasource may use to order/filter server-side.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRangeRequest {
    pub start: usize,
    pub end: usize,
    pub sort: Vec<SortSpec>,
    pub quick_filter: Option<String>,
}

/// What a datasource does with a request.
pub enum DatasourceResponse<R> {
    /// Data is available now.
    Rows { rows: Vec<R>, total: Option<usize> },
    /// The datasource will deliver later via `rows_received`.
    Loading,
}

/// External row supplier. `get_rows` must not block; a source that needs
/// time returns `Loading` and the host completes the exchange by calling
/// the grid's `rows_received`.
pub trait RowDatasource<R> {
    fn get_rows(&mut self, request: &RowRangeRequest) -> DatasourceResponse<R>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingState {
    NoDatasource,
    Idle,
    Loading { start: usize, end: usize },
}

/// Outcome of `ensure_range`, for the grid to act on.
pub enum PageFetch<R> {
    /// No datasource, nothing missing, or a request already in flight.
    None,
    /// A request went out; rows will arrive via `rows_received`.
    Started { start: usize, end: usize },
    /// The datasource answered synchronously.
    Completed { start: usize, rows: Vec<R>, total: Option<usize> },
}

pub struct PagingAdapter<R> {
    datasource: Option<Box<dyn RowDatasource<R>>>,
    state: PagingState,
    page_size: usize,
}

impl<R> Default for PagingAdapter<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> PagingAdapter<R> {
    pub fn new() -> Self {
        Self { datasource: None, state: PagingState::NoDatasource, page_size: 100 }
    }

    pub fn set_datasource(&mut self, datasource: Option<Box<dyn RowDatasource<R>>>) {
        self.state = if datasource.is_some() {
            PagingState::Idle
        } else {
            PagingState::NoDatasource
        };
        self.datasource = datasource;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn state(&self) -> PagingState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != PagingState::NoDatasource
    }

    /// Request rows so that display range `[first, last]` is backed by the
    /// store, if a datasource is configured and nothing is in flight.
    pub fn ensure_range(
        &mut self,
        store: &RowStore<R>,
        first: usize,
        last: usize,
        sort: &[SortSpec],
        quick_filter: Option<&str>,
    ) -> PageFetch<R> {
        match self.state {
            PagingState::NoDatasource => return PageFetch::None,
            PagingState::Loading { start, end } => {
                // Single outstanding request; everything else waits for it
                log::trace!(
                    "paging request [{first},{last}] ignored, [{start},{end}) in flight"
                );
                return PageFetch::None;
            }
            PagingState::Idle => {}
        }

        let Some((gap_first, gap_last)) = missing_range(store, first, last) else {
            return PageFetch::None;
        };

        // Align the gap to page boundaries
        let mut start = gap_first - gap_first % self.page_size;
        let mut end = (gap_last / self.page_size + 1) * self.page_size;
        if let Some(total) = store.total_known() {
            end = end.min(total);
            start = start.min(end);
        }
        if start == end {
            return PageFetch::None;
        }

        let request = RowRangeRequest {
            start,
            end,
            sort: sort.to_vec(),
            quick_filter: quick_filter.map(str::to_string),
        };
        let Some(datasource) = self.datasource.as_mut() else {
            return PageFetch::None;
        };
        log::debug!("paging request [{start},{end})");
        match datasource.get_rows(&request) {
            DatasourceResponse::Rows { rows, total } => PageFetch::Completed { start, rows, total },
            DatasourceResponse::Loading => {
                self.state = PagingState::Loading { start, end };
                PageFetch::Started { start, end }
            }
        }
    }

    /// A response arrived (or the synchronous path completed): back to idle.
    pub fn complete(&mut self) {
        if matches!(self.state, PagingState::Loading { .. }) {
            self.state = PagingState::Idle;
        }
    }
}

impl<R> std::fmt::Debug for PagingAdapter<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagingAdapter")
            .field("state", &self.state)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

/// First and last missing store slot within `[first, last]`, clamped to the
/// known total when the datasource has reported one.
fn missing_range<R>(store: &RowStore<R>, first: usize, mut last: usize) -> Option<(usize, usize)> {
    if let Some(total) = store.total_known() {
        if total == 0 || first >= total {
            return None;
        }
        last = last.min(total - 1);
    }
    let missing: Vec<usize> = (first..=last).filter(|&i| store.row(i).is_none()).collect();
    let (&gap_first, &gap_last) = (missing.first()?, missing.last()?);
    Some((gap_first, gap_last))
}
