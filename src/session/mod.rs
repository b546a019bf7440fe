use std::collections::HashSet;

use indicatif::ProgressBar;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::loader::{Artwork, FetchError, Page, PageLoader, RecordId};
use crate::reconciler::{RecordStatus, SelectedRecord, SelectionState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no page has been loaded yet")]
    NoPageLoaded,

    #[error("already on the last page")]
    NoNextPage,

    #[error("already on the first page")]
    NoPreviousPage,

    #[error("record {id} is not on the visible page")]
    NotOnPage { id: RecordId },
}

// only the newest ticket may replace the visible page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageTicket {
    pub page: u32,
    generation: u64,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Applied,
    Stale,
    Failed(FetchError),
}

impl LoadOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    pub page: u32,
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RowView {
    pub position: usize,
    pub selected: bool,
    pub status: RecordStatus,
    pub record: Artwork,
}

#[derive(Clone, Debug, Serialize)]
pub struct PageView {
    pub page: u32,
    pub total_pages: u32,
    pub total_records: usize,
    pub page_size: usize,
    pub bulk_target: usize,
    pub selected_on_page: usize,
    pub selected_total: usize,
    pub loading: Option<u32>,
    pub error: Option<LoadFailure>,
    pub rows: Vec<RowView>,
}

pub struct TableSession<L> {
    loader: L,
    state: SelectionState,
    page: Option<Page>,
    loading: Option<u32>,
    last_error: Option<LoadFailure>,
    generation: u64,
    revision: watch::Sender<u64>,
}

impl<L: PageLoader> TableSession<L> {
    pub fn new(loader: L) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            loader,
            state: SelectionState::new(),
            page: None,
            loading: None,
            last_error: None,
            generation: 0,
            revision,
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    pub fn last_error(&self) -> Option<&LoadFailure> {
        self.last_error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn notify(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    pub fn begin_load(&mut self, page: u32) -> PageTicket {
        self.generation += 1;
        self.loading = Some(page);
        self.notify();
        PageTicket {
            page,
            generation: self.generation,
        }
    }

    pub fn finish_load(
        &mut self,
        ticket: PageTicket,
        result: Result<Page, FetchError>,
    ) -> LoadOutcome {
        if ticket.generation != self.generation {
            debug!(
                page = ticket.page,
                latest = ?self.loading,
                "discarding stale page response"
            );
            return LoadOutcome::Stale;
        }
        self.loading = None;
        let outcome = match result {
            Ok(page) => {
                debug!(
                    page = page.number,
                    records = page.records.len(),
                    "page applied"
                );
                self.page = Some(page);
                self.last_error = None;
                LoadOutcome::Applied
            }
            Err(e) => {
                warn!(page = ticket.page, error = %e, "page load failed");
                self.last_error = Some(LoadFailure {
                    page: ticket.page,
                    message: e.to_string(),
                });
                LoadOutcome::Failed(e)
            }
        };
        self.notify();
        outcome
    }

    pub async fn load_page(&mut self, page: u32) -> LoadOutcome {
        let ticket = self.begin_load(page);
        let result = self.loader.load_page(page).await;
        self.finish_load(ticket, result)
    }

    pub async fn next_page(&mut self) -> Result<LoadOutcome, SessionError> {
        let page = self.page.as_ref().ok_or(SessionError::NoPageLoaded)?;
        if page.number >= page.pagination.total_pages {
            return Err(SessionError::NoNextPage);
        }
        let target = page.number + 1;
        Ok(self.load_page(target).await)
    }

    pub async fn prev_page(&mut self) -> Result<LoadOutcome, SessionError> {
        let page = self.page.as_ref().ok_or(SessionError::NoPageLoaded)?;
        if page.number <= 1 {
            return Err(SessionError::NoPreviousPage);
        }
        let target = page.number - 1;
        Ok(self.load_page(target).await)
    }

    pub async fn reload(&mut self) -> Result<LoadOutcome, SessionError> {
        let target = self
            .page
            .as_ref()
            .map(|p| p.number)
            .or(self.last_error.as_ref().map(|e| e.page))
            .ok_or(SessionError::NoPageLoaded)?;
        Ok(self.load_page(target).await)
    }

    pub fn visible_selection(&self) -> HashSet<RecordId> {
        match self.page.as_ref() {
            Some(page) => self
                .state
                .compute_visible_selection(&page.records, page.global_start_index()),
            None => HashSet::new(),
        }
    }

    pub fn on_selection_change(&mut self, ids: &HashSet<RecordId>) -> Result<bool, SessionError> {
        let page = self.page.as_ref().ok_or(SessionError::NoPageLoaded)?;
        let foreign: Vec<RecordId> = ids.iter().copied().filter(|id| !page.contains(*id)).collect();
        if !foreign.is_empty() {
            debug!(?foreign, "ignoring ids outside the visible page");
        }
        let changed =
            self.state
                .apply_row_edits(ids, &page.records, page.global_start_index());
        if changed {
            self.notify();
        }
        Ok(changed)
    }

    pub fn on_bulk_select(&mut self, n: usize) -> bool {
        let changed = self.state.apply_bulk_select(n);
        if changed {
            info!(bulk_target = n, "bulk selection updated");
            self.notify();
        }
        changed
    }

    pub fn toggle_row(&mut self, id: RecordId) -> Result<bool, SessionError> {
        self.require_on_page(&[id])?;
        let mut ids = self.visible_selection();
        if !ids.remove(&id) {
            ids.insert(id);
        }
        self.on_selection_change(&ids)
    }

    pub fn set_rows(&mut self, rows: &[RecordId], selected: bool) -> Result<bool, SessionError> {
        self.require_on_page(rows)?;
        let mut ids = self.visible_selection();
        for id in rows {
            if selected {
                ids.insert(*id);
            } else {
                ids.remove(id);
            }
        }
        self.on_selection_change(&ids)
    }

    pub fn select_page(&mut self) -> Result<bool, SessionError> {
        let page = self.page.as_ref().ok_or(SessionError::NoPageLoaded)?;
        let ids: HashSet<RecordId> = page.ids().collect();
        self.on_selection_change(&ids)
    }

    pub fn clear_page(&mut self) -> Result<bool, SessionError> {
        self.on_selection_change(&HashSet::new())
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = self.state.clear();
        if changed {
            info!("selection cleared");
            self.notify();
        }
        changed
    }

    fn require_on_page(&self, ids: &[RecordId]) -> Result<(), SessionError> {
        let page = self.page.as_ref().ok_or(SessionError::NoPageLoaded)?;
        match ids.iter().find(|id| !page.contains(**id)) {
            Some(id) => Err(SessionError::NotOnPage { id: *id }),
            None => Ok(()),
        }
    }

    pub fn view(&self) -> Option<PageView> {
        let page = self.page.as_ref()?;
        let start = page.global_start_index();
        let rows: Vec<RowView> = page
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let status = self.state.status_of(record.id, start + i);
                RowView {
                    position: start + i,
                    selected: status.is_selected(),
                    status,
                    record: record.clone(),
                }
            })
            .collect();
        Some(PageView {
            page: page.number,
            total_pages: page.pagination.total_pages,
            total_records: page.pagination.total,
            page_size: page.pagination.limit,
            bulk_target: self.state.bulk_target(),
            selected_on_page: rows.iter().filter(|r| r.selected).count(),
            selected_total: self.state.selected_count(page.pagination.total),
            loading: self.loading,
            error: self.last_error.clone(),
            rows,
        })
    }

    // pages are fetched one at a time; canonical state is left as is
    pub async fn materialize_selection(
        &self,
        progress: &ProgressBar,
    ) -> Result<Vec<SelectedRecord>, FetchError> {
        let window = self.state.bulk_target();
        let mut out: Vec<SelectedRecord> = Vec::new();
        let mut emitted: HashSet<RecordId> = HashSet::new();

        if window > 0 {
            let mut number = 1u32;
            loop {
                let fetched;
                let page = match self.page.as_ref().filter(|p| p.number == number) {
                    Some(visible) => visible,
                    None => match self.loader.load_page(number).await {
                        Ok(loaded) => {
                            fetched = loaded;
                            &fetched
                        }
                        Err(e) => {
                            progress.finish_and_clear();
                            return Err(e);
                        }
                    },
                };
                let limit = page.pagination.limit.max(1);
                let pages_needed = window
                    .min(page.pagination.total)
                    .div_ceil(limit)
                    .max(1) as u64;
                progress.set_length(pages_needed);

                let start = page.global_start_index();
                for (i, record) in page.records.iter().enumerate() {
                    let position = start + i;
                    if self.state.is_selected(record.id, position) && emitted.insert(record.id) {
                        out.push(SelectedRecord {
                            record: record.clone(),
                            position,
                        });
                    }
                }
                progress.inc(1);

                let next_start = start + limit;
                if page.records.is_empty()
                    || next_start >= window
                    || number >= page.pagination.total_pages
                {
                    break;
                }
                number += 1;
            }
        }
        progress.finish_and_clear();

        for manual in self.state.manual_selections() {
            if emitted.insert(manual.record.id) {
                out.push(manual.clone());
            }
        }
        debug!(records = out.len(), "selection materialized");
        Ok(out)
    }
}
