use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use indicatif::ProgressBar;

use crate::loader::{Artwork, FetchError, Page, PageLoader, Pagination, RecordId};
use crate::reconciler::RecordStatus;
use crate::session::{LoadOutcome, SessionError, TableSession};

const PAGE_SIZE: usize = 12;
const TOTAL: usize = 100;

// ids are 5000 + global position
#[derive(Clone, Default)]
struct FakeCatalog {
    failing: Arc<Mutex<HashSet<u32>>>,
    requests: Arc<Mutex<Vec<u32>>>,
}

impl FakeCatalog {
    fn fail(&self, page: u32) {
        self.failing.lock().unwrap().insert(page);
    }

    fn heal(&self, page: u32) {
        self.failing.lock().unwrap().remove(&page);
    }

    fn requests(&self) -> Vec<u32> {
        self.requests.lock().unwrap().clone()
    }

    fn build(page: u32) -> Result<Page, FetchError> {
        if page == 0 {
            return Err(FetchError::InvalidPage { page });
        }
        let start = (page as usize - 1) * PAGE_SIZE;
        let end = (start + PAGE_SIZE).min(TOTAL);
        let records = (start..end.max(start))
            .map(|p| Artwork::new(id_at(p), format!("work {p}")))
            .collect();
        Ok(Page {
            number: page,
            records,
            pagination: Pagination {
                total: TOTAL,
                limit: PAGE_SIZE,
                offset: start,
                total_pages: TOTAL.div_ceil(PAGE_SIZE) as u32,
                current_page: page,
            },
        })
    }
}

impl PageLoader for FakeCatalog {
    fn load_page(&self, page: u32) -> impl Future<Output = Result<Page, FetchError>> + Send {
        self.requests.lock().unwrap().push(page);
        let result = if self.failing.lock().unwrap().contains(&page) {
            Err(FetchError::Status {
                status: 503,
                url: format!("fake://artworks?page={page}"),
            })
        } else {
            FakeCatalog::build(page)
        };
        async move { result }
    }
}

fn id_at(position: usize) -> RecordId {
    5000 + position as RecordId
}

fn selected_positions<L: PageLoader>(session: &TableSession<L>) -> Vec<usize> {
    session
        .view()
        .unwrap()
        .rows
        .iter()
        .filter(|r| r.selected)
        .map(|r| r.position)
        .collect()
}

async fn session_on(page: u32) -> (TableSession<FakeCatalog>, FakeCatalog) {
    let catalog = FakeCatalog::default();
    let mut session = TableSession::new(catalog.clone());
    assert!(session.load_page(page).await.is_applied());
    (session, catalog)
}

#[tokio::test]
async fn bulk_fifteen_then_deselect_survives_navigation() {
    let (mut session, _) = session_on(1).await;
    session.on_bulk_select(15);
    assert_eq!(selected_positions(&session), (0..12).collect::<Vec<_>>());

    session.load_page(2).await;
    assert_eq!(selected_positions(&session), vec![12, 13, 14]);

    session.load_page(1).await;
    session.toggle_row(id_at(5)).unwrap();
    let expected: Vec<usize> = (0..12).filter(|p| *p != 5).collect();
    assert_eq!(selected_positions(&session), expected);

    session.load_page(3).await;
    assert!(selected_positions(&session).is_empty());
    session.load_page(1).await;
    assert_eq!(selected_positions(&session), expected);

    let view = session.view().unwrap();
    assert_eq!(view.rows[5].status, RecordStatus::BulkExcluded);
    assert_eq!(view.selected_total, 14);
}

#[tokio::test]
async fn clearing_bulk_keeps_manual_rows() {
    let (mut session, _) = session_on(1).await;
    session.on_bulk_select(15);
    assert!(session.on_bulk_select(0));
    assert!(selected_positions(&session).is_empty());
    session.load_page(2).await;
    assert!(selected_positions(&session).is_empty());

    session.set_rows(&[id_at(20)], true).unwrap();
    session.on_bulk_select(15);
    session.on_bulk_select(0);
    session.load_page(1).await;
    session.load_page(2).await;
    assert_eq!(selected_positions(&session), vec![20]);
}

#[tokio::test]
async fn bulk_window_matches_every_page() {
    let (mut session, _) = session_on(1).await;
    session.on_bulk_select(30);
    let mut all = Vec::new();
    for page in 1..=9 {
        session.load_page(page).await;
        all.extend(selected_positions(&session));
    }
    assert_eq!(all, (0..30).collect::<Vec<_>>());
}

#[tokio::test]
async fn failed_load_keeps_previous_page_and_state() {
    let (mut session, catalog) = session_on(2).await;
    session.on_bulk_select(20);
    session.toggle_row(id_at(13)).unwrap();
    let before = session.state().clone();

    catalog.fail(3);
    let outcome = session.load_page(3).await;
    assert!(matches!(outcome, LoadOutcome::Failed(FetchError::Status { status: 503, .. })));
    assert_eq!(session.page().unwrap().number, 2);
    assert_eq!(session.state(), &before);
    assert_eq!(session.last_error().unwrap().page, 3);
    assert!(!session.is_loading());

    catalog.heal(3);
    assert!(session.reload().await.unwrap().is_applied());
    assert_eq!(session.page().unwrap().number, 2);
    assert!(session.last_error().is_none());
}

#[tokio::test]
async fn stale_response_is_discarded() {
    let catalog = FakeCatalog::default();
    let mut session = TableSession::new(catalog.clone());

    let slow = session.begin_load(2);
    let fast = session.begin_load(3);
    let fast_result = catalog.load_page(3).await;
    assert!(session.finish_load(fast, fast_result).is_applied());

    let slow_result = catalog.load_page(2).await;
    assert!(matches!(session.finish_load(slow, slow_result), LoadOutcome::Stale));
    assert_eq!(session.page().unwrap().number, 3);
}

#[tokio::test]
async fn stale_failure_does_not_record_error() {
    let catalog = FakeCatalog::default();
    let mut session = TableSession::new(catalog.clone());
    let old = session.begin_load(4);
    let new = session.begin_load(1);
    assert!(matches!(
        session.finish_load(old, Err(FetchError::InvalidPage { page: 4 })),
        LoadOutcome::Stale
    ));
    assert!(session.last_error().is_none());
    assert!(session.is_loading());
    let result = catalog.load_page(1).await;
    assert!(session.finish_load(new, result).is_applied());
    assert!(!session.is_loading());
}

#[tokio::test]
async fn navigation_is_bounded() {
    let catalog = FakeCatalog::default();
    let mut session = TableSession::new(catalog);
    assert_eq!(session.next_page().await.unwrap_err(), SessionError::NoPageLoaded);

    session.load_page(1).await;
    assert_eq!(session.prev_page().await.unwrap_err(), SessionError::NoPreviousPage);
    assert!(session.next_page().await.unwrap().is_applied());
    assert_eq!(session.page().unwrap().number, 2);

    session.load_page(9).await;
    assert_eq!(session.page().unwrap().records.len(), 4);
    assert_eq!(session.next_page().await.unwrap_err(), SessionError::NoNextPage);
}

#[tokio::test]
async fn edits_outside_visible_page_are_rejected_or_ignored() {
    let (mut session, _) = session_on(1).await;
    assert_eq!(
        session.toggle_row(id_at(40)).unwrap_err(),
        SessionError::NotOnPage { id: id_at(40) }
    );
    let ids = HashSet::from([id_at(40), id_at(2)]);
    assert!(session.on_selection_change(&ids).unwrap());
    assert_eq!(selected_positions(&session), vec![2]);
    assert_eq!(session.state().manual_count(), 1);
}

#[tokio::test]
async fn select_and_clear_page() {
    let (mut session, _) = session_on(4).await;
    session.select_page().unwrap();
    assert_eq!(selected_positions(&session), (36..48).collect::<Vec<_>>());
    session.load_page(5).await;
    assert!(selected_positions(&session).is_empty());
    session.load_page(4).await;
    session.clear_page().unwrap();
    assert!(selected_positions(&session).is_empty());
    assert_eq!(session.state().manual_count(), 0);
}

#[tokio::test]
async fn mutations_bump_revision() {
    let (mut session, _) = session_on(1).await;
    let mut rx = session.subscribe();
    let start = *rx.borrow_and_update();

    session.on_bulk_select(5);
    assert!(rx.has_changed().unwrap());
    let after_bulk = *rx.borrow_and_update();
    assert!(after_bulk > start);

    assert!(!session.on_bulk_select(5));
    assert!(!rx.has_changed().unwrap());

    session.toggle_row(id_at(7)).unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(session.revision(), *rx.borrow_and_update());
}

#[tokio::test]
async fn materialize_fetches_window_pages_sequentially() {
    let (mut session, catalog) = session_on(2).await;
    session.on_bulk_select(15);
    session.toggle_row(id_at(13)).unwrap();
    session.load_page(5).await;
    session.set_rows(&[id_at(50)], true).unwrap();
    session.load_page(2).await;

    let before = catalog.requests().len();
    let selected = session
        .materialize_selection(&ProgressBar::hidden())
        .await
        .unwrap();
    // page 2 is visible and reused, only page 1 is fetched
    assert_eq!(&catalog.requests()[before..], &[1]);

    let positions: Vec<usize> = selected.iter().map(|s| s.position).collect();
    let mut expected: Vec<usize> = (0..15).filter(|p| *p != 13).collect();
    expected.push(50);
    assert_eq!(positions, expected);
    assert_eq!(selected.len(), session.view().unwrap().selected_total);
}

#[tokio::test]
async fn materialize_failure_is_reported() {
    let (mut session, catalog) = session_on(1).await;
    session.on_bulk_select(30);
    catalog.fail(3);
    let pb = ProgressBar::hidden();
    let err = session.materialize_selection(&pb).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 503, .. }));
    assert!(pb.is_finished());
    assert_eq!(session.state().bulk_target(), 30);
}

#[tokio::test]
async fn materialize_without_bulk_returns_manual_rows_only() {
    let (mut session, catalog) = session_on(3).await;
    session.set_rows(&[id_at(30), id_at(25)], true).unwrap();
    let before = catalog.requests().len();
    let selected = session
        .materialize_selection(&ProgressBar::hidden())
        .await
        .unwrap();
    assert_eq!(catalog.requests().len(), before);
    let ids: Vec<RecordId> = selected.iter().map(|s| s.record.id).collect();
    assert_eq!(ids, vec![id_at(25), id_at(30)]);
}
