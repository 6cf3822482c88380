use tokio::sync::watch;

use crate::cache::{CacheState, CategoryStore, SyncFailure};
use crate::models::Category;

use super::filter::{derive_view, StatusFilter, ViewFilter};

/// A derived view kept current by listening to the store.
///
/// Rows are recomputed whenever the cache changes or the filter is edited.
/// The cache itself is never touched.
pub struct LiveView {
    rx: watch::Receiver<CacheState>,
    filter: ViewFilter,
    rows: Vec<Category>,
    loading: bool,
    last_error: Option<SyncFailure>,
}

impl LiveView {
    pub fn new(store: &CategoryStore, filter: ViewFilter) -> Self {
        let mut view = Self {
            rx: store.subscribe(),
            filter,
            rows: Vec::new(),
            loading: false,
            last_error: None,
        };
        view.recompute();
        view
    }

    pub fn rows(&self) -> &[Category] {
        &self.rows
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Nothing to show; the renderer displays its empty-state message.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last_error(&self) -> Option<&SyncFailure> {
        self.last_error.as_ref()
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter.query = query.into();
        self.recompute();
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.filter.status = status;
        self.recompute();
    }

    /// Recompute if the cache changed since the last look.
    pub fn refresh(&mut self) -> bool {
        match self.rx.has_changed() {
            Ok(true) => {
                self.recompute();
                true
            }
            _ => false,
        }
    }

    fn recompute(&mut self) {
        let state = self.rx.borrow_and_update();
        self.rows = derive_view(state.records(), &self.filter);
        self.loading = state.is_loading();
        self.last_error = state.last_error().cloned();
    }
}
