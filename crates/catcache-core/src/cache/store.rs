use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiError, CategoryRemote, ErrorKind, Operation};
use crate::models::{Category, CategoryInput, CategoryStatus, EmptyNameError};
use crate::utils::format_age;

/// A failed operation as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub operation: Operation,
    pub kind: ErrorKind,
    pub message: String,
}

impl SyncFailure {
    fn new(operation: Operation, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid input: {0}")]
    Invalid(#[from] EmptyNameError),

    #[error("{operation} failed: {source}")]
    Remote {
        operation: Operation,
        #[source]
        source: ApiError,
    },

    /// The mutation was applied server-side but the follow-up read failed,
    /// so the cache still holds the collection from before it.
    #[error("{operation} succeeded but refreshing the collection failed: {source}")]
    Refetch {
        operation: Operation,
        #[source]
        source: ApiError,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Invalid(_) => ErrorKind::Validation,
            StoreError::Remote { source, .. } | StoreError::Refetch { source, .. } => source.kind(),
        }
    }
}

/// The client-side copy of the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheState {
    records: Vec<Category>,
    pending_reads: usize,
    /// Ticket of the read whose result `records` holds.
    applied_ticket: u64,
    synced_at: Option<DateTime<Utc>>,
    last_error: Option<SyncFailure>,
}

impl CacheState {
    /// Records in server response order.
    pub fn records(&self) -> &[Category] {
        &self.records
    }

    /// True while any read is outstanding.
    pub fn is_loading(&self) -> bool {
        self.pending_reads > 0
    }

    pub fn synced_at(&self) -> Option<DateTime<Utc>> {
        self.synced_at
    }

    /// Most recent failure, cleared by the next successful read.
    pub fn last_error(&self) -> Option<&SyncFailure> {
        self.last_error.as_ref()
    }

    pub fn age_minutes(&self) -> Option<i64> {
        self.synced_at.map(|at| (Utc::now() - at).num_minutes())
    }

    pub fn age_display(&self) -> String {
        match self.age_minutes() {
            Some(minutes) => format_age(minutes),
            None => "never".to_string(),
        }
    }

    /// Never synced, or last synced more than `max_age_minutes` ago.
    pub fn is_stale(&self, max_age_minutes: i64) -> bool {
        self.age_minutes()
            .map_or(true, |minutes| minutes > max_age_minutes)
    }
}

/// Marks a read as outstanding until finished or dropped.
struct PendingRead<'a> {
    state: &'a watch::Sender<CacheState>,
    finished: bool,
}

impl<'a> PendingRead<'a> {
    fn begin(state: &'a watch::Sender<CacheState>) -> Self {
        state.send_modify(|s| s.pending_reads += 1);
        Self {
            state,
            finished: false,
        }
    }

    /// Clear the loading mark and apply `update` in one state change.
    fn finish(mut self, update: impl FnOnce(&mut CacheState)) {
        self.finished = true;
        self.state.send_modify(|s| {
            s.pending_reads = s.pending_reads.saturating_sub(1);
            update(s);
        });
    }
}

impl Drop for PendingRead<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state
                .send_modify(|s| s.pending_reads = s.pending_reads.saturating_sub(1));
        }
    }
}

/// Owner of the cached collection.
///
/// Every mutation goes to the server first and is followed by a full read
/// (reconcile-by-refetch); `records` is only ever replaced wholesale by a
/// read result. Overlapping operations are not serialized, but reads are
/// ticketed: a result is applied only if no later-issued read has already
/// been applied.
pub struct CategoryStore {
    remote: Arc<dyn CategoryRemote>,
    state: watch::Sender<CacheState>,
    next_ticket: AtomicU64,
}

impl CategoryStore {
    pub fn new(remote: Arc<dyn CategoryRemote>) -> Self {
        let (state, _) = watch::channel(CacheState::default());
        Self {
            remote,
            state,
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<CacheState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CacheState {
        self.state.borrow().clone()
    }

    pub fn records(&self) -> Vec<Category> {
        self.state.borrow().records.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    // ===== Reads =====

    /// Replace the cache with the full collection.
    pub async fn load(&self) -> Result<(), StoreError> {
        self.read(Operation::List, self.remote.list_all()).await
    }

    /// Load only if the cache is older than `max_age_minutes`.
    /// Returns whether a load ran.
    pub async fn ensure_fresh(&self, max_age_minutes: i64) -> Result<bool, StoreError> {
        if !self.state.borrow().is_stale(max_age_minutes) {
            debug!(max_age_minutes, "Cache is fresh, skipping load");
            return Ok(false);
        }
        self.load().await?;
        Ok(true)
    }

    /// Replace the cache with the server's search results.
    pub async fn search_remote(&self, query: &str) -> Result<(), StoreError> {
        self.read(Operation::Search, self.remote.search(query)).await
    }

    /// Replace the cache with the server's status-filtered collection.
    pub async fn filter_remote(&self, status: CategoryStatus) -> Result<(), StoreError> {
        self.read(Operation::Filter, self.remote.filter_by_status(status))
            .await
    }

    async fn read<F>(&self, operation: Operation, fetch: F) -> Result<(), StoreError>
    where
        F: Future<Output = Result<Vec<Category>, ApiError>>,
    {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let pending = PendingRead::begin(&self.state);
        debug!(%operation, ticket, "Read started");

        match fetch.await {
            Ok(records) => {
                let count = records.len();
                let mut applied = false;
                pending.finish(|state| {
                    if ticket > state.applied_ticket {
                        state.records = records;
                        state.applied_ticket = ticket;
                        state.synced_at = Some(Utc::now());
                        state.last_error = None;
                        applied = true;
                    }
                });
                if applied {
                    info!(%operation, count, "Collection synced");
                } else {
                    debug!(%operation, ticket, "Discarding response superseded by a newer read");
                }
                Ok(())
            }
            Err(source) => {
                let failure = SyncFailure::new(operation, source.kind(), source.to_string());
                pending.finish(|state| state.last_error = Some(failure));
                warn!(%operation, error = %source, "Read failed, keeping cached records");
                Err(StoreError::Remote { operation, source })
            }
        }
    }

    // ===== Mutations =====

    /// Create a category, then refetch. Returns the server's record if the
    /// response carried one.
    pub async fn create(&self, input: &CategoryInput) -> Result<Option<Category>, StoreError> {
        self.check_input(Operation::Create, input)?;
        let created = self
            .remote
            .create(input)
            .await
            .map_err(|source| self.fail(Operation::Create, source))?;
        match &created {
            Some(category) => info!(id = category.id, name = %category.name, "Category created"),
            None => info!(name = %input.name, "Category created"),
        }

        self.reconcile(Operation::Create).await?;
        Ok(created)
    }

    /// Update a category, then refetch. Returns the server's record if the
    /// response carried one.
    pub async fn update(
        &self,
        id: i64,
        input: &CategoryInput,
    ) -> Result<Option<Category>, StoreError> {
        self.check_input(Operation::Update, input)?;
        let updated = self
            .remote
            .update(id, input)
            .await
            .map_err(|source| self.fail(Operation::Update, source))?;
        info!(id, name = %input.name, "Category updated");

        self.reconcile(Operation::Update).await?;
        Ok(updated)
    }

    /// Delete a category, then refetch.
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.remote
            .delete(id)
            .await
            .map_err(|source| self.fail(Operation::Delete, source))?;
        info!(id, "Category deleted");

        self.reconcile(Operation::Delete).await
    }

    fn check_input(&self, operation: Operation, input: &CategoryInput) -> Result<(), StoreError> {
        input.validate().map_err(|err| {
            self.record_failure(SyncFailure::new(operation, ErrorKind::Validation, err.to_string()));
            warn!(%operation, error = %err, "Rejected input before sending");
            StoreError::Invalid(err)
        })
    }

    fn fail(&self, operation: Operation, source: ApiError) -> StoreError {
        self.record_failure(SyncFailure::new(operation, source.kind(), source.to_string()));
        warn!(%operation, error = %source, "Mutation failed, cache unchanged");
        StoreError::Remote { operation, source }
    }

    fn record_failure(&self, failure: SyncFailure) {
        self.state.send_modify(|s| s.last_error = Some(failure));
    }

    /// Full refetch after a successful mutation. A failure is recorded
    /// under the mutation's operation.
    async fn reconcile(&self, operation: Operation) -> Result<(), StoreError> {
        self.read(operation, self.remote.list_all())
            .await
            .map_err(|err| match err {
                StoreError::Remote { source, .. } => StoreError::Refetch { operation, source },
                other => other,
            })
    }
}

// ============================================================================
// Tests
// ============================================================================
