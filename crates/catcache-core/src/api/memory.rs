//! In-process category backend.
//!
//! Behaves like the HTTP service (server-assigned ids, not-found on unknown
//! ids) and records every call so tests can assert on what the cache sent.
//! Failures and latency can be injected per operation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::models::{Category, CategoryInput, CategoryStatus};
use crate::utils::contains_ignore_case;

use super::{ApiError, CategoryRemote, ErrorKind, Operation};

/// Record of a call made against the memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    List,
    Search { query: String },
    Filter { status: CategoryStatus },
    Create { input: CategoryInput },
    Update { id: i64, input: CategoryInput },
    Delete { id: i64 },
}

impl RemoteOp {
    pub fn operation(&self) -> Operation {
        match self {
            RemoteOp::List => Operation::List,
            RemoteOp::Search { .. } => Operation::Search,
            RemoteOp::Filter { .. } => Operation::Filter,
            RemoteOp::Create { .. } => Operation::Create,
            RemoteOp::Update { .. } => Operation::Update,
            RemoteOp::Delete { .. } => Operation::Delete,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<Category>,
    next_id: i64,
    operations: Vec<RemoteOp>,
    failures: HashMap<Operation, VecDeque<ErrorKind>>,
    delays: HashMap<Operation, VecDeque<Duration>>,
}

#[derive(Debug, Default)]
pub struct MemoryRemote {
    inner: Mutex<Inner>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend preloaded with `records`; new ids continue after the largest one.
    pub fn with_records(records: Vec<Category>) -> Self {
        let remote = Self::new();
        remote.set_records(records);
        remote
    }

    /// A small fixed collection for demos.
    pub fn seeded() -> Self {
        Self::with_records(vec![
            Category::new(1, "Books", Some(CategoryStatus::Active)),
            Category::new(2, "Games", Some(CategoryStatus::Inactive)),
            Category::new(3, "Music", None),
            Category::new(4, "Board Games", Some(CategoryStatus::Active)),
        ])
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the server-side collection, as another client would.
    pub fn set_records(&self, records: Vec<Category>) {
        let mut inner = self.lock();
        inner.next_id = records.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        inner.records = records;
    }

    pub fn records(&self) -> Vec<Category> {
        self.lock().records.clone()
    }

    /// Returns all recorded calls, oldest first.
    pub fn operations(&self) -> Vec<RemoteOp> {
        self.lock().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    /// Make the next call of `operation` fail with an error of `kind`.
    /// Queued failures are consumed in order, one per call.
    pub fn fail_next(&self, operation: Operation, kind: ErrorKind) {
        self.lock().failures.entry(operation).or_default().push_back(kind);
    }

    /// Delay the response of the next call of `operation`.
    /// The response content is decided when the call arrives, not when it returns.
    pub fn delay_next(&self, operation: Operation, delay: Duration) {
        self.lock().delays.entry(operation).or_default().push_back(delay);
    }

    fn injected_error(operation: Operation, kind: ErrorKind) -> ApiError {
        let message = format!("injected {} failure", operation);
        match kind {
            ErrorKind::Transport => ApiError::ServerError(message),
            ErrorKind::Validation => ApiError::Validation(message),
            ErrorKind::NotFound => ApiError::NotFound(message),
        }
    }

    fn not_found(id: i64) -> ApiError {
        ApiError::NotFound(format!("category {} does not exist", id))
    }

    /// Record `op`, then either fail or apply `handler` to the collection.
    /// The lock is released before any injected delay.
    async fn call<T>(
        &self,
        op: RemoteOp,
        handler: impl FnOnce(&mut Inner) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let operation = op.operation();
        let (result, delay) = {
            let mut inner = self.lock();
            inner.operations.push(op);
            let delay = inner.delays.get_mut(&operation).and_then(VecDeque::pop_front);
            let failure = inner.failures.get_mut(&operation).and_then(VecDeque::pop_front);
            let result = match failure {
                Some(kind) => Err(Self::injected_error(operation, kind)),
                None => handler(&mut *inner),
            };
            (result, delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

#[async_trait]
impl CategoryRemote for MemoryRemote {
    async fn list_all(&self) -> Result<Vec<Category>, ApiError> {
        self.call(RemoteOp::List, |inner| Ok(inner.records.clone())).await
    }

    async fn search(&self, query: &str) -> Result<Vec<Category>, ApiError> {
        let op = RemoteOp::Search {
            query: query.to_string(),
        };
        self.call(op, |inner| {
            Ok(inner
                .records
                .iter()
                .filter(|c| contains_ignore_case(&c.name, query))
                .cloned()
                .collect())
        })
        .await
    }

    async fn filter_by_status(&self, status: CategoryStatus) -> Result<Vec<Category>, ApiError> {
        self.call(RemoteOp::Filter { status }, |inner| {
            Ok(inner
                .records
                .iter()
                .filter(|c| c.effective_status() == status)
                .cloned()
                .collect())
        })
        .await
    }

    async fn create(&self, input: &CategoryInput) -> Result<Option<Category>, ApiError> {
        let op = RemoteOp::Create {
            input: input.clone(),
        };
        self.call(op, |inner| {
            if input.validate().is_err() {
                return Err(ApiError::Validation("name is required".to_string()));
            }
            let id = inner.next_id.max(1);
            inner.next_id = id + 1;
            let created = Category::new(id, input.name.trim(), input.status);
            inner.records.push(created.clone());
            Ok(Some(created))
        })
        .await
    }

    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Option<Category>, ApiError> {
        let op = RemoteOp::Update {
            id,
            input: input.clone(),
        };
        self.call(op, |inner| {
            if input.validate().is_err() {
                return Err(ApiError::Validation("name is required".to_string()));
            }
            let record = inner
                .records
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| Self::not_found(id))?;
            record.name = input.name.trim().to_string();
            record.status = input.status;
            Ok(Some(record.clone()))
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.call(RemoteOp::Delete { id }, |inner| {
            let index = inner
                .records
                .iter()
                .position(|c| c.id == id)
                .ok_or_else(|| Self::not_found(id))?;
            inner.records.remove(index);
            Ok(())
        })
        .await
    }
}
