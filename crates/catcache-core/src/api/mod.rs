//! Remote access to the category collection.
//!
//! `CategoryRemote` is the seam the cache talks through. `ApiClient`
//! implements it over HTTP; `MemoryRemote` implements it in-process for
//! tests and the CLI's demo mode.

pub mod client;
pub mod error;
pub mod memory;

use std::fmt;

use async_trait::async_trait;

use crate::models::{Category, CategoryInput, CategoryStatus};

pub use client::ApiClient;
pub use error::{ApiError, ErrorKind};
pub use memory::{MemoryRemote, RemoteOp};

/// The remote operations, used to label recorded calls and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Search,
    Filter,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "list",
            Operation::Search => "search",
            Operation::Filter => "filter",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Typed operations against the remote collection.
#[async_trait]
pub trait CategoryRemote: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Category>, ApiError>;

    async fn search(&self, query: &str) -> Result<Vec<Category>, ApiError>;

    async fn filter_by_status(&self, status: CategoryStatus) -> Result<Vec<Category>, ApiError>;

    /// `Ok` means the server applied the change. The record is `None` when
    /// the response did not carry a readable one.
    async fn create(&self, input: &CategoryInput) -> Result<Option<Category>, ApiError>;

    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Option<Category>, ApiError>;

    async fn delete(&self, id: i64) -> Result<(), ApiError>;
}
