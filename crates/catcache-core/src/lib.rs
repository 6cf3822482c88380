//! Core library for catcache.
//!
//! Keeps a client-side copy of a remote category collection consistent with
//! the server: every mutation round-trips to the server and is followed by a
//! full refetch, and filtered views are derived from the cache without
//! modifying it.

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod utils;
pub mod view;

pub use api::{ApiClient, ApiError, CategoryRemote, ErrorKind, MemoryRemote, Operation};
pub use cache::{CacheState, CategoryStore, StoreError, SyncFailure};
pub use config::Config;
pub use models::{Category, CategoryInput, CategoryStatus};
pub use view::{derive_view, CategoryForm, LiveView, StatusFilter, ViewFilter};
