//! The synchronized collection cache.
//!
//! `CategoryStore` owns the client-side copy of the category collection.
//! It never edits records in place: reads replace them wholesale and every
//! mutation is followed by a full refetch. Subscribers are notified through
//! a `tokio::sync::watch` channel after each state change.

pub mod store;

pub use store::{CacheState, CategoryStore, StoreError, SyncFailure};
