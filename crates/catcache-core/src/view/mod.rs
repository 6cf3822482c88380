//! Derived views over the cached collection.
//!
//! `derive_view` is a pure projection of the cache through a `ViewFilter`
//! (case-insensitive name query plus status selector). `LiveView` recomputes
//! it whenever the store notifies a change, and `CategoryForm` holds the
//! add/edit form that feeds mutations back into the store.

pub mod filter;
pub mod form;
pub mod live;

pub use filter::{derive_view, StatusFilter, ViewFilter};
pub use form::{CategoryForm, FormMode};
pub use live::LiveView;
