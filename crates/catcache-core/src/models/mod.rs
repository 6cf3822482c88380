//! Data models for the category collection.
//!
//! - `Category`: a record as the server returns it
//! - `CategoryStatus`: active / inactive, with active as the default
//! - `CategoryInput`: the name and optional status sent on create and update

pub mod category;

pub use category::{Category, CategoryInput, CategoryStatus, EmptyNameError, ParseStatusError};
pub(crate) use category::{DataEnvelope, UpdatePayload};
