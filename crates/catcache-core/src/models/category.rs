use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryStatus {
    #[default]
    Active,
    Inactive,
}

impl CategoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryStatus::Active => "active",
            CategoryStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for CategoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown category status: {0:?} (expected \"active\" or \"inactive\")")]
pub struct ParseStatusError(pub String);

impl FromStr for CategoryStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("active") => Ok(CategoryStatus::Active),
            s if s.eq_ignore_ascii_case("inactive") => Ok(CategoryStatus::Inactive),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A category as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(
        default,
        deserialize_with = "deserialize_blank_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<CategoryStatus>,
}

// Helper to deserialize a status where null and "" both mean "not set"
fn deserialize_blank_status<'de, D>(deserializer: D) -> Result<Option<CategoryStatus>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl Category {
    pub fn new(id: i64, name: impl Into<String>, status: Option<CategoryStatus>) -> Self {
        Self {
            id,
            name: name.into(),
            status,
        }
    }

    /// Status with the server's default applied: records without one are active.
    pub fn effective_status(&self) -> CategoryStatus {
        self.status.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Category name must not be empty")]
pub struct EmptyNameError;

/// Body of a create request, and the editable part of an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CategoryStatus>,
}

impl CategoryInput {
    /// Build an input with a trimmed, non-empty name.
    pub fn new(name: &str, status: Option<CategoryStatus>) -> Result<Self, EmptyNameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EmptyNameError);
        }
        Ok(Self {
            name: name.to_string(),
            status,
        })
    }

    pub fn validate(&self) -> Result<(), EmptyNameError> {
        if self.name.trim().is_empty() {
            Err(EmptyNameError)
        } else {
            Ok(())
        }
    }
}

/// PUT body: the input plus the id it targets.
#[derive(Debug, Serialize)]
pub(crate) struct UpdatePayload<'a> {
    pub id: i64,
    #[serde(flatten)]
    pub input: &'a CategoryInput,
}

/// Every successful response wraps its payload in `{ "data": ... }`.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}
