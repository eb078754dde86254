//! Shared domain enumerations aligned with the CMS document shapes.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// CMS document identifier. Postgres-backed collections use integers,
/// other adapters use strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Number(u64),
    Text(String),
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Number(value) => write!(f, "{value}"),
            DocumentId::Text(value) => f.write_str(value),
        }
    }
}

impl From<u64> for DocumentId {
    fn from(value: u64) -> Self {
        DocumentId::Number(value)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        DocumentId::Text(value.to_string())
    }
}

/// Draft/publish state carried in the `_status` field of versioned collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationStatus {
    #[default]
    Draft,
    Published,
}

impl PublicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PublicationStatus::Draft => "draft",
            PublicationStatus::Published => "published",
        }
    }

    pub fn is_published(self) -> bool {
        matches!(self, PublicationStatus::Published)
    }
}

/// Deserialize `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
