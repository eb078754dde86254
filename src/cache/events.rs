//! Product change events.
//!
//! A `ChangeEvent` describes one committed write to the products
//! collection. The JSON shape matches what the CMS sends to the
//! revalidation webhook.

use serde::{Deserialize, Serialize};

use crate::domain::products::Product;
use crate::domain::types::null_as_default;

/// Kind of committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

/// Non-delete operation passed to the after-change hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    Create,
    Update,
}

impl From<WriteOperation> for ChangeKind {
    fn from(operation: WriteOperation) -> Self {
        match operation {
            WriteOperation::Create => ChangeKind::Create,
            WriteOperation::Update => ChangeKind::Update,
        }
    }
}

/// Request-scoped flags attached to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeContext {
    /// Caller asked to suppress revalidation for this write.
    #[serde(deserialize_with = "null_as_default")]
    pub disable_revalidate: bool,
    /// Write performed through the admin surface.
    #[serde(rename = "isAdmin", alias = "isAdministrative")]
    #[serde(deserialize_with = "null_as_default")]
    pub is_administrative: bool,
}

impl ChangeContext {
    pub fn admin() -> Self {
        Self {
            is_administrative: true,
            ..Self::default()
        }
    }

    pub fn suppressed() -> Self {
        Self {
            disable_revalidate: true,
            ..Self::default()
        }
    }
}

/// One committed change to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    #[serde(rename = "operation")]
    pub kind: ChangeKind,
    /// Document after the write; for deletes, the removed document.
    #[serde(rename = "doc")]
    pub document: Product,
    /// Document before the write. Only meaningful for updates.
    #[serde(rename = "previousDoc", default, skip_serializing_if = "Option::is_none")]
    pub previous_document: Option<Product>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: ChangeContext,
}

impl ChangeEvent {
    pub fn created(document: Product, context: ChangeContext) -> Self {
        Self {
            kind: ChangeKind::Create,
            document,
            previous_document: None,
            context,
        }
    }

    pub fn updated(document: Product, previous: Option<Product>, context: ChangeContext) -> Self {
        Self {
            kind: ChangeKind::Update,
            document,
            previous_document: previous,
            context,
        }
    }

    pub fn deleted(document: Product, context: ChangeContext) -> Self {
        Self {
            kind: ChangeKind::Delete,
            document,
            previous_document: None,
            context,
        }
    }
}
