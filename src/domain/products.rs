//! Product and category documents as delivered by the CMS.
//!
//! Relationship fields arrive either populated (an object) or as a bare id,
//! depending on the query depth. Both shapes are modelled as explicit sum
//! types so callers have to decide what to do with unresolved references.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::links::LinkItem;
use super::types::{DocumentId, PublicationStatus, null_as_default};

/// A product document.
///
/// Fields the storefront does not model are kept in `extra` so that a
/// document received from the CMS can be handed back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "_status", default, deserialize_with = "null_as_default")]
    pub status: PublicationStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<CategoryRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ProductMeta>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<LinkItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// Human label used in log lines: the name, else the slug, else the id.
    pub fn display_label(&self) -> String {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.slug.as_deref().filter(|slug| !slug.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Slug, treating an empty string as absent.
    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref().filter(|slug| !slug.is_empty())
    }

    /// Product image with the SEO image as fallback.
    pub fn card_image(&self) -> Option<&MediaRef> {
        self.image
            .as_ref()
            .or_else(|| self.meta.as_ref().and_then(|meta| meta.image.as_ref()))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A category relationship: populated, or only the foreign id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Resolved(Category),
    Unresolved(DocumentId),
}

impl CategoryRef {
    pub fn id(&self) -> &DocumentId {
        match self {
            CategoryRef::Resolved(category) => &category.id,
            CategoryRef::Unresolved(id) => id,
        }
    }

    /// Slug of a populated category; `None` for bare ids and empty slugs.
    pub fn resolved_slug(&self) -> Option<&str> {
        match self {
            CategoryRef::Resolved(category) => {
                category.slug.as_deref().filter(|slug| !slug.is_empty())
            }
            CategoryRef::Unresolved(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaRef {
    Resolved(Media),
    Unresolved(DocumentId),
}

impl MediaRef {
    pub fn resolved(&self) -> Option<&Media> {
        match self {
            MediaRef::Resolved(media) => Some(media),
            MediaRef::Unresolved(_) => None,
        }
    }
}

/// A product relationship as stored in block fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Resolved(Box<Product>),
    Unresolved(DocumentId),
}

impl ProductRef {
    pub fn id(&self) -> &DocumentId {
        match self {
            ProductRef::Resolved(product) => &product.id,
            ProductRef::Unresolved(id) => id,
        }
    }
}
