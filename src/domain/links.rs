//! CMS link field.

use serde::{Deserialize, Serialize};

use super::types::{DocumentId, null_as_default};

const PAGES_COLLECTION: &str = "pages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    #[default]
    Reference,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkAppearance {
    #[default]
    Default,
    Outline,
}

impl LinkAppearance {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkAppearance::Default => "default",
            LinkAppearance::Outline => "outline",
        }
    }
}

/// Populated target of a reference link. Only the slug matters for routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedDocument {
    pub id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceValue {
    Resolved(ReferencedDocument),
    Unresolved(DocumentId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkReference {
    pub relation_to: String,
    pub value: ReferenceValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: LinkKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub new_tab: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<LinkReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub appearance: LinkAppearance,
}

impl Link {
    /// Resolve the link target.
    ///
    /// Reference links to a populated document route to
    /// `/{collection}/{slug}`, except pages which live at `/{slug}`.
    /// Anything else falls back to the custom url.
    pub fn href(&self) -> Option<String> {
        if self.kind == LinkKind::Reference
            && let Some(reference) = &self.reference
            && let ReferenceValue::Resolved(document) = &reference.value
            && let Some(slug) = document.slug.as_deref().filter(|slug| !slug.is_empty())
        {
            return Some(if reference.relation_to == PAGES_COLLECTION {
                format!("/{slug}")
            } else {
                format!("/{}/{slug}", reference.relation_to)
            });
        }

        self.url.clone().filter(|url| !url.is_empty())
    }
}

/// Array row wrapping a link, as produced by the CMS `linkGroup` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub link: Link,
}
