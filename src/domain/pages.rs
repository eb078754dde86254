//! Pages and the layout blocks editors compose them from.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::links::{Link, LinkItem};
use super::products::{MediaRef, ProductRef};
use super::types::{DocumentId, PublicationStatus, null_as_default};

/// Serialized rich-text editor state (Lexical JSON), rendered by the
/// application layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Value);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "_status", default, deserialize_with = "null_as_default")]
    pub status: PublicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero: Option<Hero>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub layout: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hero {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_text: Option<RichText>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<LinkItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRef>,
}

impl Hero {
    /// The CMS stores a disabled hero as `type: "none"`.
    pub fn is_enabled(&self) -> bool {
        !matches!(self.kind.as_deref(), Some("none"))
    }
}

/// A layout block, discriminated by `blockType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "blockType")]
pub enum Block {
    #[serde(rename = "featuredProducts")]
    FeaturedProducts(FeaturedProductsBlock),
    #[serde(rename = "content")]
    Content(ContentBlock),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedProductsBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro_content: Option<RichText>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub selected_products: Vec<ProductRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<LinkItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: ColumnSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_text: Option<RichText>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub enable_link: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnSize {
    #[default]
    OneThird,
    Half,
    TwoThirds,
    Full,
}

impl ColumnSize {
    /// Width on the twelve-column large-screen grid.
    pub fn span(self) -> u8 {
        match self {
            ColumnSize::Full => 12,
            ColumnSize::Half => 6,
            ColumnSize::OneThird => 4,
            ColumnSize::TwoThirds => 8,
        }
    }
}
