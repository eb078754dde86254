//! Cache key definitions.
//!
//! `CacheKey` names what a revalidation targets: a rendered storefront path
//! or a data tag. `ResponseKey` identifies one stored response.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

/// Sitemap entries for products.
pub const PRODUCTS_SITEMAP_TAG: &str = "products-sitemap";
/// Featured-product selections embedded in page blocks.
pub const FEATURED_PRODUCTS_TAG: &str = "featured-products";
/// Product card fragments rendered in listings.
pub const PRODUCT_CARDS_TAG: &str = "product-cards";

/// Tags invalidated by every product revalidation, in emission order.
pub const PRODUCT_TAGS: [&str; 3] = [
    PRODUCTS_SITEMAP_TAG,
    FEATURED_PRODUCTS_TAG,
    PRODUCT_CARDS_TAG,
];

pub const HOME_PATH: &str = "/";
pub const PRODUCTS_PATH: &str = "/products";

pub fn product_path(slug: &str) -> String {
    format!("{PRODUCTS_PATH}/{slug}")
}

pub fn category_path(slug: &str) -> String {
    format!("/categories/{slug}")
}

/// A revalidation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CacheKey {
    /// A storefront URL path whose rendered output must be regenerated.
    Path(String),
    /// A named group of cached data.
    Tag(String),
}

impl CacheKey {
    pub fn path(path: impl Into<String>) -> Self {
        CacheKey::Path(path.into())
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        CacheKey::Tag(tag.into())
    }

    pub fn value(&self) -> &str {
        match self {
            CacheKey::Path(value) | CacheKey::Tag(value) => value,
        }
    }

    /// Label used in metrics and logs.
    pub fn kind_label(&self) -> &'static str {
        match self {
            CacheKey::Path(_) => "path",
            CacheKey::Tag(_) => "tag",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind_label(), self.value())
    }
}

/// Output format of a cached response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Html,
    Json,
    Sitemap,
}

/// Key of one entry in the response store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub format: OutputFormat,
    pub path: String,
    pub query_hash: u64,
}

impl ResponseKey {
    pub fn new(format: OutputFormat, path: impl Into<String>, query: &str) -> Self {
        Self {
            format,
            path: path.into(),
            query_hash: hash_query(query),
        }
    }
}

/// Compute a hash for any hashable value.
pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hash a query string for response key generation.
pub fn hash_query(query: &str) -> u64 {
    hash_value(&query)
}
