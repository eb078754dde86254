//! Repository traits describing catalog adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::pages::Page;
use crate::domain::products::{Category, Product};
use crate::domain::types::DocumentId;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("catalog request failed: {0}")]
    Transport(String),
    #[error("catalog responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
    #[error("catalog request timed out")]
    Timeout,
    #[error("catalog source unavailable: {0}")]
    Unavailable(String),
}

impl RepoError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Published-product listing filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub category: Option<DocumentId>,
    pub limit: u32,
}

impl ProductQuery {
    pub fn all(limit: u32) -> Self {
        Self {
            category: None,
            limit,
        }
    }

    pub fn in_category(category: DocumentId, limit: u32) -> Self {
        Self {
            category: Some(category),
            limit,
        }
    }
}

#[async_trait]
pub trait CatalogRepo: Send + Sync {
    /// Fetch products whose id is in `ids`. Result order is unspecified and
    /// ids unknown to the catalog are simply absent.
    async fn find_products_by_ids(
        &self,
        ids: &[DocumentId],
        limit: usize,
        depth: u8,
    ) -> Result<Vec<Product>, RepoError>;

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepoError>;

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepoError>;

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError>;

    async fn find_page_by_slug(&self, slug: &str) -> Result<Option<Page>, RepoError>;
}
