//! Catalog reads used by the storefront handlers.
//!
//! Every read records the cache tags its result feeds into, so the response
//! cache can drop the rendered page when a product changes.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::application::repos::{CatalogRepo, ProductQuery, RepoError};
use crate::cache::{FEATURED_PRODUCTS_TAG, PRODUCT_CARDS_TAG, PRODUCTS_SITEMAP_TAG, deps};
use crate::domain::pages::Page;
use crate::domain::products::{Category, Product, ProductRef};
use crate::domain::types::DocumentId;

/// Relationship depth requested for featured products.
pub const FEATURED_PRODUCTS_DEPTH: u8 = 3;

const SITEMAP_PRODUCT_LIMIT: u32 = 1000;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product `{0}` not found")]
    ProductNotFound(String),
    #[error("category `{0}` not found")]
    CategoryNotFound(String),
    #[error("page `{0}` not found")]
    PageNotFound(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct CatalogService {
    repo: Arc<dyn CatalogRepo>,
    listing_limit: u32,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepo>, listing_limit: u32) -> Self {
        Self {
            repo,
            listing_limit,
        }
    }

    /// Products selected in a featured-products block, in selection order.
    ///
    /// Selected ids the catalog no longer knows are dropped. An empty
    /// selection performs no lookup.
    #[instrument(skip_all, fields(selected = selected.len()))]
    pub async fn featured_products(
        &self,
        selected: &[ProductRef],
    ) -> Result<Vec<Product>, CatalogError> {
        deps::record(FEATURED_PRODUCTS_TAG);
        deps::record(PRODUCT_CARDS_TAG);

        if selected.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<DocumentId> = selected.iter().map(|item| item.id().clone()).collect();
        let fetched = self
            .repo
            .find_products_by_ids(&ids, ids.len(), FEATURED_PRODUCTS_DEPTH)
            .await?;

        let ordered = order_by_selection(&ids, fetched);
        debug!(found = ordered.len(), "Loaded featured products");
        Ok(ordered)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        deps::record(PRODUCT_CARDS_TAG);
        Ok(self
            .repo
            .list_products(&ProductQuery::all(self.listing_limit))
            .await?)
    }

    pub async fn product_by_slug(&self, slug: &str) -> Result<Product, CatalogError> {
        deps::record(PRODUCT_CARDS_TAG);
        self.repo
            .find_product_by_slug(slug)
            .await?
            .ok_or_else(|| CatalogError::ProductNotFound(slug.to_string()))
    }

    /// A category and its published products.
    pub async fn category_with_products(
        &self,
        slug: &str,
    ) -> Result<(Category, Vec<Product>), CatalogError> {
        deps::record(PRODUCT_CARDS_TAG);

        let category = self
            .repo
            .find_category_by_slug(slug)
            .await?
            .ok_or_else(|| CatalogError::CategoryNotFound(slug.to_string()))?;

        let products = self
            .repo
            .list_products(&ProductQuery::in_category(
                category.id.clone(),
                self.listing_limit,
            ))
            .await?;

        Ok((category, products))
    }

    pub async fn page_by_slug(&self, slug: &str) -> Result<Page, CatalogError> {
        self.repo
            .find_page_by_slug(slug)
            .await?
            .ok_or_else(|| CatalogError::PageNotFound(slug.to_string()))
    }

    pub async fn sitemap_products(&self) -> Result<Vec<Product>, CatalogError> {
        deps::record(PRODUCTS_SITEMAP_TAG);
        Ok(self
            .repo
            .list_products(&ProductQuery::all(SITEMAP_PRODUCT_LIMIT))
            .await?)
    }
}

/// Arrange `fetched` in the order of `ids`, dropping ids with no match.
fn order_by_selection(ids: &[DocumentId], fetched: Vec<Product>) -> Vec<Product> {
    ids.iter()
        .filter_map(|id| fetched.iter().find(|product| &product.id == id).cloned())
        .collect()
}
