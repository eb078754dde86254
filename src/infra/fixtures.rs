//! In-memory catalog loaded from a JSON fixture file.
//!
//! The file mirrors what the CMS would return, grouped by collection:
//!
//! ```json
//! { "products": [...], "categories": [...], "pages": [...] }
//! ```
//!
//! Bare category ids on products are populated from `categories` at load
//! time, the way a depth-1 CMS query would return them.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::application::repos::{CatalogRepo, ProductQuery, RepoError};
use crate::domain::pages::Page;
use crate::domain::products::{Category, CategoryRef, Product};
use crate::domain::types::DocumentId;

use super::error::InfraError;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FixtureFile {
    products: Vec<Product>,
    categories: Vec<Category>,
    pages: Vec<Page>,
}

#[derive(Debug, Clone, Default)]
pub struct FixtureCatalog {
    products: Vec<Product>,
    categories: Vec<Category>,
    pages: Vec<Page>,
}

impl FixtureCatalog {
    pub async fn load(path: &Path) -> Result<Self, InfraError> {
        let raw = tokio::fs::read(path).await?;
        let file: FixtureFile = serde_json::from_slice(&raw).map_err(|err| {
            InfraError::configuration(format!(
                "fixture file {} is invalid: {err}",
                path.display()
            ))
        })?;
        let catalog = Self::from_file(file);
        info!(
            path = %path.display(),
            products = catalog.products.len(),
            categories = catalog.categories.len(),
            pages = catalog.pages.len(),
            "Loaded catalog fixtures"
        );
        Ok(catalog)
    }

    pub fn from_value(value: Value) -> Result<Self, InfraError> {
        let file: FixtureFile = serde_json::from_value(value)
            .map_err(|err| InfraError::configuration(format!("invalid fixtures: {err}")))?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: FixtureFile) -> Self {
        let by_id: HashMap<DocumentId, Category> = file
            .categories
            .iter()
            .map(|category| (category.id.clone(), category.clone()))
            .collect();

        let products = file
            .products
            .into_iter()
            .map(|mut product| {
                for category in &mut product.categories {
                    if let CategoryRef::Unresolved(id) = &*category
                        && let Some(resolved) = by_id.get(id)
                    {
                        *category = CategoryRef::Resolved(resolved.clone());
                    }
                }
                product
            })
            .collect();

        Self {
            products,
            categories: file.categories,
            pages: file.pages,
        }
    }

    fn published(&self) -> impl Iterator<Item = &Product> {
        self.products
            .iter()
            .filter(|product| product.status.is_published())
    }
}

#[async_trait]
impl CatalogRepo for FixtureCatalog {
    async fn find_products_by_ids(
        &self,
        ids: &[DocumentId],
        limit: usize,
        _depth: u8,
    ) -> Result<Vec<Product>, RepoError> {
        Ok(self
            .products
            .iter()
            .filter(|product| ids.contains(&product.id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepoError> {
        Ok(self
            .published()
            .filter(|product| match &query.category {
                Some(category) => product
                    .categories
                    .iter()
                    .any(|candidate| candidate.id() == category),
                None => true,
            })
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepoError> {
        Ok(self
            .published()
            .find(|product| product.slug() == Some(slug))
            .cloned())
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        Ok(self
            .categories
            .iter()
            .find(|category| category.slug.as_deref() == Some(slug))
            .cloned())
    }

    async fn find_page_by_slug(&self, slug: &str) -> Result<Option<Page>, RepoError> {
        Ok(self
            .pages
            .iter()
            .find(|page| page.status.is_published() && page.slug.as_deref() == Some(slug))
            .cloned())
    }
}
