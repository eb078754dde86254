//! REST adapter for a Payload-style CMS.
//!
//! Collections are read from `{base}/api/{collection}` with `where[...]`
//! query parameters. Every response is a `{ "docs": [...] }` envelope.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderValue;
use reqwest::{Client, Url, header::AUTHORIZATION};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::application::repos::{CatalogRepo, ProductQuery, RepoError};
use crate::domain::pages::Page;
use crate::domain::products::{Category, Product};
use crate::domain::types::DocumentId;

use super::error::InfraError;

const PRODUCTS: &str = "products";
const CATEGORIES: &str = "categories";
const PAGES: &str = "pages";

/// Depth used for listings and detail pages: categories and images populated.
const LISTING_DEPTH: u8 = 1;
/// Pages embed blocks whose relationships are fetched separately.
const PAGE_DEPTH: u8 = 2;

type QueryPairs = Vec<(String, String)>;

#[derive(Deserialize)]
struct FindResponse<T> {
    docs: Vec<T>,
}

#[derive(Clone, Debug)]
pub struct PayloadClient {
    client: Client,
    base: Url,
    api_key: Option<String>,
}

impl PayloadClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let base = Url::parse(base_url)
            .and_then(|url| url.join("/"))
            .map_err(|err| InfraError::configuration(format!("invalid cms base url: {err}")))?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::cms(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            base,
            api_key,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("vitrine/", env!("CARGO_PKG_VERSION"))
    }

    fn auth_header(&self) -> Result<Option<HeaderValue>, RepoError> {
        self.api_key
            .as_deref()
            .map(|key| {
                HeaderValue::from_str(&format!("users API-Key {key}"))
                    .map_err(|err| RepoError::transport(format!("invalid api key header: {err}")))
            })
            .transpose()
    }

    fn collection_url(&self, collection: &str, query: &[(String, String)]) -> Result<Url, RepoError> {
        let mut url = self
            .base
            .join(&format!("api/{collection}"))
            .map_err(RepoError::transport)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    #[instrument(skip(self, query), fields(params = query.len()))]
    async fn find<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: QueryPairs,
    ) -> Result<Vec<T>, RepoError> {
        let url = self.collection_url(collection, &query)?;
        let mut request = self.client.get(url);
        if let Some(header) = self.auth_header()? {
            request = request.header(AUTHORIZATION, header);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(RepoError::Status {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let envelope: FindResponse<T> = serde_json::from_slice(&bytes).map_err(RepoError::decode)?;
        debug!(docs = envelope.docs.len(), "cms query returned");
        Ok(envelope.docs)
    }

    async fn find_one<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: QueryPairs,
    ) -> Result<Option<T>, RepoError> {
        Ok(self.find(collection, query).await?.into_iter().next())
    }
}

fn map_transport_error(err: reqwest::Error) -> RepoError {
    if err.is_timeout() {
        RepoError::Timeout
    } else if err.is_connect() {
        RepoError::Unavailable(err.to_string())
    } else {
        RepoError::transport(err)
    }
}

#[async_trait]
impl CatalogRepo for PayloadClient {
    async fn find_products_by_ids(
        &self,
        ids: &[DocumentId],
        limit: usize,
        depth: u8,
    ) -> Result<Vec<Product>, RepoError> {
        self.find(PRODUCTS, products_by_ids_query(ids, limit, depth))
            .await
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepoError> {
        self.find(PRODUCTS, product_list_query(query)).await
    }

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepoError> {
        self.find_one(PRODUCTS, slug_query(slug, true, LISTING_DEPTH))
            .await
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        self.find_one(CATEGORIES, slug_query(slug, false, 0)).await
    }

    async fn find_page_by_slug(&self, slug: &str) -> Result<Option<Page>, RepoError> {
        self.find_one(PAGES, slug_query(slug, true, PAGE_DEPTH)).await
    }
}

fn pair(key: impl Into<String>, value: impl ToString) -> (String, String) {
    (key.into(), value.to_string())
}

fn products_by_ids_query(ids: &[DocumentId], limit: usize, depth: u8) -> QueryPairs {
    let mut query: QueryPairs = ids
        .iter()
        .enumerate()
        .map(|(index, id)| pair(format!("where[id][in][{index}]"), id))
        .collect();
    query.push(pair("limit", limit));
    query.push(pair("depth", depth));
    query
}

fn product_list_query(filter: &ProductQuery) -> QueryPairs {
    let mut query = vec![pair("where[_status][equals]", "published")];
    if let Some(category) = &filter.category {
        query.push(pair("where[categories][in]", category));
    }
    query.push(pair("limit", filter.limit));
    query.push(pair("depth", LISTING_DEPTH));
    query
}

fn slug_query(slug: &str, published_only: bool, depth: u8) -> QueryPairs {
    let mut query = vec![pair("where[slug][equals]", slug)];
    if published_only {
        query.push(pair("where[_status][equals]", "published"));
    }
    query.push(pair("limit", 1));
    query.push(pair("depth", depth));
    query
}
