//! Product change webhook.
//!
//! The CMS posts one change event per committed product write. The request
//! is authenticated with a shared secret, run through the revalidation
//! hooks, and answered with the document it carried.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::application::error::HttpError;
use crate::cache::{ChangeEvent, RevalidationHooks, RevalidationOutcome};
use crate::domain::products::Product;

pub const REVALIDATE_PRODUCTS_PATH: &str = "/api/revalidate/products";
pub const REVALIDATE_SECRET_HEADER: &str = "x-revalidate-secret";

const SOURCE: &str = "infra::http::revalidate::revalidate_products";

#[derive(Clone)]
pub struct RevalidateState {
    hooks: Arc<RevalidationHooks>,
    secret: Arc<str>,
}

impl RevalidateState {
    pub fn new(hooks: Arc<RevalidationHooks>, secret: &str) -> Self {
        Self {
            hooks,
            secret: Arc::from(secret),
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> bool {
        headers
            .get(REVALIDATE_SECRET_HEADER)
            .is_some_and(|provided| bool::from(provided.as_bytes().ct_eq(self.secret.as_bytes())))
    }
}

#[derive(Debug, Serialize)]
struct RevalidateResponse {
    doc: Product,
    revalidation: RevalidationOutcome,
}

pub fn router<S>(state: RevalidateState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(REVALIDATE_PRODUCTS_PATH, post(revalidate_products))
        .with_state(state)
}

async fn revalidate_products(
    State(state): State<RevalidateState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.authorize(&headers) {
        return HttpError::new(
            SOURCE,
            StatusCode::UNAUTHORIZED,
            "Invalid revalidation secret",
            "missing or mismatched x-revalidate-secret header",
        )
        .into_response();
    }

    let event: ChangeEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(err) => {
            return HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Malformed change event",
                &err,
            )
            .into_response();
        }
    };

    let (doc, revalidation) = state.hooks.handle(event);
    Json(RevalidateResponse { doc, revalidation }).into_response()
}
