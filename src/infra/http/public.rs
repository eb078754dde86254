use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, Uri, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    application::{
        catalog::CatalogError,
        error::{ErrorReport, HttpError},
        sitemap::SitemapService,
        storefront::StorefrontService,
    },
    cache::{CacheState, response_cache_layer},
    presentation::views::{
        LayoutChrome, PageTemplate, ProductListingTemplate, ProductTemplate,
        render_not_found_response, render_template_response,
    },
};

use super::{
    middleware::{log_responses, set_request_context},
    revalidate::{self, RevalidateState},
};

#[derive(Clone)]
pub struct HttpState {
    pub storefront: Arc<StorefrontService>,
    pub sitemap: Arc<SitemapService>,
    pub cache: Option<CacheState>,
    pub revalidate: Option<RevalidateState>,
}

pub fn build_router(state: HttpState) -> Router {
    // Catalog-backed routes; handlers record the tags their output depends on.
    let cached_routes = Router::new()
        .route("/", get(home))
        .route("/products", get(product_index))
        .route("/products/{slug}", get(product_detail))
        .route("/categories/{slug}", get(category_index))
        .route("/sitemap.xml", get(sitemap))
        .fallback(fallback_router);

    let cached_routes = if let Some(cache_state) = state.cache.clone() {
        cached_routes.layer(middleware::from_fn_with_state(
            cache_state,
            response_cache_layer,
        ))
    } else {
        cached_routes
    };

    let static_routes = Router::new()
        .route("/_health", get(health))
        .route("/robots.txt", get(robots_txt));

    let mut router = cached_routes.merge(static_routes);
    if let Some(revalidate_state) = state.revalidate.clone() {
        router = router.merge(revalidate::router(revalidate_state));
    }

    router
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn home(State(state): State<HttpState>) -> Response {
    match state.storefront.home().await {
        Ok(view) => render_template_response(PageTemplate { view }, StatusCode::OK),
        Err(err) => catalog_error_response(err, state.storefront.chrome()),
    }
}

async fn product_index(State(state): State<HttpState>) -> Response {
    match state.storefront.products().await {
        Ok(view) => render_template_response(ProductListingTemplate { view }, StatusCode::OK),
        Err(err) => catalog_error_response(err, state.storefront.chrome()),
    }
}

async fn product_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    match state.storefront.product(&slug).await {
        Ok(view) => render_template_response(ProductTemplate { view }, StatusCode::OK),
        Err(err) => catalog_error_response(err, state.storefront.chrome()),
    }
}

async fn category_index(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    match state.storefront.category(&slug).await {
        Ok(view) => render_template_response(ProductListingTemplate { view }, StatusCode::OK),
        Err(err) => catalog_error_response(err, state.storefront.chrome()),
    }
}

async fn fallback_router(State(state): State<HttpState>, uri: Uri) -> Response {
    let slug = uri.path().trim_matches('/');
    let chrome = state.storefront.chrome();

    if slug.is_empty() || slug.contains('/') {
        return render_not_found_response(chrome);
    }

    match state.storefront.page(slug).await {
        Ok(view) => render_template_response(PageTemplate { view }, StatusCode::OK),
        Err(err) => catalog_error_response(err, chrome),
    }
}

fn catalog_error_response(err: CatalogError, chrome: LayoutChrome) -> Response {
    match err {
        CatalogError::ProductNotFound(_)
        | CatalogError::CategoryNotFound(_)
        | CatalogError::PageNotFound(_) => {
            let mut response = render_not_found_response(chrome);
            ErrorReport::from_error(
                "infra::http::public::catalog_error_response",
                StatusCode::NOT_FOUND,
                &err,
            )
            .attach(&mut response);
            response
        }
        err => HttpError::from(err).into_response(),
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn sitemap(State(state): State<HttpState>) -> Response {
    match state.sitemap.sitemap_xml().await {
        Ok(body) => xml_response(body),
        Err(err) => HttpError::new(
            "infra::http::public::sitemap",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate sitemap",
            err.to_string(),
        )
        .into_response(),
    }
}

async fn robots_txt(State(state): State<HttpState>) -> Response {
    (
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.sitemap.robots_txt(),
    )
        .into_response()
}

fn xml_response(body: String) -> Response {
    ([(CONTENT_TYPE, "application/xml; charset=utf-8")], body).into_response()
}
