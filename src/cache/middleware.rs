//! Response cache middleware.
//!
//! Serves repeated GET requests to public routes from the response store.
//! Fresh 200 responses are stored and registered under the tags their
//! handler recorded.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument};

use super::{
    CacheConfig, CacheRegistry, ResponseStore, deps,
    keys::{OutputFormat, ResponseKey},
    store::CachedResponse,
};

/// Shared cache state for middleware and the local invalidator.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<ResponseStore>,
    pub registry: Arc<CacheRegistry>,
    generation: Arc<AtomicU64>,
}

impl CacheState {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            store: Arc::new(ResponseStore::new(&config)),
            registry: Arc::new(CacheRegistry::new()),
            generation: Arc::new(AtomicU64::new(0)),
            config,
        }
    }

    /// Number of invalidations applied so far. A render that started under
    /// an older generation may have read data that is already stale.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(super) fn advance_generation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn forget(&self, key: &ResponseKey) {
        self.store.invalidate(key);
        self.registry.unregister(key);
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.is_enabled() || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = ResponseKey::new(
        detect_format(&request),
        request.uri().path(),
        request.uri().query().unwrap_or(""),
    );

    if let Some(cached) = cache.store.get(&key) {
        debug!(cache = "response", outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    debug!(cache = "response", outcome = "miss", "cache miss, executing handler");

    let generation = cache.generation();
    let (response, tags) = deps::with_collector(next.run(request)).await;

    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    if body.size_hint().lower() > cache.config.max_body_bytes as u64 {
        debug!(cache = "response", "response body too large to cache");
        return Response::from_parts(parts, body);
    }

    let bytes = match axum::body::to_bytes(body, cache.config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(cache = "response", error = %err, "response body not cacheable");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if cache.generation() != generation {
        debug!(cache = "response", "invalidated during render, not caching");
        return Response::from_parts(parts, Body::from(bytes));
    }

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect(),
        body: bytes.clone(),
    };

    debug!(cache = "response", tags = tags.len(), "caching response");

    if let Some(evicted) = cache.store.set(key.clone(), cached) {
        cache.registry.unregister(&evicted);
    }
    cache.registry.register(key.clone(), tags);

    // An invalidation that ran between the check above and the register
    // call may have missed this key.
    if cache.generation() != generation {
        debug!(cache = "response", "invalidated while storing, dropping entry");
        cache.forget(&key);
    }

    Response::from_parts(parts, Body::from(bytes))
}

fn detect_format(request: &Request<Body>) -> OutputFormat {
    if request.uri().path().ends_with("/sitemap.xml") {
        OutputFormat::Sitemap
    } else if request
        .headers()
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"))
    {
        OutputFormat::Json
    } else {
        OutputFormat::Html
    }
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use axum::{Router, middleware, routing::get};
    use tokio::sync::Notify;
    use tower::ServiceExt;

    use super::*;
    use crate::cache::CacheInvalidator;

    fn request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    /// Renders `v{version}`; the first render waits for `release` after
    /// reading the version.
    #[derive(Clone)]
    struct SlowListing {
        version: Arc<AtomicUsize>,
        renders: Arc<AtomicUsize>,
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    async fn render_listing(State(listing): State<SlowListing>) -> String {
        let render = listing.renders.fetch_add(1, Ordering::SeqCst);
        let version = listing.version.load(Ordering::SeqCst);
        if render == 0 {
            listing.started.notify_one();
            listing.release.notified().await;
        }
        format!("v{version}")
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn render_overtaken_by_invalidation_is_not_cached() {
        let cache = CacheState::new(CacheConfig::default());
        let listing = SlowListing {
            version: Arc::new(AtomicUsize::new(1)),
            renders: Arc::new(AtomicUsize::new(0)),
            started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        };
        let router = Router::new()
            .route("/products", get(render_listing))
            .with_state(listing.clone())
            .layer(middleware::from_fn_with_state(
                cache.clone(),
                response_cache_layer,
            ));

        let in_flight = tokio::spawn(router.clone().oneshot(request("/products")));
        listing.started.notified().await;

        listing.version.store(2, Ordering::SeqCst);
        cache.invalidate_path("/products").unwrap();
        listing.release.notify_one();

        let stale = in_flight.await.unwrap().unwrap();
        assert_eq!(body_text(stale).await, "v1");

        let fresh = router.clone().oneshot(request("/products")).await.unwrap();
        assert_eq!(body_text(fresh).await, "v2");
        assert_eq!(listing.renders.load(Ordering::SeqCst), 2);

        let cached = router.oneshot(request("/products")).await.unwrap();
        assert_eq!(body_text(cached).await, "v2");
        assert_eq!(listing.renders.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalidations_advance_the_generation() {
        let cache = CacheState::new(CacheConfig::default());
        assert_eq!(cache.generation(), 0);
        cache.invalidate_path("/products").unwrap();
        cache.invalidate_tag("product-cards").unwrap();
        assert_eq!(cache.generation(), 2);
    }

    #[test]
    fn detect_format_html_default() {
        assert_eq!(detect_format(&request("/products/vase")), OutputFormat::Html);
    }

    #[test]
    fn detect_format_sitemap() {
        assert_eq!(detect_format(&request("/sitemap.xml")), OutputFormat::Sitemap);
    }

    #[test]
    fn detect_format_json_from_accept_header() {
        let req = Request::builder()
            .uri("/products")
            .header("Accept", "application/json")
            .body(Body::empty())
            .unwrap();
        assert_eq!(detect_format(&req), OutputFormat::Json);
    }
}
