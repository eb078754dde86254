//! Rendered response storage.

use std::sync::RwLock;

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;

use super::config::CacheConfig;
use super::keys::ResponseKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_RESPONSE_HIT_TOTAL: &str = "vitrine_cache_response_hit_total";
pub(crate) const METRIC_RESPONSE_MISS_TOTAL: &str = "vitrine_cache_response_miss_total";
pub(crate) const METRIC_RESPONSE_EVICT_TOTAL: &str = "vitrine_cache_response_evict_total";

/// Cached HTTP response.
#[derive(Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// LRU store of rendered public responses.
pub struct ResponseStore {
    responses: RwLock<LruCache<ResponseKey, CachedResponse>>,
}

impl ResponseStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            responses: RwLock::new(LruCache::new(config.response_limit_non_zero())),
        }
    }

    pub fn get(&self, key: &ResponseKey) -> Option<CachedResponse> {
        let cached = rw_write(&self.responses, SOURCE, "get").get(key).cloned();
        if cached.is_some() {
            counter!(METRIC_RESPONSE_HIT_TOTAL).increment(1);
        } else {
            counter!(METRIC_RESPONSE_MISS_TOTAL).increment(1);
        }
        cached
    }

    /// Store a response. Returns the key evicted to make room, if any.
    pub fn set(&self, key: ResponseKey, response: CachedResponse) -> Option<ResponseKey> {
        let evicted = rw_write(&self.responses, SOURCE, "set")
            .push(key.clone(), response)
            .map(|(evicted_key, _)| evicted_key)
            .filter(|evicted_key| *evicted_key != key);

        if evicted.is_some() {
            counter!(METRIC_RESPONSE_EVICT_TOTAL).increment(1);
        }
        evicted
    }

    pub fn invalidate(&self, key: &ResponseKey) {
        rw_write(&self.responses, SOURCE, "invalidate").pop(key);
    }

    pub fn invalidate_all(&self) {
        rw_write(&self.responses, SOURCE, "invalidate_all").clear();
    }

    pub fn contains(&self, key: &ResponseKey) -> bool {
        rw_read(&self.responses, SOURCE, "contains").contains(key)
    }

    pub fn len(&self) -> usize {
        rw_read(&self.responses, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::cache::keys::OutputFormat;

    fn key(path: &str) -> ResponseKey {
        ResponseKey::new(OutputFormat::Html, path, "")
    }

    fn response(body: &'static str) -> CachedResponse {
        CachedResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: Bytes::from(body),
        }
    }

    #[test]
    fn roundtrip_and_invalidate() {
        let store = ResponseStore::new(&CacheConfig::default());
        let key = key("/products/vase");

        assert!(store.get(&key).is_none());
        assert!(store.set(key.clone(), response("vase")).is_none());

        let cached = store.get(&key).expect("cached response");
        assert_eq!(cached.status, 200);
        assert_eq!(cached.body, Bytes::from("vase"));

        store.invalidate(&key);
        assert!(store.get(&key).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn evicts_least_recently_used() {
        let store = ResponseStore::new(&CacheConfig {
            response_limit: 2,
            ..Default::default()
        });

        store.set(key("/a"), response("a"));
        store.set(key("/b"), response("b"));
        assert!(store.get(&key("/a")).is_some());

        let evicted = store.set(key("/c"), response("c"));
        assert_eq!(evicted, Some(key("/b")));
        assert!(store.contains(&key("/a")));
        assert!(store.contains(&key("/c")));
    }

    #[test]
    fn replacing_a_key_is_not_an_eviction() {
        let store = ResponseStore::new(&CacheConfig {
            response_limit: 1,
            ..Default::default()
        });
        store.set(key("/a"), response("first"));
        assert!(store.set(key("/a"), response("second")).is_none());
        assert_eq!(store.get(&key("/a")).expect("cached").body, Bytes::from("second"));
    }

    #[test]
    fn recovers_from_poisoned_lock() {
        let store = ResponseStore::new(&CacheConfig::default());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.responses.write().expect("responses lock");
            panic!("poison responses lock");
        }));

        store.set(key("/"), response("home"));
        assert_eq!(store.len(), 1);
    }
}
