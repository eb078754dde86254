//! `CacheInvalidator` backed by the in-process response cache.

use tracing::debug;

use super::executor::{CacheInvalidator, InvalidationError};
use super::keys::ResponseKey;
use super::middleware::CacheState;

impl CacheState {
    fn drop_keys(&self, keys: impl IntoIterator<Item = ResponseKey>) -> usize {
        let mut dropped = 0;
        for key in keys {
            self.forget(&key);
            dropped += 1;
        }
        dropped
    }
}

impl CacheInvalidator for CacheState {
    fn invalidate_path(&self, path: &str) -> Result<(), InvalidationError> {
        self.advance_generation();
        let dropped = self.drop_keys(self.registry.keys_for_path(path));
        debug!(path, dropped, "invalidated cached path");
        Ok(())
    }

    fn invalidate_tag(&self, tag: &str) -> Result<(), InvalidationError> {
        self.advance_generation();
        let dropped = self.drop_keys(self.registry.keys_for_tag(tag));
        debug!(tag, dropped, "invalidated cached tag");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use bytes::Bytes;

    use super::*;
    use crate::cache::CacheConfig;
    use crate::cache::keys::OutputFormat;
    use crate::cache::store::CachedResponse;

    fn store(state: &CacheState, path: &str, query: &str, tags: &[&str]) -> ResponseKey {
        let key = ResponseKey::new(OutputFormat::Html, path, query);
        state.store.set(
            key.clone(),
            CachedResponse {
                status: 200,
                headers: Vec::new(),
                body: Bytes::from_static(b"ok"),
            },
        );
        state.registry.register(
            key.clone(),
            tags.iter().map(|tag| tag.to_string()).collect::<HashSet<_>>(),
        );
        key
    }

    #[test]
    fn path_invalidation_covers_every_query_variant() {
        let state = CacheState::new(CacheConfig::default());
        let first = store(&state, "/products", "", &[]);
        let second = store(&state, "/products", "page=2", &[]);
        let other = store(&state, "/products/vase", "", &[]);

        state.invalidate_path("/products").expect("invalidate");

        assert!(!state.store.contains(&first));
        assert!(!state.store.contains(&second));
        assert!(state.store.contains(&other));
    }

    #[test]
    fn tag_invalidation_drops_tagged_responses_only() {
        let state = CacheState::new(CacheConfig::default());
        let home = store(&state, "/", "", &["featured-products"]);
        let about = store(&state, "/about", "", &[]);

        state.invalidate_tag("featured-products").expect("invalidate");

        assert!(!state.store.contains(&home));
        assert!(state.store.contains(&about));
        assert!(state.registry.keys_for_tag("featured-products").is_empty());
    }

    #[test]
    fn invalidating_unknown_keys_is_a_no_op() {
        let state = CacheState::new(CacheConfig::default());
        assert!(state.invalidate_path("/nothing").is_ok());
        assert!(state.invalidate_tag("nothing").is_ok());
    }
}
