//! Tag and path index over stored responses.
//!
//! Each stored response is registered under its request path and the data
//! tags its handler recorded, so a revalidation by path or by tag can find
//! exactly the responses it makes stale.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::ResponseKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

#[derive(Default)]
struct Index {
    tag_to_keys: HashMap<String, HashSet<ResponseKey>>,
    path_to_keys: HashMap<String, HashSet<ResponseKey>>,
    key_to_tags: HashMap<ResponseKey, HashSet<String>>,
}

impl Index {
    fn remove(&mut self, key: &ResponseKey) {
        if let Some(tags) = self.key_to_tags.remove(key) {
            for tag in tags {
                detach(&mut self.tag_to_keys, &tag, key);
            }
        }
        detach(&mut self.path_to_keys, &key.path, key);
    }
}

fn detach(map: &mut HashMap<String, HashSet<ResponseKey>>, name: &str, key: &ResponseKey) {
    if let Some(keys) = map.get_mut(name) {
        keys.remove(key);
        if keys.is_empty() {
            map.remove(name);
        }
    }
}

pub struct CacheRegistry {
    index: RwLock<Index>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self {
            index: RwLock::new(Index::default()),
        }
    }

    /// Register a stored response under its path and the given tags.
    /// Re-registering a key replaces its previous tags.
    pub fn register(&self, key: ResponseKey, tags: HashSet<String>) {
        let mut index = rw_write(&self.index, SOURCE, "register");
        index.remove(&key);

        for tag in &tags {
            index
                .tag_to_keys
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        index
            .path_to_keys
            .entry(key.path.clone())
            .or_default()
            .insert(key.clone());
        index.key_to_tags.insert(key, tags);
    }

    pub fn keys_for_tag(&self, tag: &str) -> HashSet<ResponseKey> {
        rw_read(&self.index, SOURCE, "keys_for_tag")
            .tag_to_keys
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    pub fn keys_for_path(&self, path: &str) -> HashSet<ResponseKey> {
        rw_read(&self.index, SOURCE, "keys_for_path")
            .path_to_keys
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    pub fn tags_for_key(&self, key: &ResponseKey) -> HashSet<String> {
        rw_read(&self.index, SOURCE, "tags_for_key")
            .key_to_tags
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop every mapping of a key. Called on eviction and invalidation.
    pub fn unregister(&self, key: &ResponseKey) {
        rw_write(&self.index, SOURCE, "unregister").remove(key);
    }

    pub fn clear(&self) {
        *rw_write(&self.index, SOURCE, "clear") = Index::default();
    }

    pub fn key_count(&self) -> usize {
        rw_read(&self.index, SOURCE, "key_count").key_to_tags.len()
    }

    pub fn tag_count(&self) -> usize {
        rw_read(&self.index, SOURCE, "tag_count").tag_to_keys.len()
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys::OutputFormat;

    fn tags(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn lookup_by_tag_and_path() {
        let registry = CacheRegistry::new();
        let home = ResponseKey::new(OutputFormat::Html, "/", "");
        let listing = ResponseKey::new(OutputFormat::Html, "/products", "page=2");

        registry.register(home.clone(), tags(&["featured-products"]));
        registry.register(listing.clone(), tags(&["product-cards", "featured-products"]));

        assert_eq!(registry.keys_for_tag("featured-products").len(), 2);
        assert!(registry.keys_for_tag("product-cards").contains(&listing));
        assert!(registry.keys_for_path("/products").contains(&listing));
        assert!(registry.keys_for_path("/missing").is_empty());
        assert_eq!(registry.tags_for_key(&home), tags(&["featured-products"]));
    }

    #[test]
    fn unregister_cleans_up_mappings() {
        let registry = CacheRegistry::new();
        let key = ResponseKey::new(OutputFormat::Html, "/products/vase", "");

        registry.register(key.clone(), tags(&["product-cards"]));
        assert_eq!(registry.key_count(), 1);
        assert_eq!(registry.tag_count(), 1);

        registry.unregister(&key);
        assert_eq!(registry.key_count(), 0);
        assert_eq!(registry.tag_count(), 0);
        assert!(registry.keys_for_path("/products/vase").is_empty());
    }

    #[test]
    fn reregister_replaces_tags() {
        let registry = CacheRegistry::new();
        let key = ResponseKey::new(OutputFormat::Html, "/", "");

        registry.register(key.clone(), tags(&["product-cards"]));
        registry.register(key.clone(), tags(&["featured-products"]));

        assert!(registry.keys_for_tag("product-cards").is_empty());
        assert!(registry.keys_for_tag("featured-products").contains(&key));
    }

    #[test]
    fn untagged_responses_are_still_indexed_by_path() {
        let registry = CacheRegistry::new();
        let key = ResponseKey::new(OutputFormat::Html, "/about", "");

        registry.register(key.clone(), HashSet::new());
        assert!(registry.keys_for_path("/about").contains(&key));

        registry.clear();
        assert_eq!(registry.key_count(), 0);
    }
}
