//! Invalidation plan generation.
//!
//! Turns one change event into the ordered list of paths and tags whose
//! cached output is now stale.

use std::fmt;

use serde::Serialize;

use crate::domain::products::Product;

use super::events::{ChangeEvent, ChangeKind};
use super::keys::{CacheKey, HOME_PATH, PRODUCT_TAGS, PRODUCTS_PATH, category_path, product_path};

/// Ordered, duplicate-free keys to invalidate for one event.
///
/// Order: product detail path(s), home and listing paths, category paths,
/// then the fixed product tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InvalidationPlan {
    keys: Vec<CacheKey>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths = self.paths().count();
        write!(
            f,
            "InvalidationPlan {{ paths: {paths}, tags: {} }}",
            self.keys.len() - paths
        )
    }
}

impl InvalidationPlan {
    /// Derive the plan for `event`. Never fails; documents without a slug
    /// simply contribute no detail path.
    pub fn resolve(event: &ChangeEvent) -> Self {
        let mut plan = Self::default();
        let document = &event.document;

        match event.kind {
            ChangeKind::Create | ChangeKind::Update => {
                if document.status.is_published()
                    && let Some(slug) = document.slug()
                {
                    plan.push(CacheKey::path(product_path(slug)));
                }

                if event.kind == ChangeKind::Update
                    && let Some(previous_slug) =
                        renamed_published_slug(event.previous_document.as_ref(), document)
                {
                    plan.push(CacheKey::path(product_path(previous_slug)));
                }
            }
            ChangeKind::Delete => {
                if let Some(slug) = document.slug() {
                    plan.push(CacheKey::path(product_path(slug)));
                }
            }
        }

        plan.push(CacheKey::path(HOME_PATH));
        plan.push(CacheKey::path(PRODUCTS_PATH));

        for category in &document.categories {
            if let Some(slug) = category.resolved_slug() {
                plan.push(CacheKey::path(category_path(slug)));
            }
        }

        for tag in PRODUCT_TAGS {
            plan.push(CacheKey::tag(tag));
        }

        plan
    }

    fn push(&mut self, key: CacheKey) {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    pub fn keys(&self) -> &[CacheKey] {
        &self.keys
    }

    pub fn iter(&self) -> impl Iterator<Item = &CacheKey> {
        self.keys.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().filter_map(|key| match key {
            CacheKey::Path(path) => Some(path.as_str()),
            CacheKey::Tag(_) => None,
        })
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<'a> IntoIterator for &'a InvalidationPlan {
    type Item = &'a CacheKey;
    type IntoIter = std::slice::Iter<'a, CacheKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

/// Previous slug when the product was published under a different slug.
fn renamed_published_slug<'a>(previous: Option<&'a Product>, current: &Product) -> Option<&'a str> {
    let previous = previous?;
    if !previous.status.is_published() {
        return None;
    }
    previous.slug().filter(|slug| Some(*slug) != current.slug())
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::cache::events::ChangeContext;
    use crate::cache::keys::{FEATURED_PRODUCTS_TAG, PRODUCT_CARDS_TAG, PRODUCTS_SITEMAP_TAG};

    fn product(value: Value) -> Product {
        serde_json::from_value(value).expect("product")
    }

    fn published(slug: &str) -> Product {
        product(json!({ "id": 1, "slug": slug, "_status": "published" }))
    }

    fn tags() -> Vec<CacheKey> {
        PRODUCT_TAGS.iter().map(|tag| CacheKey::tag(*tag)).collect()
    }

    #[test]
    fn create_published_without_categories() {
        let event = ChangeEvent::created(published("vase-1"), ChangeContext::default());
        let plan = InvalidationPlan::resolve(&event);

        assert_eq!(
            plan.keys(),
            &[
                CacheKey::path("/products/vase-1"),
                CacheKey::path("/"),
                CacheKey::path("/products"),
                CacheKey::tag(PRODUCTS_SITEMAP_TAG),
                CacheKey::tag(FEATURED_PRODUCTS_TAG),
                CacheKey::tag(PRODUCT_CARDS_TAG),
            ]
        );
    }

    #[test]
    fn draft_create_skips_detail_path() {
        let draft = product(json!({ "id": 1, "slug": "vase-1", "_status": "draft" }));
        let plan = InvalidationPlan::resolve(&ChangeEvent::created(draft, ChangeContext::default()));

        assert!(!plan.contains(&CacheKey::path("/products/vase-1")));
        assert_eq!(plan.len(), 5);
    }

    #[test]
    fn rename_includes_old_and_new_slug() {
        let event = ChangeEvent::updated(
            published("new-vase"),
            Some(published("old-vase")),
            ChangeContext::default(),
        );
        let plan = InvalidationPlan::resolve(&event);

        assert_eq!(plan.keys()[0], CacheKey::path("/products/new-vase"));
        assert_eq!(plan.keys()[1], CacheKey::path("/products/old-vase"));
    }

    #[test]
    fn unchanged_slug_adds_no_previous_path() {
        let event = ChangeEvent::updated(
            published("vase"),
            Some(published("vase")),
            ChangeContext::default(),
        );
        let plan = InvalidationPlan::resolve(&event);

        assert_eq!(plan.paths().filter(|p| p.starts_with("/products/")).count(), 1);
        assert_eq!(plan.len(), 6);
    }

    #[test]
    fn unpublished_previous_slug_is_ignored() {
        let previous = product(json!({ "id": 1, "slug": "old-vase", "_status": "draft" }));
        let event = ChangeEvent::updated(
            published("new-vase"),
            Some(previous),
            ChangeContext::default(),
        );
        let plan = InvalidationPlan::resolve(&event);

        assert!(!plan.contains(&CacheKey::path("/products/old-vase")));
    }

    #[test]
    fn unpublishing_still_clears_old_published_path() {
        let current = product(json!({ "id": 1, "slug": "vase-2", "_status": "draft" }));
        let event = ChangeEvent::updated(current, Some(published("vase")), ChangeContext::default());
        let plan = InvalidationPlan::resolve(&event);

        assert_eq!(plan.keys()[0], CacheKey::path("/products/vase"));
        assert!(!plan.contains(&CacheKey::path("/products/vase-2")));
    }

    #[test]
    fn delete_uses_last_known_slug_regardless_of_status() {
        let doc = product(json!({ "id": 9, "slug": "retired-item", "_status": "draft" }));
        let plan = InvalidationPlan::resolve(&ChangeEvent::deleted(doc, ChangeContext::default()));

        let mut expected = vec![
            CacheKey::path("/products/retired-item"),
            CacheKey::path("/"),
            CacheKey::path("/products"),
        ];
        expected.extend(tags());
        assert_eq!(plan.keys(), expected.as_slice());
    }

    #[test]
    fn resolved_categories_only() {
        let doc = product(json!({
            "id": 1,
            "slug": "vase-1",
            "_status": "published",
            "categories": [
                { "id": 1, "slug": "ceramics", "title": "Ceramics" },
                5,
                { "id": 2, "slug": "" },
                { "id": 3, "slug": "ceramics" },
                { "id": 4, "slug": "home-decor" }
            ]
        }));
        let plan = InvalidationPlan::resolve(&ChangeEvent::created(doc, ChangeContext::default()));

        let categories: Vec<_> = plan
            .paths()
            .filter(|path| path.starts_with("/categories/"))
            .collect();
        assert_eq!(categories, vec!["/categories/ceramics", "/categories/home-decor"]);
        assert_eq!(plan.keys()[3], CacheKey::path("/categories/ceramics"));
        assert_eq!(&plan.keys()[5..], tags().as_slice());
    }

    #[test]
    fn slugless_document_gets_base_keys() {
        let doc = product(json!({ "id": 1, "_status": "published", "slug": "" }));
        let plan = InvalidationPlan::resolve(&ChangeEvent::created(doc, ChangeContext::default()));
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.keys()[0], CacheKey::path("/"));
    }

    #[test]
    fn plan_never_contains_duplicates() {
        let cases = [
            ChangeEvent::updated(published("x"), Some(published("x")), ChangeContext::default()),
            ChangeEvent::updated(published("x"), Some(published("y")), ChangeContext::default()),
            ChangeEvent::deleted(published("x"), ChangeContext::default()),
        ];
        for event in &cases {
            let plan = InvalidationPlan::resolve(event);
            for (index, key) in plan.iter().enumerate() {
                assert!(!plan.keys()[index + 1..].contains(key), "duplicate {key}");
            }
            assert!(plan.contains(&CacheKey::path("/")));
            assert!(plan.contains(&CacheKey::path("/products")));
            for tag in tags() {
                assert!(plan.contains(&tag));
            }
        }
    }

    #[test]
    fn display_counts_paths_and_tags() {
        let plan = InvalidationPlan::resolve(&ChangeEvent::created(
            published("vase-1"),
            ChangeContext::default(),
        ));
        assert_eq!(plan.to_string(), "InvalidationPlan { paths: 3, tags: 3 }");
    }
}
