//! Response cache and product revalidation.
//!
//! Public pages are rendered once and kept in an in-process LRU store,
//! indexed by request path and by the data tags their handlers recorded.
//! When a product changes, the revalidation hooks decide whether anything
//! is stale ([`should_invalidate`]), derive the paths and tags to drop
//! ([`InvalidationPlan::resolve`]) and apply them through a
//! [`CacheInvalidator`] ([`InvalidationExecutor::apply`]).
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enable_response_cache = true
//! response_limit = 200
//! max_body_bytes = 1048576
//! ```

mod classifier;
mod config;
pub mod deps;
mod events;
mod executor;
mod hooks;
mod invalidator;
mod keys;
mod lock;
mod middleware;
mod planner;
mod registry;
mod store;

pub use classifier::should_invalidate;
pub use config::CacheConfig;
pub use events::{ChangeContext, ChangeEvent, ChangeKind, WriteOperation};
pub use executor::{CacheInvalidator, ExecutionSummary, InvalidationError, InvalidationExecutor};
pub use hooks::{RevalidationHooks, RevalidationOutcome, SkipReason};
pub use keys::{
    CacheKey, FEATURED_PRODUCTS_TAG, HOME_PATH, OutputFormat, PRODUCT_CARDS_TAG, PRODUCT_TAGS,
    PRODUCTS_PATH, PRODUCTS_SITEMAP_TAG, ResponseKey, category_path, hash_query, product_path,
};
pub use middleware::{CacheState, response_cache_layer};
pub use planner::InvalidationPlan;
pub use registry::CacheRegistry;
pub use store::{CachedResponse, ResponseStore};
