//! Per-request cache tag collector.
//!
//! Handlers call [`record`] for every data tag their output depends on. The
//! response cache layer runs the handler inside [`with_collector`] and
//! registers the stored response under the collected tags.

use std::cell::RefCell;
use std::collections::HashSet;
use std::future::Future;

tokio::task_local! {
    static TAGS: RefCell<HashSet<String>>;
}

/// Record a tag for the current request. Ignored outside a collector.
pub fn record(tag: &str) {
    let _ = TAGS.try_with(|tags| {
        tags.borrow_mut().insert(tag.to_string());
    });
}

/// Tags recorded so far; empty outside a collector.
pub fn collect() -> HashSet<String> {
    TAGS.try_with(|tags| tags.borrow().clone())
        .unwrap_or_default()
}

/// Run `future` with a fresh collector and return its output together with
/// the recorded tags.
pub async fn with_collector<F, R>(future: F) -> (R, HashSet<String>)
where
    F: Future<Output = R>,
{
    TAGS.scope(RefCell::new(HashSet::new()), async move {
        let result = future.await;
        (result, collect())
    })
    .await
}
