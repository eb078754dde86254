//! Invalidation executor.
//!
//! Applies a plan against a `CacheInvalidator`, one key at a time. A failing
//! key is logged and counted; the remaining keys are still attempted.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::keys::CacheKey;
use super::planner::InvalidationPlan;

pub(crate) const METRIC_REVALIDATE_KEYS_TOTAL: &str = "vitrine_revalidate_keys_total";
pub(crate) const METRIC_REVALIDATE_APPLY_MS: &str = "vitrine_revalidate_apply_ms";

/// The outbound invalidation primitive failed for one key.
#[derive(Debug, Error)]
pub enum InvalidationError {
    #[error("cache backend failed: {0}")]
    Backend(String),
    #[error("invalidator panicked: {0}")]
    Panicked(String),
}

impl InvalidationError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Something that can mark rendered paths and tagged data as stale.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate_path(&self, path: &str) -> Result<(), InvalidationError>;
    fn invalidate_tag(&self, tag: &str) -> Result<(), InvalidationError>;
}

/// Counts for one executed plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub attempted: usize,
    pub failed: usize,
}

impl ExecutionSummary {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed
    }
}

#[derive(Clone)]
pub struct InvalidationExecutor {
    invalidator: Arc<dyn CacheInvalidator>,
}

impl InvalidationExecutor {
    pub fn new(invalidator: Arc<dyn CacheInvalidator>) -> Self {
        Self { invalidator }
    }

    /// Apply every key in order. Never fails.
    pub fn apply(&self, plan: &InvalidationPlan) -> ExecutionSummary {
        let started_at = Instant::now();
        let mut summary = ExecutionSummary::default();

        for key in plan {
            summary.attempted += 1;

            let outcome = match self.invalidate(key) {
                Ok(()) => "ok",
                Err(err) => {
                    summary.failed += 1;
                    warn!(key = %key, error = %err, "Revalidation failed for key");
                    "failed"
                }
            };

            counter!(
                METRIC_REVALIDATE_KEYS_TOTAL,
                "key_kind" => key.kind_label(),
                "outcome" => outcome
            )
            .increment(1);
        }

        histogram!(METRIC_REVALIDATE_APPLY_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        summary
    }

    fn invalidate(&self, key: &CacheKey) -> Result<(), InvalidationError> {
        if let CacheKey::Path(path) = key {
            info!(path = %path, "Revalidating path");
        }

        let invalidator = &self.invalidator;
        catch_unwind(AssertUnwindSafe(|| match key {
            CacheKey::Path(path) => invalidator.invalidate_path(path),
            CacheKey::Tag(tag) => invalidator.invalidate_tag(tag),
        }))
        .unwrap_or_else(|payload| Err(InvalidationError::Panicked(panic_message(&payload))))
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use serde_json::json;

    use super::*;
    use crate::cache::events::{ChangeContext, ChangeEvent};

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<String>>,
        fail_first: bool,
        panic_on: Option<&'static str>,
    }

    impl Recording {
        fn record(&self, call: String) -> Result<(), InvalidationError> {
            if self.panic_on == Some(call.as_str()) {
                panic!("boom");
            }
            let mut calls = self.calls.lock().expect("calls");
            let first = calls.is_empty();
            calls.push(call);
            if first && self.fail_first {
                return Err(InvalidationError::backend("unreachable"));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls").clone()
        }
    }

    impl CacheInvalidator for Recording {
        fn invalidate_path(&self, path: &str) -> Result<(), InvalidationError> {
            self.record(format!("path:{path}"))
        }

        fn invalidate_tag(&self, tag: &str) -> Result<(), InvalidationError> {
            self.record(format!("tag:{tag}"))
        }
    }

    fn delete_plan() -> InvalidationPlan {
        let doc = serde_json::from_value(json!({ "id": 1, "slug": "retired-item" })).expect("doc");
        InvalidationPlan::resolve(&ChangeEvent::deleted(doc, ChangeContext::default()))
    }

    #[test]
    fn routes_paths_and_tags_in_order() {
        let recording = Arc::new(Recording::default());
        let executor = InvalidationExecutor::new(recording.clone());

        let summary = executor.apply(&delete_plan());

        assert_eq!(summary, ExecutionSummary { attempted: 6, failed: 0 });
        assert_eq!(
            recording.calls(),
            vec![
                "path:/products/retired-item",
                "path:/",
                "path:/products",
                "tag:products-sitemap",
                "tag:featured-products",
                "tag:product-cards",
            ]
        );
    }

    #[test]
    fn first_failure_does_not_stop_the_rest() {
        let recording = Arc::new(Recording {
            fail_first: true,
            ..Default::default()
        });
        let executor = InvalidationExecutor::new(recording.clone());

        let summary = executor.apply(&delete_plan());

        assert_eq!(summary.attempted, 6);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded(), 5);
        assert_eq!(recording.calls().len(), 6);
    }

    #[test]
    fn panicking_invalidator_counts_as_failure() {
        let recording = Arc::new(Recording {
            panic_on: Some("path:/"),
            ..Default::default()
        });
        let executor = InvalidationExecutor::new(recording.clone());

        let summary = executor.apply(&delete_plan());

        assert_eq!(summary, ExecutionSummary { attempted: 6, failed: 1 });
        assert_eq!(recording.calls().len(), 5);
    }

    #[test]
    fn records_key_outcomes() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let recording = Arc::new(Recording {
            fail_first: true,
            ..Default::default()
        });
        let executor = InvalidationExecutor::new(recording);

        metrics::with_local_recorder(&recorder, || {
            executor.apply(&delete_plan());
        });

        let mut failed = 0;
        let mut ok = 0;
        for (key, _, _, value) in snapshotter.snapshot().into_vec() {
            if key.key().name() != METRIC_REVALIDATE_KEYS_TOTAL {
                continue;
            }
            let outcome = key
                .key()
                .labels()
                .find(|label| label.key() == "outcome")
                .map(|label| label.value().to_string());
            if let DebugValue::Counter(count) = value {
                match outcome.as_deref() {
                    Some("failed") => failed += count,
                    Some("ok") => ok += count,
                    _ => {}
                }
            }
        }
        assert_eq!(failed, 1);
        assert_eq!(ok, 5);
    }
}
