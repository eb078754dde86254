//! Revalidation hooks for the products collection.
//!
//! The CMS document pipeline calls these after a write has committed. They
//! classify the change, resolve the invalidation plan and apply it, then hand
//! the document back unchanged. Nothing here can fail the write.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::products::Product;

use super::classifier::should_invalidate;
use super::config::CacheConfig;
use super::events::{ChangeContext, ChangeEvent, WriteOperation};
use super::executor::{CacheInvalidator, InvalidationExecutor};
use super::planner::InvalidationPlan;

pub(crate) const METRIC_REVALIDATE_EVENTS_TOTAL: &str = "vitrine_revalidate_events_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Response caching is switched off.
    CacheDisabled,
    /// The change context suppressed revalidation.
    Suppressed,
}

/// What a hook invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RevalidationOutcome {
    Skipped { reason: SkipReason },
    Applied { attempted: usize, failed: usize },
}

impl RevalidationOutcome {
    fn label(&self) -> &'static str {
        match self {
            RevalidationOutcome::Skipped { .. } => "skipped",
            RevalidationOutcome::Applied { failed: 0, .. } => "applied",
            RevalidationOutcome::Applied { .. } => "partial",
        }
    }
}

#[derive(Clone)]
pub struct RevalidationHooks {
    config: CacheConfig,
    executor: InvalidationExecutor,
}

impl RevalidationHooks {
    pub fn new(config: CacheConfig, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        Self {
            config,
            executor: InvalidationExecutor::new(invalidator),
        }
    }

    /// Hook for committed creates and updates. Returns `document` unchanged.
    pub fn after_change(
        &self,
        operation: WriteOperation,
        document: Product,
        previous: Option<Product>,
        context: ChangeContext,
    ) -> Product {
        let event = ChangeEvent {
            kind: operation.into(),
            document,
            previous_document: previous,
            context,
        };
        self.handle(event).0
    }

    /// Hook for committed deletes. Returns `document` unchanged.
    pub fn after_delete(&self, document: Product, context: ChangeContext) -> Product {
        self.handle(ChangeEvent::deleted(document, context)).0
    }

    /// Run the policy for `event` and give back its document with the outcome.
    pub fn handle(&self, event: ChangeEvent) -> (Product, RevalidationOutcome) {
        let outcome = self.revalidate(&event);
        (event.document, outcome)
    }

    #[instrument(skip_all, fields(operation = event.kind.as_str(), product = %event.document.id))]
    pub fn revalidate(&self, event: &ChangeEvent) -> RevalidationOutcome {
        let outcome = if !self.config.is_enabled() {
            debug!("Revalidation skipped: response cache disabled");
            RevalidationOutcome::Skipped {
                reason: SkipReason::CacheDisabled,
            }
        } else if !should_invalidate(event) {
            debug!(
                disable_revalidate = event.context.disable_revalidate,
                is_administrative = event.context.is_administrative,
                "Revalidation skipped by change context"
            );
            RevalidationOutcome::Skipped {
                reason: SkipReason::Suppressed,
            }
        } else {
            let plan = InvalidationPlan::resolve(event);
            debug!(plan = %plan, "Resolved invalidation plan");

            let summary = self.executor.apply(&plan);
            info!(
                attempted = summary.attempted,
                failed = summary.failed,
                "Product revalidation completed for: {}",
                event.document.display_label()
            );
            RevalidationOutcome::Applied {
                attempted: summary.attempted,
                failed: summary.failed,
            }
        };

        counter!(METRIC_REVALIDATE_EVENTS_TOTAL, "outcome" => outcome.label()).increment(1);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::cache::executor::InvalidationError;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<String>>,
    }

    impl CacheInvalidator for Recording {
        fn invalidate_path(&self, path: &str) -> Result<(), InvalidationError> {
            self.calls.lock().expect("calls").push(path.to_string());
            Ok(())
        }

        fn invalidate_tag(&self, tag: &str) -> Result<(), InvalidationError> {
            self.calls.lock().expect("calls").push(tag.to_string());
            Ok(())
        }
    }

    fn product() -> Product {
        serde_json::from_value(json!({
            "id": 11,
            "slug": "vase-1",
            "_status": "published",
            "sku": "V-1"
        }))
        .expect("product")
    }

    fn hooks(config: CacheConfig) -> (RevalidationHooks, Arc<Recording>) {
        let recording = Arc::new(Recording::default());
        (RevalidationHooks::new(config, recording.clone()), recording)
    }

    #[test]
    fn after_change_returns_document_unchanged() {
        let (hooks, recording) = hooks(CacheConfig::default());
        let document = product();

        let returned = hooks.after_change(
            WriteOperation::Create,
            document.clone(),
            None,
            ChangeContext::default(),
        );

        assert_eq!(returned, document);
        assert_eq!(recording.calls.lock().expect("calls").len(), 6);
    }

    #[test]
    fn admin_context_makes_no_calls() {
        let (hooks, recording) = hooks(CacheConfig::default());
        let document = product();

        let (returned, outcome) = hooks.handle(ChangeEvent::updated(
            document.clone(),
            None,
            ChangeContext::admin(),
        ));

        assert_eq!(returned, document);
        assert_eq!(
            outcome,
            RevalidationOutcome::Skipped {
                reason: SkipReason::Suppressed
            }
        );
        assert!(recording.calls.lock().expect("calls").is_empty());
    }

    #[test]
    fn disabled_cache_skips_before_classification() {
        let (hooks, recording) = hooks(CacheConfig::disabled());

        let returned = hooks.after_delete(product(), ChangeContext::default());

        assert_eq!(returned.slug(), Some("vase-1"));
        assert!(recording.calls.lock().expect("calls").is_empty());
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let applied = RevalidationOutcome::Applied {
            attempted: 6,
            failed: 1,
        };
        let json = serde_json::to_value(applied).expect("serialize");
        assert_eq!(json, json!({ "outcome": "applied", "attempted": 6, "failed": 1 }));
        assert_eq!(applied.label(), "partial");

        let skipped = RevalidationOutcome::Skipped {
            reason: SkipReason::CacheDisabled,
        };
        let json = serde_json::to_value(skipped).expect("serialize");
        assert_eq!(json, json!({ "outcome": "skipped", "reason": "cache_disabled" }));
    }
}
