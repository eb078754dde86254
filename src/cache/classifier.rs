//! Decides whether a change needs any invalidation at all.

use super::events::ChangeEvent;

/// False when the caller suppressed revalidation or the write came from the
/// admin surface; true otherwise.
pub fn should_invalidate(event: &ChangeEvent) -> bool {
    !(event.context.disable_revalidate || event.context.is_administrative)
}
