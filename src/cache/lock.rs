//! Poison-tolerant access to the cache's shared maps.
//!
//! A panic while a guard is held leaves the map usable; the worst case is a
//! stale entry, which the next invalidation or eviction clears.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        report_poisoned(target, op, "read");
        poisoned.into_inner()
    })
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        report_poisoned(target, op, "write");
        poisoned.into_inner()
    })
}

fn report_poisoned(target: &'static str, op: &'static str, access: &'static str) {
    warn!(
        op,
        cache_module = target,
        access,
        "Recovered poisoned cache lock"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn poisoned_lock_is_still_readable() {
        let lock = Arc::new(RwLock::new(vec![1]));
        let poisoner = lock.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.write().expect("lock");
            panic!("poison");
        })
        .join();

        assert!(lock.is_poisoned());
        rw_write(&lock, "test", "push").push(2);
        assert_eq!(*rw_read(&lock, "test", "read"), vec![1, 2]);
    }
}
