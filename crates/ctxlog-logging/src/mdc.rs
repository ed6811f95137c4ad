//! Shared logging context (MDC)
//!
//! An ambient string map per thread, visible to every appender that runs on
//! that thread after it was written. Values written here are not scoped:
//! they stay until overwritten, removed, or cleared.
//!
//! None of the operations panic. When the thread-local map is unavailable
//! (re-entrant access from inside a write, or thread teardown) writes are
//! dropped and reads see an empty map, so log output is never interrupted.

use std::cell::RefCell;
use std::collections::BTreeMap;

thread_local! {
    static MDC: RefCell<BTreeMap<String, String>> = const { RefCell::new(BTreeMap::new()) };
}

fn with_map<R>(f: impl FnOnce(&mut BTreeMap<String, String>) -> R) -> Option<R> {
    MDC.try_with(|cell| cell.try_borrow_mut().ok().map(|mut map| f(&mut map)))
        .ok()
        .flatten()
}

/// Handle to the current thread's shared logging context
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedLoggingContext;

impl SharedLoggingContext {
    /// Insert or overwrite `key`
    pub fn put(key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        with_map(|map| map.insert(key, value));
    }

    pub fn get(key: &str) -> Option<String> {
        with_map(|map| map.get(key).cloned()).flatten()
    }

    pub fn remove(key: &str) -> Option<String> {
        with_map(|map| map.remove(key)).flatten()
    }

    /// Drop every entry on this thread, including sticky extra fields
    pub fn clear() {
        with_map(|map| map.clear());
    }

    /// Copy of the current thread's entries
    pub fn snapshot() -> BTreeMap<String, String> {
        with_map(|map| map.clone()).unwrap_or_default()
    }

    /// Replace the current thread's entries with `entries`
    pub fn restore(entries: BTreeMap<String, String>) {
        with_map(|map| *map = entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        SharedLoggingContext::clear();
        SharedLoggingContext::put("user", "alice");
        assert_eq!(SharedLoggingContext::get("user"), Some("alice".to_string()));

        assert_eq!(SharedLoggingContext::remove("user"), Some("alice".to_string()));
        assert_eq!(SharedLoggingContext::get("user"), None);
    }

    #[test]
    fn test_snapshot_and_restore() {
        SharedLoggingContext::clear();
        SharedLoggingContext::put("a", "1");
        let saved = SharedLoggingContext::snapshot();

        SharedLoggingContext::put("b", "2");
        SharedLoggingContext::put("a", "changed");
        SharedLoggingContext::restore(saved);

        assert_eq!(SharedLoggingContext::get("a"), Some("1".to_string()));
        assert_eq!(SharedLoggingContext::get("b"), None);
    }

    #[test]
    fn test_threads_are_isolated() {
        SharedLoggingContext::clear();
        SharedLoggingContext::put("tenant", "main");

        let seen = std::thread::spawn(|| {
            let before = SharedLoggingContext::get("tenant");
            SharedLoggingContext::put("tenant", "worker");
            before
        })
        .join()
        .unwrap();

        assert_eq!(seen, None);
        assert_eq!(SharedLoggingContext::get("tenant"), Some("main".to_string()));
    }
}
