//! Process-wide TTL cache of known-existing identity keys per import scope.
//!
//! Lives inside `AppState`. Concurrent imports into the same scope share the
//! cached snapshot but are not otherwise coordinated against each other.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::models::voucher::ImportScope;

#[derive(Debug)]
struct Entry {
    keys: HashSet<String>,
    fetched_at: Instant,
}

/// TTL cache keyed by (routerId, profileId).
#[derive(Debug)]
pub struct ScopeCache {
    ttl: Duration,
    entries: Mutex<HashMap<ImportScope, Entry>>,
}

impl ScopeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Keys for a scope if fetched within the freshness window.
    pub fn fresh(&self, scope: &ImportScope) -> Option<HashSet<String>> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(scope)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.keys.clone())
    }

    /// Keys for a scope regardless of age. Fallback when a fresh lookup is
    /// rate limited.
    pub fn any(&self, scope: &ImportScope) -> Option<HashSet<String>> {
        let entries = self.entries.lock().unwrap();
        entries.get(scope).map(|entry| entry.keys.clone())
    }

    /// Replace the cached set for a scope, resetting its age.
    pub fn put(&self, scope: &ImportScope, keys: HashSet<String>) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            scope.clone(),
            Entry {
                keys,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Merge newly written keys into the cached set so a re-import inside
    /// the freshness window still sees them. Keeps the entry's age.
    pub fn extend(&self, scope: &ImportScope, keys: impl IntoIterator<Item = String>) {
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(scope) {
            Some(entry) => entry.keys.extend(keys),
            None => {
                entries.insert(
                    scope.clone(),
                    Entry {
                        keys: keys.into_iter().collect(),
                        fetched_at: Instant::now(),
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> ImportScope {
        ImportScope::new("r1", "p1")
    }

    fn keys(values: &[&str]) -> HashSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn fresh_returns_cached_set_within_ttl() {
        let cache = ScopeCache::new(Duration::from_secs(60));
        cache.put(&scope(), keys(&["a", "b"]));
        assert_eq!(cache.fresh(&scope()), Some(keys(&["a", "b"])));
    }

    #[test]
    fn fresh_misses_after_ttl_but_any_still_serves() {
        let cache = ScopeCache::new(Duration::ZERO);
        cache.put(&scope(), keys(&["a"]));
        assert_eq!(cache.fresh(&scope()), None);
        assert_eq!(cache.any(&scope()), Some(keys(&["a"])));
    }

    #[test]
    fn scopes_are_isolated() {
        let cache = ScopeCache::new(Duration::from_secs(60));
        cache.put(&ImportScope::new("r1", "p1"), keys(&["a"]));
        assert_eq!(cache.fresh(&ImportScope::new("r1", "p2")), None);
    }

    #[test]
    fn extend_merges_into_existing_entry() {
        let cache = ScopeCache::new(Duration::from_secs(60));
        cache.put(&scope(), keys(&["a"]));
        cache.extend(&scope(), ["b".to_string()]);
        assert_eq!(cache.fresh(&scope()), Some(keys(&["a", "b"])));
    }

    #[test]
    fn extend_creates_entry_when_absent() {
        let cache = ScopeCache::new(Duration::from_secs(60));
        cache.extend(&scope(), ["a".to_string()]);
        assert_eq!(cache.fresh(&scope()), Some(keys(&["a"])));
    }
}
