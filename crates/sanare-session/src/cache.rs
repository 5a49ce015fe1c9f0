//! Time-boxed in-memory cache of resolved permission sets.
//!
//! Entries are owned exclusively by the cache and replaced wholesale, never
//! mutated in place. An expired entry is a miss for every default caller;
//! serving stale data is an explicit opt-in bounded by a hard ceiling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sanare_types::{GranularPermission, UserId};
// Tokio's Instant so cache freshness follows the (pausable) runtime clock;
// outside a runtime it falls back to the system monotonic clock.
use tokio::time::Instant;

/// Default freshness window for a resolved permission set.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A user's resolved permission set with its freshness bookkeeping.
#[derive(Debug, Clone)]
pub struct CachedPermissionSet {
    pub user_id: UserId,
    pub permissions: Arc<[GranularPermission]>,
    resolved_at: Instant,
    ttl: Duration,
}

impl CachedPermissionSet {
    pub fn new(user_id: UserId, permissions: Vec<GranularPermission>, ttl: Duration) -> Self {
        Self {
            user_id,
            permissions: permissions.into(),
            resolved_at: Instant::now(),
            ttl,
        }
    }

    /// Entry with an explicit resolution instant (restores mirrored entries
    /// and lets tests pin the clock).
    pub fn resolved_at(
        user_id: UserId,
        permissions: Vec<GranularPermission>,
        resolved_at: Instant,
        ttl: Duration,
    ) -> Self {
        Self {
            user_id,
            permissions: permissions.into(),
            resolved_at,
            ttl,
        }
    }

    /// `now - resolved_at > ttl`.
    pub fn is_expired(&self) -> bool {
        self.resolved_at.elapsed() > self.ttl
    }

    /// Time since the set was resolved.
    pub fn age(&self) -> Duration {
        self.resolved_at.elapsed()
    }
}

/// Cache of resolved permission sets, keyed by user.
#[derive(Debug)]
pub struct PermissionCache {
    entries: HashMap<UserId, CachedPermissionSet>,
    default_ttl: Duration,
}

impl PermissionCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
        }
    }

    /// Fresh entry or miss. An expired entry is a miss; it is left in place
    /// for [`PermissionCache::get_stale`] callers until replaced or
    /// invalidated.
    pub fn get(&self, user_id: UserId) -> Option<&CachedPermissionSet> {
        self.entries.get(&user_id).filter(|e| !e.is_expired())
    }

    /// Explicit opt-in: an entry of any freshness up to `max_age`.
    ///
    /// Used by the serve-stale-while-revalidating failure path; never the
    /// default read.
    pub fn get_stale(&self, user_id: UserId, max_age: Duration) -> Option<&CachedPermissionSet> {
        self.entries.get(&user_id).filter(|e| e.age() <= max_age)
    }

    /// Stores a freshly resolved set, replacing any previous entry wholesale.
    pub fn put(&mut self, user_id: UserId, permissions: Vec<GranularPermission>, ttl: Duration) {
        self.entries
            .insert(user_id, CachedPermissionSet::new(user_id, permissions, ttl));
    }

    /// Restores an entry with explicit bookkeeping (mirror warm-up).
    pub fn restore(&mut self, entry: CachedPermissionSet) {
        self.entries.insert(entry.user_id, entry);
    }

    pub fn invalidate(&mut self, user_id: UserId) {
        self.entries.remove(&user_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expired_entry(user_id: UserId, ttl: Duration) -> CachedPermissionSet {
        // resolved_at = now - ttl - 1ms: just past the freshness window.
        CachedPermissionSet::resolved_at(
            user_id,
            Vec::new(),
            Instant::now() - ttl - Duration::from_millis(1),
            ttl,
        )
    }

    #[test]
    fn test_fresh_entry_is_hit() {
        let mut cache = PermissionCache::default();
        let user = UserId::generate();
        cache.put(user, Vec::new(), DEFAULT_TTL);

        assert!(cache.get(user).is_some());
        assert!(!cache.get(user).unwrap().is_expired());
    }

    #[test]
    fn test_expired_entry_is_miss() {
        // An entry resolved ttl + 1ms ago must be treated as a miss.
        let mut cache = PermissionCache::default();
        let user = UserId::generate();
        let ttl = Duration::from_secs(300);
        cache.restore(expired_entry(user, ttl));

        assert!(cache.get(user).is_none());
        // But still reachable through the explicit stale path.
        assert!(cache.get_stale(user, Duration::from_secs(1800)).is_some());
    }

    #[test]
    fn test_stale_ceiling_bounds_opt_in() {
        let mut cache = PermissionCache::default();
        let user = UserId::generate();
        let ttl = Duration::from_secs(300);
        cache.restore(CachedPermissionSet::resolved_at(
            user,
            Vec::new(),
            Instant::now() - Duration::from_secs(3600),
            ttl,
        ));

        // One hour old: beyond a 30-minute ceiling even for stale readers.
        assert!(cache.get_stale(user, Duration::from_secs(1800)).is_none());
    }

    #[test]
    fn test_put_replaces_wholesale() {
        let mut cache = PermissionCache::default();
        let user = UserId::generate();
        let ttl = Duration::from_secs(300);
        cache.restore(expired_entry(user, ttl));

        cache.put(user, Vec::new(), ttl);
        let entry = cache.get(user).expect("fresh after replacement");
        assert!(entry.age() < Duration::from_secs(1));
    }

    #[test]
    fn test_invalidate_removes_entry() {
        let mut cache = PermissionCache::default();
        let user = UserId::generate();
        cache.put(user, Vec::new(), DEFAULT_TTL);

        cache.invalidate(user);
        assert!(cache.get(user).is_none());
        assert!(cache.get_stale(user, Duration::from_secs(3600)).is_none());
    }

    #[test]
    fn test_misses_for_unknown_user() {
        let cache = PermissionCache::default();
        assert!(cache.get(UserId::generate()).is_none());
    }
}
