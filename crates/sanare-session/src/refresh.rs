//! Coalesced permission refresh with epoch-guarded cancellation.
//!
//! Resolution is the only suspending operation in the authorization core.
//! Checks never block on it: they read the last-known-good cached set until
//! a refresh completes and swaps the new set in atomically (whole-entry
//! replacement under one lock).
//!
//! Concurrent refresh triggers coalesce: the first caller becomes the
//! leader and performs the fetch, later callers await the leader's
//! watch-channel rendezvous and then read the cache. A refresh in flight
//! when the session ends is abandoned via an epoch counter — its result is
//! discarded, never applied to a torn-down session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sanare_types::{GranularPermission, UserId};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::time::{Instant, timeout};
use tracing::{debug, warn};

use crate::cache::{CachedPermissionSet, DEFAULT_TTL, PermissionCache};
use crate::store::{MirrorStore, PersistedPermissionSet};

/// Error reported by the external permission source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("permission source unavailable: {0}")]
    Unavailable(String),
}

/// External collaborator: fetches a user's granted permissions.
///
/// Reads are eventually consistent; the cache layer owns freshness.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    async fn fetch_permissions(&self, user_id: UserId)
    -> Result<Vec<GranularPermission>, SourceError>;
}

/// Resolution failure surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The session ended while the refresh was in flight; the fetched
    /// result was discarded.
    #[error("session ended during refresh")]
    SessionEnded,

    /// No fresh set, no last-known-good within the stale ceiling. Callers
    /// must deny all access.
    #[error("permissions unavailable beyond the stale ceiling; deny all")]
    DenyAll,
}

/// Freshness and failure-policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct ResolveConfig {
    /// Freshness window of a resolved set.
    pub ttl: Duration,
    /// Hard ceiling on serving stale data when the source fails.
    pub stale_ceiling: Duration,
    /// A refresh not finishing within this window is a failure.
    pub fetch_timeout: Duration,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            stale_ceiling: Duration::from_secs(30 * 60),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

enum Role {
    Leader(watch::Sender<()>),
    Follower(watch::Receiver<()>),
}

/// A session's resolved permissions: cache, durable mirror, and coalesced
/// refresh against the external source.
pub struct SessionPermissions {
    cache: Mutex<PermissionCache>,
    mirror: Option<Box<dyn MirrorStore>>,
    source: Arc<dyn PermissionSource>,
    inflight: AsyncMutex<HashMap<UserId, watch::Receiver<()>>>,
    /// Bumped on session end; a refresh started under an older epoch
    /// discards its result.
    epoch: AtomicU64,
    config: ResolveConfig,
}

impl SessionPermissions {
    pub fn new(source: Arc<dyn PermissionSource>, config: ResolveConfig) -> Self {
        Self {
            cache: Mutex::new(PermissionCache::new(config.ttl)),
            mirror: None,
            source,
            inflight: AsyncMutex::new(HashMap::new()),
            epoch: AtomicU64::new(0),
            config,
        }
    }

    /// Attaches the durable mirror (§ same TTL semantics, lockstep
    /// invalidation).
    pub fn with_mirror(mut self, mirror: Box<dyn MirrorStore>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Synchronous, non-blocking view of the last-known-good set.
    ///
    /// Serves entries up to the stale ceiling so checks keep working while
    /// a refresh is in flight. Returns `None` when nothing usable is
    /// cached; callers deny until [`SessionPermissions::resolve`] succeeds.
    pub fn cached(&self, user_id: UserId) -> Option<Arc<[GranularPermission]>> {
        let cache = self.cache.lock().ok()?;
        cache
            .get_stale(user_id, self.config.stale_ceiling)
            .map(|e| e.permissions.clone())
    }

    /// Resolves a fresh permission set: cache, then mirror, then a
    /// coalesced fetch from the source.
    pub async fn resolve(
        &self,
        user_id: UserId,
    ) -> Result<Arc<[GranularPermission]>, ResolveError> {
        if let Some(fresh) = self.fresh_cached(user_id) {
            return Ok(fresh);
        }

        if let Some(restored) = self.warm_up_from_mirror(user_id) {
            return Ok(restored);
        }

        match self.join_or_lead(user_id).await {
            Role::Follower(mut rx) => {
                // Resolves when the leader finishes (value or sender drop).
                let _ = rx.changed().await;
                match self.fresh_cached(user_id) {
                    Some(fresh) => Ok(fresh),
                    None => self.last_known_good(user_id),
                }
            }
            Role::Leader(tx) => {
                let epoch = self.epoch.load(Ordering::SeqCst);
                let fetched = timeout(
                    self.config.fetch_timeout,
                    self.source.fetch_permissions(user_id),
                )
                .await;

                let outcome = match fetched {
                    Ok(Ok(permissions)) => {
                        if self.epoch.load(Ordering::SeqCst) == epoch {
                            Ok(self.apply(user_id, permissions))
                        } else {
                            debug!(user = %user_id, "Discarding refresh for ended session");
                            Err(ResolveError::SessionEnded)
                        }
                    }
                    Ok(Err(e)) => {
                        warn!(user = %user_id, error = %e, "Permission fetch failed");
                        self.last_known_good(user_id)
                    }
                    Err(_elapsed) => {
                        warn!(
                            user = %user_id,
                            timeout = ?self.config.fetch_timeout,
                            "Permission fetch timed out"
                        );
                        self.last_known_good(user_id)
                    }
                };

                // The rendezvous entry is cleared only after the cache
                // reflects the outcome: a trigger arriving now sees the
                // fresh entry instead of starting a duplicate fetch.
                self.inflight.lock().await.remove(&user_id);

                // Dropping the sender wakes every follower.
                drop(tx);
                outcome
            }
        }
    }

    /// Removes the user's entry from memory and mirror in lockstep.
    pub fn invalidate(&self, user_id: UserId) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.invalidate(user_id);
        }
        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.remove(user_id) {
                warn!(user = %user_id, error = %e, "Mirror invalidation failed");
            }
        }
    }

    /// Invalidation hook for any component that mutates roles/permissions.
    pub fn on_permissions_changed(&self, user_id: UserId) {
        debug!(user = %user_id, "Permissions changed; invalidating cache");
        self.invalidate(user_id);
    }

    /// Ends the session: bumps the epoch so an in-flight refresh discards
    /// its result, and drops the cached set.
    pub fn end_session(&self, user_id: UserId) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.invalidate(user_id);
    }

    fn fresh_cached(&self, user_id: UserId) -> Option<Arc<[GranularPermission]>> {
        let cache = self.cache.lock().ok()?;
        cache.get(user_id).map(|e| e.permissions.clone())
    }

    /// Restores a fresh mirrored entry after a restart, preserving its
    /// original resolution time so the TTL window is not extended.
    fn warm_up_from_mirror(&self, user_id: UserId) -> Option<Arc<[GranularPermission]>> {
        let mirror = self.mirror.as_ref()?;
        let entry = match mirror.load(user_id) {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(user = %user_id, error = %e, "Mirror read failed");
                return None;
            }
        };

        let now = Utc::now();
        if !entry.is_fresh(now) {
            return None;
        }

        let resolved_at = Instant::now()
            .checked_sub(entry.age(now))
            .unwrap_or_else(Instant::now);
        let restored = CachedPermissionSet::resolved_at(
            user_id,
            entry.permissions,
            resolved_at,
            Duration::from_secs(entry.ttl_secs),
        );
        let permissions = restored.permissions.clone();
        if let Ok(mut cache) = self.cache.lock() {
            cache.restore(restored);
        }
        debug!(user = %user_id, "Warmed permission cache from mirror");
        Some(permissions)
    }

    async fn join_or_lead(&self, user_id: UserId) -> Role {
        let mut inflight = self.inflight.lock().await;
        if let Some(rx) = inflight.get(&user_id) {
            Role::Follower(rx.clone())
        } else {
            let (tx, rx) = watch::channel(());
            inflight.insert(user_id, rx);
            Role::Leader(tx)
        }
    }

    /// Atomic swap of the resolved set, mirrored durably.
    fn apply(&self, user_id: UserId, permissions: Vec<GranularPermission>) -> Arc<[GranularPermission]> {
        if let Some(mirror) = &self.mirror {
            let entry =
                PersistedPermissionSet::new(user_id, permissions.clone(), self.config.ttl);
            if let Err(e) = mirror.save(&entry) {
                warn!(user = %user_id, error = %e, "Mirror write failed");
            }
        }

        let mut cache = match self.cache.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.put(user_id, permissions, self.config.ttl);
        cache
            .get(user_id)
            .map(|e| e.permissions.clone())
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Failure policy: serve the last-known-good set within the stale
    /// ceiling, otherwise deny all.
    fn last_known_good(
        &self,
        user_id: UserId,
    ) -> Result<Arc<[GranularPermission]>, ResolveError> {
        let cache = self.cache.lock().map_err(|_| ResolveError::DenyAll)?;
        match cache.get_stale(user_id, self.config.stale_ceiling) {
            Some(entry) => {
                warn!(
                    user = %user_id,
                    age = ?entry.age(),
                    "Serving last-known-good permissions after refresh failure"
                );
                Ok(entry.permissions.clone())
            }
            None => Err(ResolveError::DenyAll),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonFileStore;
    use sanare_types::{PermissionActions, PermissionLevel, ResourceType};
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    struct CountingSource {
        fetches: AtomicUsize,
        delay: Duration,
        fail: AtomicBool,
    }

    impl CountingSource {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                fetches: AtomicUsize::new(0),
                delay,
                fail: AtomicBool::new(false),
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl PermissionSource for CountingSource {
        async fn fetch_permissions(
            &self,
            _user_id: UserId,
        ) -> Result<Vec<GranularPermission>, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(SourceError::Unavailable("backend offline".to_string()));
            }
            Ok(vec![GranularPermission::new(
                ResourceType::Patients,
                PermissionActions::read_only(),
                PermissionLevel::Department,
            )])
        }
    }

    fn short_config() -> ResolveConfig {
        ResolveConfig {
            ttl: Duration::from_millis(100),
            stale_ceiling: Duration::from_millis(400),
            fetch_timeout: Duration::from_secs(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesced_refresh_single_fetch() {
        // Concurrent triggers must share exactly one underlying fetch.
        let source = CountingSource::new(Duration::from_millis(50));
        let session = SessionPermissions::new(source.clone(), short_config());
        let user = UserId::generate();

        let (a, b) = tokio::join!(session.resolve(user), session.resolve(user));
        assert_eq!(a.expect("leader resolves").len(), 1);
        assert_eq!(b.expect("follower resolves").len(), 1);
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_after_completion_hits_fresh_cache() {
        // The leader applies the fetched set before releasing the
        // rendezvous, so a trigger landing right after completion is a
        // cache hit, never a duplicate fetch.
        let source = CountingSource::new(Duration::from_millis(50));
        let session = SessionPermissions::new(source.clone(), short_config());
        let user = UserId::generate();

        let (a, b, c) = tokio::join!(
            session.resolve(user),
            session.resolve(user),
            session.resolve(user)
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        session.resolve(user).await.expect("post-completion resolve");
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_cache_hit_skips_fetch() {
        let source = CountingSource::new(Duration::from_millis(1));
        let session = SessionPermissions::new(source.clone(), short_config());
        let user = UserId::generate();

        session.resolve(user).await.expect("first resolve");
        session.resolve(user).await.expect("second resolve");
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refetch() {
        let source = CountingSource::new(Duration::from_millis(1));
        let session = SessionPermissions::new(source.clone(), short_config());
        let user = UserId::generate();

        session.resolve(user).await.expect("resolve");
        session.on_permissions_changed(user);
        session.resolve(user).await.expect("resolve after change");
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_serves_last_known_good() {
        let source = CountingSource::new(Duration::from_millis(1));
        let session = SessionPermissions::new(source.clone(), short_config());
        let user = UserId::generate();

        session.resolve(user).await.expect("initial resolve");

        // Past TTL but within the stale ceiling; the source is now down.
        tokio::time::sleep(Duration::from_millis(200)).await;
        source.set_failing(true);

        let permissions = session.resolve(user).await.expect("stale fallback");
        assert_eq!(permissions.len(), 1);
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deny_all_beyond_stale_ceiling() {
        let source = CountingSource::new(Duration::from_millis(1));
        let session = SessionPermissions::new(source.clone(), short_config());
        let user = UserId::generate();

        session.resolve(user).await.expect("initial resolve");

        // Catastrophically stale: beyond the ceiling.
        tokio::time::sleep(Duration::from_millis(500)).await;
        source.set_failing(true);

        assert_eq!(session.resolve(user).await, Err(ResolveError::DenyAll));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_fallback_denies_all() {
        let slow = CountingSource::new(Duration::from_secs(60));
        let session = SessionPermissions::new(slow.clone(), short_config());
        let user = UserId::generate();

        assert_eq!(session.resolve(user).await, Err(ResolveError::DenyAll));
        assert_eq!(slow.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_discards_inflight_result() {
        let source = CountingSource::new(Duration::from_millis(50));
        let session = SessionPermissions::new(source.clone(), short_config());
        let user = UserId::generate();

        let (resolved, ()) = tokio::join!(session.resolve(user), async {
            // End the session while the fetch is in flight.
            tokio::time::sleep(Duration::from_millis(1)).await;
            session.end_session(user);
        });

        assert_eq!(resolved, Err(ResolveError::SessionEnded));
        assert!(session.cached(user).is_none(), "discarded result must not land");
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_serves_stale_within_ceiling_only() {
        let source = CountingSource::new(Duration::from_millis(1));
        let session = SessionPermissions::new(source.clone(), short_config());
        let user = UserId::generate();

        assert!(session.cached(user).is_none());
        session.resolve(user).await.expect("resolve");

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(session.cached(user).is_some(), "stale but within ceiling");

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(session.cached(user).is_none(), "beyond ceiling");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mirror_warm_up_avoids_fetch() {
        let dir = tempdir().expect("tempdir");
        let user = UserId::generate();
        let config = ResolveConfig::default();

        // First process: resolve and mirror.
        let source = CountingSource::new(Duration::from_millis(1));
        let session = SessionPermissions::new(source.clone(), config)
            .with_mirror(Box::new(JsonFileStore::open(dir.path()).expect("open")));
        session.resolve(user).await.expect("resolve");
        assert_eq!(source.fetches(), 1);

        // Restarted process: fresh source, same mirror directory.
        let source2 = CountingSource::new(Duration::from_millis(1));
        let session2 = SessionPermissions::new(source2.clone(), config)
            .with_mirror(Box::new(JsonFileStore::open(dir.path()).expect("reopen")));
        let permissions = session2.resolve(user).await.expect("warm resolve");
        assert_eq!(permissions.len(), 1);
        assert_eq!(source2.fetches(), 0, "mirror hit must not fetch");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_removes_mirror_in_lockstep() {
        let dir = tempdir().expect("tempdir");
        let user = UserId::generate();

        let source = CountingSource::new(Duration::from_millis(1));
        let session = SessionPermissions::new(source.clone(), ResolveConfig::default())
            .with_mirror(Box::new(JsonFileStore::open(dir.path()).expect("open")));
        session.resolve(user).await.expect("resolve");
        session.invalidate(user);

        let mirror = JsonFileStore::open(dir.path()).expect("reopen");
        assert!(mirror.load(user).expect("load").is_none());
    }
}
