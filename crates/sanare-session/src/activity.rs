//! Session activity tracking and heartbeats.
//!
//! Two independent periodic triggers, on purpose: the activity heartbeat
//! (30s) keeps `last_activity` current while the session is foregrounded,
//! and the resync heartbeat (5 min) forces a cache invalidation and
//! re-resolution. Activity-liveness and permission-freshness have different
//! cadences and different failure costs, so they never share a timer.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sanare_types::UserId;
use tokio::sync::watch;
use tokio::time::{Instant, interval};
use tracing::{debug, warn};

use crate::refresh::SessionPermissions;

/// Heartbeat cadences.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Updates `last_activity` while foregrounded.
    pub activity_interval: Duration,
    /// Forces invalidate + re-resolution.
    pub resync_interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            activity_interval: Duration::from_secs(30),
            resync_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Tracks the session's last-activity timestamp.
pub struct SessionActivityTracker {
    last_activity: Mutex<Instant>,
    foregrounded: AtomicBool,
}

impl SessionActivityTracker {
    pub fn new() -> Self {
        Self {
            last_activity: Mutex::new(Instant::now()),
            foregrounded: AtomicBool::new(true),
        }
    }

    /// Records activity now.
    pub fn touch(&self) {
        if let Ok(mut last) = self.last_activity.lock() {
            *last = Instant::now();
        }
    }

    /// `(now - last_activity) < timeout`.
    pub fn is_active(&self, session_timeout: Duration) -> bool {
        self.last_activity
            .lock()
            .map(|last| last.elapsed() < session_timeout)
            .unwrap_or(false)
    }

    /// Marks the session foregrounded/backgrounded. The activity heartbeat
    /// only touches while foregrounded.
    pub fn set_foregrounded(&self, foregrounded: bool) {
        self.foregrounded.store(foregrounded, Ordering::SeqCst);
    }

    pub fn is_foregrounded(&self) -> bool {
        self.foregrounded.load(Ordering::SeqCst)
    }

    /// Drives both heartbeats until `shutdown` signals.
    ///
    /// The resync heartbeat invalidates and re-resolves through
    /// [`SessionPermissions`]; concurrent manual invalidations coalesce
    /// with it into a single in-flight fetch.
    pub async fn run_heartbeats(
        &self,
        user_id: UserId,
        session: &SessionPermissions,
        config: HeartbeatConfig,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut activity = interval(config.activity_interval);
        let mut resync = interval(config.resync_interval);
        // The immediate first tick of each interval would touch and resync
        // at startup; skip it.
        activity.tick().await;
        resync.tick().await;

        loop {
            tokio::select! {
                _ = activity.tick() => {
                    if self.is_foregrounded() {
                        self.touch();
                    }
                }
                _ = resync.tick() => {
                    debug!(user = %user_id, "Resync heartbeat: invalidating permission cache");
                    session.invalidate(user_id);
                    if let Err(e) = session.resolve(user_id).await {
                        warn!(user = %user_id, error = %e, "Heartbeat resync failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!(user = %user_id, "Heartbeats stopped");
                        return;
                    }
                }
            }
        }
    }
}

impl Default for SessionActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}
