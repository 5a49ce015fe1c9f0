//! Durable mirror of the permission cache.
//!
//! A process restart must not force an immediate resync for an active
//! session, so resolved sets are also written to a local persisted store
//! with the same TTL semantics. The mirror is invalidated in lockstep with
//! the in-memory cache; mirror failures are logged and never fail the
//! in-memory path.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sanare_types::{GranularPermission, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for mirror operations.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("mirror I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("mirror entry is not valid JSON: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Result type for mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

/// A permission set as persisted across restarts.
///
/// Wall-clock timestamps, because monotonic instants do not survive the
/// process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPermissionSet {
    pub user_id: UserId,
    pub permissions: Vec<GranularPermission>,
    pub resolved_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl PersistedPermissionSet {
    pub fn new(user_id: UserId, permissions: Vec<GranularPermission>, ttl: Duration) -> Self {
        Self {
            user_id,
            permissions,
            resolved_at: Utc::now(),
            ttl_secs: ttl.as_secs(),
        }
    }

    /// Same TTL semantics as the in-memory cache: fresh while
    /// `now - resolved_at <= ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.resolved_at);
        age.num_seconds() >= 0 && u64::try_from(age.num_seconds()).is_ok_and(|s| s <= self.ttl_secs)
    }

    /// Age of the entry, saturating to zero for clock skew.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.resolved_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Durable key-value surface keyed by user, TTL-aware.
pub trait MirrorStore: Send + Sync {
    fn load(&self, user_id: UserId) -> Result<Option<PersistedPermissionSet>>;
    fn save(&self, entry: &PersistedPermissionSet) -> Result<()>;
    fn remove(&self, user_id: UserId) -> Result<()>;
}

/// Mirror store writing one JSON file per user under a data directory.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens (and creates if needed) the store directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn entry_path(&self, user_id: UserId) -> PathBuf {
        self.dir.join(format!("{user_id}.json"))
    }
}

impl MirrorStore for JsonFileStore {
    fn load(&self, user_id: UserId) -> Result<Option<PersistedPermissionSet>> {
        let path = self.entry_path(user_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn save(&self, entry: &PersistedPermissionSet) -> Result<()> {
        let path = self.entry_path(entry.user_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(entry)?)?;
        // Atomic replace so a crash mid-write never leaves a torn entry.
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, user_id: UserId) -> Result<()> {
        match fs::remove_file(self.entry_path(user_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
