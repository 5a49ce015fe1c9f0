//! # sanare-session: permission caching and session freshness
//!
//! Keeps authorization checks cheap without serving stale decisions
//! indefinitely:
//! - **Time-boxed cache** of resolved permission sets ([`cache`])
//! - **Durable mirror** so a restart does not force an immediate resync
//!   ([`store`])
//! - **Coalesced refresh** with epoch-guarded cancellation and a
//!   last-known-good failure policy ([`refresh`])
//! - **Activity tracking** with independent activity and resync heartbeats
//!   ([`activity`])
//!
//! Checks against the cached set are synchronous and never block on a
//! refresh in flight; a completed refresh swaps the set in atomically.

pub mod activity;
pub mod cache;
pub mod refresh;
pub mod store;

pub use activity::{HeartbeatConfig, SessionActivityTracker};
pub use cache::{CachedPermissionSet, PermissionCache};
pub use refresh::{PermissionSource, ResolveConfig, ResolveError, SessionPermissions, SourceError};
pub use store::{JsonFileStore, MirrorError, MirrorStore, PersistedPermissionSet};
