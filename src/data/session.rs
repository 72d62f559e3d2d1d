//! Facts about the current connection session.

use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use chrono::DateTime;
use chrono::Utc;

use crate::serenity;

/// Owned by the bootstrap, shared read-only with commands and callbacks.
#[derive(Debug)]
pub struct SessionInfo {
    /// Wall clock time the process started.
    started_at: DateTime<Utc>,
    /// Monotonic start, used for uptime.
    started: Instant,
    /// The application this bot belongs to.
    application_id: serenity::ApplicationId,
    /// Known once every shard is ready, 0 before that.
    shard_count: AtomicU32,
}

impl SessionInfo {
    pub fn new(application_id: serenity::ApplicationId) -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
            application_id,
            shard_count: AtomicU32::new(0),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn application_id(&self) -> serenity::ApplicationId {
        self.application_id
    }

    pub fn shard_count(&self) -> u32 {
        self.shard_count.load(Ordering::Relaxed)
    }

    pub(crate) fn set_shard_count(&self, count: u32) {
        self.shard_count.store(count, Ordering::Relaxed);
    }
}
