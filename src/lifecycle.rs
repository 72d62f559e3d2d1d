//! Connection lifecycle events and the hooks that observe them.
//!
//! Hooks are called in registration order, at most once per physical event.
//! There is no ordering guarantee relative to other framework callbacks, so a hook
//! must not assume that startup work (like extension loading) has finished.

use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;
use tracing::warn;
use url::Url;

/// Something that happened to the connection.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// Every shard of the session is ready.
    Ready(ReadySummary),
    /// A single shard is ready.
    ShardReady { shard_id: u32 },
    /// A single shard resumed its session after a reconnect.
    ShardResumed { shard_id: u32 },
    /// The bot was added to a guild.
    GuildJoined(GuildSummary),
    /// The bot was removed from a guild.
    GuildRemoved(GuildSummary),
}

/// Overview logged once the session is ready.
#[derive(Debug, Clone)]
pub struct ReadySummary {
    /// Name of the bot user.
    pub user: String,
    pub user_id: u64,
    pub guilds: usize,
    pub users: usize,
    pub shard_count: u32,
    /// Gateway heartbeat latency, unknown until the first heartbeat is acknowledged.
    pub latency: Option<Duration>,
    /// Link to add the bot with administrator permissions.
    pub invite: Url,
}

/// A guild as seen by join/remove events.
#[derive(Debug, Clone)]
pub struct GuildSummary {
    /// Missing when the guild wasn't cached.
    pub name: Option<String>,
    pub id: u64,
    pub member_count: Option<u64>,
}

impl Display for GuildSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.name.as_deref().unwrap_or("<unknown>");
        write!(f, "{name} (ID: {})", self.id)
    }
}

/// Observes [LifecycleEvent]s.
pub trait LifecycleHook: Send + Sync {
    /// Used in debug logs.
    fn name(&self) -> &str;
    fn on_event(&self, event: &LifecycleEvent);
}

/// An ordered list of [LifecycleHook]s.
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    #[allow(clippy::missing_docs_in_private_items)]
    hooks: Vec<Arc<dyn LifecycleHook>>,
}

impl LifecycleHooks {
    pub fn register(&mut self, hook: impl LifecycleHook + 'static) {
        tracing::debug!("Registering lifecycle hook '{}'.", hook.name());
        self.hooks.push(Arc::new(hook));
    }

    /// Call every hook with `event`.
    pub fn dispatch(&self, event: &LifecycleEvent) {
        for hook in &self.hooks {
            hook.on_event(event);
        }
    }
}

/// Writes lifecycle events to the log.
pub struct LogHook;

impl LifecycleHook for LogHook {
    fn name(&self) -> &str {
        "log"
    }

    fn on_event(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Ready(summary) => {
                let latency = summary
                    .latency
                    .map_or("n/a".to_string(), |l| format!("{}ms", l.as_millis()));
                info!("{}", "=".repeat(50));
                info!("Bot User: {}", summary.user);
                info!("Bot ID: {}", summary.user_id);
                info!("Total Guilds: {}", summary.guilds);
                info!("Total Users: {}", summary.users);
                info!("Shard Count: {}", summary.shard_count);
                info!("Latency: {latency}");
                info!("{}", "=".repeat(50));
                info!("Invite Link: {}", summary.invite);
            }
            LifecycleEvent::ShardReady { shard_id } => info!("Shard {shard_id} is ready"),
            LifecycleEvent::ShardResumed { shard_id } => {
                info!("Shard {shard_id} resumed connection")
            }
            LifecycleEvent::GuildJoined(guild) => {
                let members = guild
                    .member_count
                    .map_or("?".to_string(), |c| c.to_string());
                info!("Joined new guild: {guild} - Members: {members}")
            }
            LifecycleEvent::GuildRemoved(guild) => warn!("Removed from guild: {guild}"),
        }
    }
}

/// Tracks which shards are ready to tell when the whole session is.
#[derive(Debug, Default)]
pub struct ShardTracker {
    #[allow(clippy::missing_docs_in_private_items)]
    ready: Mutex<HashSet<u32>>,
}

impl ShardTracker {
    /// Mark `shard_id` as ready. Returns `true` only for the call that makes all
    /// `total` shards ready.
    pub async fn shard_ready(&self, shard_id: u32, total: u32) -> bool {
        let mut ready = self.ready.lock().await;
        let newly_ready = ready.insert(shard_id);
        newly_ready && ready.len() == total as usize
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;

    struct Recorder {
        label: &'static str,
        seen: Arc<StdMutex<Vec<String>>>,
    }

    impl LifecycleHook for Recorder {
        fn name(&self) -> &str {
            self.label
        }

        fn on_event(&self, event: &LifecycleEvent) {
            let entry = match event {
                LifecycleEvent::ShardReady { shard_id } => format!("ready {shard_id}"),
                LifecycleEvent::ShardResumed { shard_id } => format!("resumed {shard_id}"),
                other => format!("{other:?}"),
            };
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}: {entry}", self.label));
        }
    }

    #[test]
    fn hooks_run_in_registration_order() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let mut hooks = LifecycleHooks::default();
        hooks.register(Recorder {
            label: "first",
            seen: seen.clone(),
        });
        hooks.register(LogHook);
        hooks.register(Recorder {
            label: "second",
            seen: seen.clone(),
        });

        hooks.dispatch(&LifecycleEvent::ShardReady { shard_id: 3 });
        hooks.dispatch(&LifecycleEvent::ShardResumed { shard_id: 1 });

        assert_eq!(
            *seen.lock().unwrap(),
            [
                "first: ready 3",
                "second: ready 3",
                "first: resumed 1",
                "second: resumed 1"
            ]
        );
    }

    #[tokio::test]
    async fn session_is_ready_once_all_shards_are() {
        let tracker = ShardTracker::default();
        assert!(!tracker.shard_ready(0, 3).await);
        assert!(!tracker.shard_ready(2, 3).await);
        // Duplicate ready from a reconnecting shard.
        assert!(!tracker.shard_ready(2, 3).await);
        assert!(tracker.shard_ready(1, 3).await);
        assert!(!tracker.shard_ready(1, 3).await);
    }

    #[tokio::test]
    async fn single_shard_is_ready_immediately() {
        let tracker = ShardTracker::default();
        assert!(tracker.shard_ready(0, 1).await);
    }

    #[test]
    fn guild_summary_display() {
        let guild = GuildSummary {
            name: None,
            id: 42,
            member_count: None,
        };
        assert_eq!(guild.to_string(), "<unknown> (ID: 42)");
    }
}
