//! Publishes the bot's application commands to discord.
//!
//! A push happens at most once per session unless explicitly requested again with
//! [CommandSync::resync]. Rate limits are retried a bounded number of times, every other
//! failure gives up immediately. Nothing here ever returns an error to the caller,
//! command registration is best effort.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::GuildId;
use tokio::sync::Mutex;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::error::TransportError;
use crate::serenity;

/// The backend that stores the command registry.
#[async_trait]
pub trait CommandRegistry: Send + Sync {
    /// Replace the remote registry with the local commands.
    /// Returns how many commands the backend now has.
    async fn push(&self) -> Result<usize, TransportError>;
}

/// Registers commands through discord's HTTP api.
pub struct HttpRegistry {
    #[allow(clippy::missing_docs_in_private_items)]
    http: Arc<serenity::Http>,
    /// Built from the framework's command list.
    commands: Vec<serenity::CreateCommand>,
    /// Also registered here, guild commands update instantly.
    dev_guild: Option<GuildId>,
}

impl HttpRegistry {
    pub fn new(
        http: Arc<serenity::Http>,
        commands: Vec<serenity::CreateCommand>,
        dev_guild: Option<GuildId>,
    ) -> Self {
        Self {
            http,
            commands,
            dev_guild,
        }
    }
}

#[async_trait]
impl CommandRegistry for HttpRegistry {
    async fn push(&self) -> Result<usize, TransportError> {
        let http: &serenity::Http = &self.http;
        let synced = serenity::Command::set_global_commands(http, self.commands.clone()).await?;

        if let Some(dev_guild) = self.dev_guild {
            // This is faster than global registers, useful for development.
            dev_guild.set_commands(http, self.commands.clone()).await?;
            info!("Registered commands on dev guild {dev_guild}.");
        }

        Ok(synced.len())
    }
}

/// How hard to try when rate limited.
#[derive(Debug, Clone, bon::Builder)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    #[builder(default = 3)]
    max_attempts: u32,
    /// Wait used when a rate limit carries no delay.
    #[builder(default = Duration::from_secs(30))]
    default_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::builder().build()
    }
}

/// Result of a [CommandSync::sync] call.
#[derive(Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The registry was pushed, holding this many commands.
    Synced(usize),
    /// Already pushed this session, nothing was sent.
    AlreadySynced,
    /// Every attempt was rate limited.
    GaveUp { attempts: u32 },
    /// A non rate limit error stopped the sync.
    Failed(TransportError),
}

/// Pushes a [CommandRegistry] once per session.
pub struct CommandSync<R> {
    #[allow(clippy::missing_docs_in_private_items)]
    registry: R,
    #[allow(clippy::missing_docs_in_private_items)]
    policy: RetryPolicy,
    /// Set after the first successful push.
    synced: AtomicBool,
    /// Serializes concurrent callers so they observe each other's push.
    in_flight: Mutex<()>,
}

impl<R: CommandRegistry> CommandSync<R> {
    pub fn new(registry: R, policy: RetryPolicy) -> Self {
        Self {
            registry,
            policy,
            synced: AtomicBool::new(false),
            in_flight: Mutex::new(()),
        }
    }

    /// Has the registry been pushed this session.
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Push the registry unless it has already been pushed this session.
    pub async fn sync(&self) -> SyncOutcome {
        let _guard = self.in_flight.lock().await;

        if self.is_synced() {
            info!("Commands already synced this session");
            return SyncOutcome::AlreadySynced;
        }

        let max_attempts = self.policy.max_attempts;
        let mut attempts = 0;

        while attempts < max_attempts {
            match self.registry.push().await {
                Ok(count) => {
                    self.synced.store(true, Ordering::Release);
                    info!("Synced {count} application commands");
                    return SyncOutcome::Synced(count);
                }
                Err(TransportError::RateLimited { retry_after }) => {
                    attempts += 1;
                    if attempts == max_attempts {
                        break;
                    }
                    let wait = retry_after.unwrap_or(self.policy.default_backoff);
                    warn!(
                        "Rate limited during sync. Retry {attempts}/{max_attempts} in {:.1}s",
                        wait.as_secs_f32()
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(error) => {
                    error!("HTTP error during command sync: {error}");
                    return SyncOutcome::Failed(error);
                }
            }
        }

        error!("Failed to sync commands after {attempts} attempts");
        SyncOutcome::GaveUp { attempts }
    }

    /// Forget the previous push and sync again.
    pub async fn resync(&self) -> SyncOutcome {
        self.synced.store(false, Ordering::Release);
        self.sync().await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    use tokio::time::Instant;

    use super::*;

    /// Replays scripted push results, then succeeds.
    struct FakeRegistry {
        outcomes: std::sync::Mutex<VecDeque<Result<usize, TransportError>>>,
        pushes: AtomicUsize,
    }

    impl FakeRegistry {
        fn new(outcomes: Vec<Result<usize, TransportError>>) -> Self {
            Self {
                outcomes: std::sync::Mutex::new(outcomes.into()),
                pushes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CommandRegistry for FakeRegistry {
        async fn push(&self) -> Result<usize, TransportError> {
            self.pushes.fetch_add(1, Ordering::SeqCst);
            let next = self.outcomes.lock().unwrap().pop_front();
            next.unwrap_or(Ok(5))
        }
    }

    fn limited() -> Result<usize, TransportError> {
        Err(TransportError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
        })
    }

    #[tokio::test]
    async fn second_sync_is_a_no_op() {
        let sync = CommandSync::new(FakeRegistry::new(vec![]), RetryPolicy::default());

        assert_eq!(sync.sync().await, SyncOutcome::Synced(5));
        assert_eq!(sync.sync().await, SyncOutcome::AlreadySynced);
        assert_eq!(sync.registry.pushes.load(Ordering::SeqCst), 1);
        assert!(sync.is_synced());
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt() {
        let registry = FakeRegistry::new(vec![limited(), limited(), Ok(12)]);
        let sync = CommandSync::new(registry, RetryPolicy::default());

        let start = Instant::now();
        assert_eq!(sync.sync().await, SyncOutcome::Synced(12));
        assert!(start.elapsed() >= Duration::from_secs(4));
        assert_eq!(sync.registry.pushes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_three_rate_limits() {
        let registry = FakeRegistry::new(vec![limited(), limited(), limited(), Ok(1)]);
        let sync = CommandSync::new(registry, RetryPolicy::default());

        assert_eq!(sync.sync().await, SyncOutcome::GaveUp { attempts: 3 });
        assert_eq!(sync.registry.pushes.load(Ordering::SeqCst), 3);
        assert!(!sync.is_synced());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_delay_uses_default_backoff() {
        let registry = FakeRegistry::new(vec![Err(TransportError::RateLimited {
            retry_after: None,
        })]);
        let policy = RetryPolicy::builder()
            .default_backoff(Duration::from_secs(45))
            .build();
        let sync = CommandSync::new(registry, policy);

        let start = Instant::now();
        assert_eq!(sync.sync().await, SyncOutcome::Synced(5));
        assert!(start.elapsed() >= Duration::from_secs(45));
    }

    #[tokio::test]
    async fn other_errors_abort_without_retry() {
        let forbidden = TransportError::Http {
            status: 403,
            message: "Missing Access".to_string(),
        };
        let registry = FakeRegistry::new(vec![Err(forbidden.clone())]);
        let sync = CommandSync::new(registry, RetryPolicy::default());

        assert_eq!(sync.sync().await, SyncOutcome::Failed(forbidden));
        assert_eq!(sync.registry.pushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resync_pushes_again() {
        let sync = CommandSync::new(FakeRegistry::new(vec![]), RetryPolicy::default());

        sync.sync().await;
        assert_eq!(sync.resync().await, SyncOutcome::Synced(5));
        assert_eq!(sync.registry.pushes.load(Ordering::SeqCst), 2);
    }
}
