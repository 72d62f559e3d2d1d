//! This module contains everything relating to [Data].

mod session;

use std::sync::Arc;

use tokio::sync::watch;

use crate::extensions::ExtensionRecord;
use crate::lifecycle::LifecycleHooks;
use crate::lifecycle::ShardTracker;
use crate::sync::CommandSync;
use crate::sync::HttpRegistry;
pub use session::SessionInfo;

/// The data kept between shards
pub struct Data {
    /// Read-only facts about this session.
    pub session: Arc<SessionInfo>,
    /// Which extensions loaded at startup.
    pub extensions: ExtensionRecord,
    /// Pushes the command registry, also used by the `sync` command.
    pub sync: Arc<CommandSync<HttpRegistry>>,
    /// Text command prefix.
    pub prefix: String,
    /// Observers of connection lifecycle events.
    pub hooks: LifecycleHooks,
    /// Fired once every shard is ready.
    pub ready: ReadySignal,
    /// Shards that reported ready this session.
    pub shards: ShardTracker,
}

/// A one-way latch that flips when the session becomes ready.
/// Waiting after the flip returns immediately.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    #[allow(clippy::missing_docs_in_private_items)]
    tx: Arc<watch::Sender<bool>>,
}

impl ReadySignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }

    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Suspend until [ReadySignal::mark_ready] has been called at least once.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this can't observe a closed channel.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn late_waiters_see_earlier_ready() {
        let ready = ReadySignal::new();
        ready.mark_ready();
        tokio::time::timeout(Duration::from_secs(1), ready.wait())
            .await
            .expect("ready was already signalled");
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_block_until_ready() {
        let ready = ReadySignal::new();
        assert!(!ready.is_ready());

        let waiter = tokio::spawn({
            let ready = ready.clone();
            async move { ready.wait().await }
        });
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!waiter.is_finished());

        ready.mark_ready();
        waiter.await.unwrap();
        assert!(ready.is_ready());
    }
}
