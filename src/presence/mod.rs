//! Rotates the bot's presence on a timer.
//!
//! The rotator idles until the session is ready, then applies one presence per tick:
//! - On success the cycle advances.
//! - On a rate limit the cycle still advances, and the tick sleeps for the requested backoff.
//! - On any other failure the cycle stays put, so the same presence is tried next tick.

mod cycle;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::error;
use tracing::info;
use tracing::instrument;
use tracing::warn;

pub use cycle::ActivityKind;
pub use cycle::PresenceCycle;
pub use cycle::PresenceDescriptor;
pub use cycle::Status;

use crate::data::ReadySignal;
use crate::error::TransportError;
use crate::serenity;

/// Something a presence can be applied to.
#[async_trait]
pub trait PresenceSink: Send + Sync {
    /// Show `presence` with `status`.
    async fn apply(&self, presence: &PresenceDescriptor, status: Status)
        -> Result<(), TransportError>;
}

/// Applies presences to every shard of a running client.
#[derive(Clone)]
pub struct ShardPresence {
    #[allow(clippy::missing_docs_in_private_items)]
    manager: Arc<serenity::ShardManager>,
}

impl ShardPresence {
    pub fn new(manager: Arc<serenity::ShardManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl PresenceSink for ShardPresence {
    async fn apply(
        &self,
        presence: &PresenceDescriptor,
        status: Status,
    ) -> Result<(), TransportError> {
        let runners = self.manager.runners.lock().await;
        if runners.is_empty() {
            return Err(TransportError::NotConnected);
        }

        for info in runners.values() {
            info.runner_tx
                .set_presence(Some(presence.to_activity()), status.into());
        }
        Ok(())
    }
}

/// Periodically applies the next presence of a [PresenceCycle].
pub struct PresenceRotator<S> {
    /// Presences to show.
    cycle: PresenceCycle,
    /// Where presences are applied.
    sink: S,
    /// Status shown with every presence.
    status: Status,
    /// Time between ticks.
    interval: Duration,
    /// Wait used when a rate limit carries no delay.
    default_backoff: Duration,
}

impl<S: PresenceSink + 'static> PresenceRotator<S> {
    pub fn new(
        cycle: PresenceCycle,
        sink: S,
        status: Status,
        interval: Duration,
        default_backoff: Duration,
    ) -> Self {
        Self {
            cycle,
            sink,
            status,
            interval,
            default_backoff,
        }
    }

    /// Run the rotation on its own task.
    pub fn spawn(self, ready: ReadySignal) -> JoinHandle<()> {
        tokio::spawn(self.run(ready))
    }

    /// Wait until ready, then tick forever.
    pub async fn run(mut self, ready: ReadySignal) {
        ready.wait().await;
        info!(
            "Activity rotation task started ({} presences every {}s)",
            self.cycle.len(),
            self.interval.as_secs()
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    /// Apply the current presence once. Never panics.
    #[instrument(level = "debug", skip_all, fields(position = self.cycle.position()))]
    pub async fn tick(&mut self) {
        let presence = self.cycle.current().clone();
        let applied = AssertUnwindSafe(self.sink.apply(&presence, self.status))
            .catch_unwind()
            .await;

        match applied {
            Ok(Ok(())) => {
                info!("Activity changed: {presence}");
                self.cycle.advance();
            }
            Ok(Err(TransportError::RateLimited { retry_after })) => {
                // Skip this presence so it isn't shown twice in a row after the wait.
                self.cycle.advance();
                let wait = retry_after.unwrap_or(self.default_backoff);
                warn!(
                    "Rate limited. Waiting {:.1}s before retry",
                    wait.as_secs_f32()
                );
                tokio::time::sleep(wait).await;
            }
            Ok(Err(error)) => {
                error!("Failed to change activity to '{presence}': {error}");
            }
            Err(payload) => {
                error!(
                    "Activity change to '{presence}' panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    #[cfg(test)]
    pub fn cycle(&self) -> &PresenceCycle {
        &self.cycle
    }
}

/// Best effort extraction of a panic message.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<unknown panic>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::time::Instant;

    use super::*;

    /// Records applied presences and replays scripted outcomes.
    #[derive(Default)]
    struct FakeSink {
        applied: Mutex<Vec<String>>,
        outcomes: Mutex<VecDeque<Option<Result<(), TransportError>>>>,
    }

    impl FakeSink {
        fn scripted(outcomes: Vec<Option<Result<(), TransportError>>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                ..Default::default()
            })
        }

        fn applied(&self) -> Vec<String> {
            self.applied.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PresenceSink for Arc<FakeSink> {
        async fn apply(
            &self,
            presence: &PresenceDescriptor,
            _status: Status,
        ) -> Result<(), TransportError> {
            self.applied.lock().unwrap().push(presence.label.clone());
            // `None` scripts a panic.
            let outcome = self.outcomes.lock().unwrap().pop_front();
            match outcome {
                Some(Some(outcome)) => outcome,
                Some(None) => panic!("sink exploded"),
                None => Ok(()),
            }
        }
    }

    fn rotator(sink: Arc<FakeSink>, n: usize) -> PresenceRotator<Arc<FakeSink>> {
        let entries = (0..n)
            .map(|i| PresenceDescriptor::new(ActivityKind::Playing, format!("p{i}")))
            .collect();
        PresenceRotator::new(
            PresenceCycle::new(entries).unwrap(),
            sink,
            Status::Dnd,
            Duration::from_secs(15 * 60),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn successful_ticks_wrap_around() {
        let sink = FakeSink::scripted(vec![]);
        let mut rotator = rotator(sink.clone(), 3);
        for _ in 0..4 {
            rotator.tick().await;
        }
        assert_eq!(sink.applied(), ["p0", "p1", "p2", "p0"]);
        assert_eq!(rotator.cycle().position(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_advances_and_waits() {
        let limited = TransportError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        let sink = FakeSink::scripted(vec![Some(Err(limited))]);
        let mut rotator = rotator(sink.clone(), 3);

        let start = Instant::now();
        rotator.tick().await;
        assert!(start.elapsed() >= Duration::from_secs(7));
        assert_eq!(rotator.cycle().position(), 1);

        rotator.tick().await;
        assert_eq!(sink.applied(), ["p0", "p1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_without_delay_uses_default_backoff() {
        let limited = TransportError::RateLimited { retry_after: None };
        let sink = FakeSink::scripted(vec![Some(Err(limited))]);
        let mut rotator = rotator(sink, 2);

        let start = Instant::now();
        rotator.tick().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn transport_error_retries_same_presence() {
        let failure = TransportError::Http {
            status: 500,
            message: "oops".to_string(),
        };
        let sink = FakeSink::scripted(vec![Some(Err(failure))]);
        let mut rotator = rotator(sink.clone(), 3);

        rotator.tick().await;
        assert_eq!(rotator.cycle().position(), 0);
        rotator.tick().await;
        assert_eq!(sink.applied(), ["p0", "p0"]);
        assert_eq!(rotator.cycle().position(), 1);
    }

    #[tokio::test]
    async fn panicking_sink_does_not_kill_the_tick() {
        let sink = FakeSink::scripted(vec![None]);
        let mut rotator = rotator(sink.clone(), 2);

        rotator.tick().await;
        rotator.tick().await;
        assert_eq!(sink.applied(), ["p0", "p0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn rotation_waits_for_ready() {
        let sink = FakeSink::scripted(vec![]);
        let ready = ReadySignal::new();
        let handle = rotator(sink.clone(), 2).spawn(ready.clone());

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(sink.applied().is_empty());

        ready.mark_ready();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.applied(), ["p0"]);

        tokio::time::sleep(Duration::from_secs(15 * 60)).await;
        assert_eq!(sink.applied(), ["p0", "p1"]);

        handle.abort();
    }
}
