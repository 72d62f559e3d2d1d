//! Closes the gateway connection exactly once, whichever exit path gets there first.

use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::error;
use tracing::info;

use crate::serenity;

/// A connection that can be shut down.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn close(&self);
}

#[async_trait]
impl Connection for Arc<serenity::ShardManager> {
    async fn close(&self) {
        self.shutdown_all().await;
    }
}

/// Shared handle that releases a [Connection] once.
/// Cheap to clone.
pub struct Teardown<C> {
    #[allow(clippy::missing_docs_in_private_items)]
    connection: Arc<C>,
    #[allow(clippy::missing_docs_in_private_items)]
    closed: Arc<AtomicBool>,
}

impl<C> Clone for Teardown<C> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<C: Connection + 'static> Teardown<C> {
    pub fn new(connection: C) -> Self {
        Self {
            connection: Arc::new(connection),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the connection if nobody has yet.
    /// Returns whether this call did the closing.
    pub async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        info!("Closing bot connection...");
        self.connection.close().await;
        true
    }

    /// Close on Ctrl-C.
    pub fn close_on_interrupt(&self) -> JoinHandle<()> {
        let teardown = self.clone();
        tokio::spawn(async move {
            interrupted().await;
            teardown.close().await;
        })
    }
}

/// Resolves on Ctrl-C. Never resolves if interrupts can't be listened for.
pub async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Keyboard interrupt received"),
        Err(e) => {
            error!("Unable to listen for interrupts: {e}");
            std::future::pending::<()>().await
        }
    }
}

/// Drive `work` to completion unless `interrupt` resolves first.
pub async fn unless_interrupted<T>(
    work: impl Future<Output = T>,
    interrupt: impl Future<Output = ()>,
) -> Option<T> {
    tokio::select! {
        output = work => Some(output),
        () = interrupt => None,
    }
}
