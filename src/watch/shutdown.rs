//! Client-wide shutdown coordination.
//!
//! A single [`CancellationToken`] is broadcast to every blocking point of
//! every watch task, and a [`TaskTracker`] lets [`ShutdownCoordinator::shutdown`]
//! wait until all of them have exited.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token observed by every watch task
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Spawns a watch task that `shutdown` will wait for.
    pub(crate) fn spawn<F>(
        &self,
        task: F,
    ) where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task);
    }

    /// Number of watch tasks still running
    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }

    /// Signals every task and waits for all of them to exit.
    ///
    /// Idempotent: later calls just wait for the same set of tasks.
    pub async fn shutdown(&self) {
        if !self.token.is_cancelled() {
            debug!(active = self.tracker.len(), "shutting down watch tasks");
        }
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

/// Stop condition of a single watch: the caller's token or client shutdown.
#[derive(Debug, Clone)]
pub(crate) struct StopSignal {
    caller: CancellationToken,
    shutdown: CancellationToken,
}

impl StopSignal {
    pub(crate) fn new(
        caller: CancellationToken,
        shutdown: CancellationToken,
    ) -> Self {
        Self { caller, shutdown }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.caller.is_cancelled() || self.shutdown.is_cancelled()
    }

    /// Resolves once either side fires.
    pub(crate) async fn stopped(&self) {
        tokio::select! {
            _ = self.caller.cancelled() => {}
            _ = self.shutdown.cancelled() => {}
        }
    }

    /// Signal for a nested task: stops with this one, and can additionally
    /// be stopped through the returned token.
    pub(crate) fn child(&self) -> (StopSignal, CancellationToken) {
        let caller = self.caller.child_token();
        (
            StopSignal {
                caller: caller.clone(),
                shutdown: self.shutdown.clone(),
            },
            caller,
        )
    }
}
