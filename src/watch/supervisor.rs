//! Resilient watch: keeps one logical subscription alive across reconnects.
//!
//! ```text
//! Connecting --(inner stream)--> Streaming --(disconnect/terminal)--> Backoff
//!     ^                              |                                  |
//!     +----------- sleep ------------+-----------------------------------+
//!                                    |
//!                        stop / budget exhausted --> Stopped (sender dropped)
//! ```
//!
//! Continuity across reconnects relies only on `last_revision` and
//! `last_compact_revision`. If nothing was ever delivered and the caller gave
//! no start revision, the resume point is unknown and the next attempt
//! watches from now; changes in that gap can be missed.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::backoff::cancellable_sleep;
use super::stream::forward;
use super::stream::spawn_watch_stream;
use super::ExponentialBackoff;
use super::ShutdownCoordinator;
use super::StopSignal;
use crate::config::RetryNotice;
use crate::config::RetrySettings;
use crate::proto::WatchRequest;
use crate::WatchError;
use crate::WatchEvent;
use crate::WatchTransport;

/// Per-watch reconnect bookkeeping, lives as long as the supervisor task
#[derive(Debug)]
pub(crate) struct RetryState {
    /// Revision requested by the caller, 0 = from now
    pub(crate) start_revision: u64,
    pub(crate) last_revision: u64,
    pub(crate) last_compact_revision: u64,
    pub(crate) retry_count: u32,
    pub(crate) backoff: ExponentialBackoff,
}

impl RetryState {
    pub(crate) fn new(
        settings: &RetrySettings,
        start_revision: u64,
    ) -> Self {
        Self {
            start_revision,
            last_revision: 0,
            last_compact_revision: 0,
            retry_count: 0,
            backoff: ExponentialBackoff::from_settings(settings),
        }
    }

    /// Revision the next attempt asks for; 0 watches from now.
    ///
    /// Before anything was delivered this is the caller's start revision.
    /// The compaction floor wins when it is higher: revisions below it no
    /// longer exist on the server.
    pub(crate) fn resume_revision(&self) -> u64 {
        let next = if self.last_revision > 0 {
            self.last_revision.saturating_add(1)
        } else {
            self.start_revision
        };
        next.max(self.last_compact_revision)
    }

    pub(crate) fn record_delivered(
        &mut self,
        revision: u64,
    ) {
        if revision > self.last_revision {
            self.last_revision = revision;
        }
    }

    pub(crate) fn record_terminal(
        &mut self,
        event: &WatchEvent,
    ) {
        self.record_delivered(event.revision);
        if event.compact_revision > 0 {
            self.last_compact_revision = event.compact_revision;
        }
    }

    /// Counts one more failed connection; returns the new retry count.
    pub(crate) fn record_attempt(&mut self) -> u32 {
        self.retry_count = self.retry_count.saturating_add(1);
        self.retry_count
    }

    /// A connection that delivered events resets escalation.
    pub(crate) fn reset(&mut self) {
        self.retry_count = 0;
        self.backoff.reset();
    }
}

pub(crate) async fn run_resilient_watch<T>(
    transport: Arc<T>,
    request: WatchRequest,
    settings: RetrySettings,
    buffer_size: usize,
    tx: mpsc::Sender<WatchEvent>,
    stop: StopSignal,
    coordinator: ShutdownCoordinator,
) where
    T: WatchTransport + ?Sized,
{
    let key = request.key.clone();
    let mut state = RetryState::new(&settings, request.start_revision);

    loop {
        // Connecting
        if stop.is_stopped() {
            debug!(?key, "resilient watch stopped before connecting");
            return;
        }

        let mut attempt_request = request.clone();
        attempt_request.start_revision = state.resume_revision();
        debug!(
            ?key,
            start_revision = attempt_request.start_revision,
            retry_count = state.retry_count,
            "connecting watch"
        );

        let (attempt_stop, attempt_token) = stop.child();
        // Ends the inner task when this attempt is over, whatever the exit path.
        let attempt_guard = attempt_token.drop_guard();
        let mut inner = spawn_watch_stream(
            transport.clone(),
            attempt_request,
            buffer_size,
            attempt_stop,
            &coordinator,
        );

        // Streaming
        let mut delivered = 0u64;
        let cause = loop {
            let next = tokio::select! {
                biased;
                _ = stop.stopped() => {
                    debug!(?key, last_revision = state.last_revision, "resilient watch stopped");
                    return;
                }
                next = inner.recv() => next,
            };

            match next {
                None => break WatchError::Disconnected,
                Some(event) if event.is_terminal() => {
                    state.record_terminal(&event);
                    break event.error.unwrap_or(WatchError::Disconnected);
                }
                Some(event) => {
                    let revision = event.revision;
                    let normal = event.is_normal();
                    if !forward(&tx, event, &stop).await {
                        return;
                    }
                    if normal {
                        delivered += 1;
                    }
                    state.record_delivered(revision);
                }
            }
        };

        drop(attempt_guard);

        // Backoff
        if delivered > 0 {
            state.reset();
        }
        let retry_count = state.record_attempt();

        if settings.max_retries > 0 && retry_count > settings.max_retries {
            warn!(
                ?key,
                retries = settings.max_retries,
                last_revision = state.last_revision,
                error = %cause,
                "watch retry budget exhausted"
            );
            let exhausted = WatchError::RetriesExhausted {
                retries: settings.max_retries,
                last: Box::new(cause),
            };
            forward(
                &tx,
                WatchEvent::terminal(exhausted, state.last_revision, state.last_compact_revision),
                &stop,
            )
            .await;
            return;
        }

        if stop.is_stopped() {
            return;
        }

        let delay = state.backoff.next_delay();
        info!(
            ?key,
            attempt = state.retry_count,
            backoff_ms = delay.as_millis() as u64,
            last_revision = state.last_revision,
            error = %cause,
            "reconnecting watch"
        );
        settings.notify(&RetryNotice {
            attempt: state.retry_count,
            cause,
            next_backoff: delay,
            last_revision: state.last_revision,
        });

        if !cancellable_sleep(delay, &stop).await {
            return;
        }
    }
}
