//! Single-shot watch: one subscription, one output channel, no retries.
//!
//! ```text
//! WatchTransport::watch() -> RawWatchStream -> WatchEvent::from -> mpsc (bounded) -> caller
//! ```
//!
//! The output channel is closed when the task returns and drops its sender,
//! whatever the exit path.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::ShutdownCoordinator;
use super::StopSignal;
use crate::proto::WatchRequest;
use crate::WatchError;
use crate::WatchEvent;
use crate::WatchTransport;

/// Opens one subscription in a tracked background task and returns its
/// event channel immediately.
pub(crate) fn spawn_watch_stream<T>(
    transport: Arc<T>,
    request: WatchRequest,
    buffer_size: usize,
    stop: StopSignal,
    coordinator: &ShutdownCoordinator,
) -> mpsc::Receiver<WatchEvent>
where
    T: WatchTransport + ?Sized,
{
    let (tx, rx) = mpsc::channel(buffer_size);
    coordinator.spawn(run_watch_stream(transport, request, tx, stop));
    rx
}

async fn run_watch_stream<T>(
    transport: Arc<T>,
    request: WatchRequest,
    tx: mpsc::Sender<WatchEvent>,
    stop: StopSignal,
) where
    T: WatchTransport + ?Sized,
{
    let key = request.key.clone();
    debug!(?key, start_revision = request.start_revision, "opening watch stream");

    let opened = tokio::select! {
        biased;
        _ = stop.stopped() => return,
        opened = transport.watch(request) => opened,
    };
    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            warn!(?key, error = %e, "failed to open watch stream");
            forward(&tx, WatchEvent::terminal(e, 0, 0), &stop).await;
            return;
        }
    };

    let mut last_revision = 0;
    loop {
        let item = tokio::select! {
            biased;
            _ = stop.stopped() => {
                debug!(?key, last_revision, "watch stream stopped");
                return;
            }
            item = stream.next() => item,
        };

        let response = match item {
            None => {
                debug!(?key, last_revision, "watch stream closed by transport");
                return;
            }
            Some(Err(e)) => {
                warn!(?key, last_revision, error = %e, "watch stream failed");
                forward(&tx, WatchEvent::terminal(e, last_revision, 0), &stop).await;
                return;
            }
            Some(Ok(response)) => response,
        };

        if let Some(e) = response.stream_error() {
            warn!(?key, last_revision, compact_revision = response.compact_revision, error = %e, "watch stream ended by server");
            forward(
                &tx,
                WatchEvent::terminal(e, last_revision, response.compact_revision),
                &stop,
            )
            .await;
            return;
        }

        for raw in response.events {
            let event = WatchEvent::from(raw);
            let revision = event.revision;
            if let Some(WatchError::MalformedEvent { reason }) = &event.error {
                warn!(?key, %reason, "forwarding malformed watch event");
            }
            trace!(?key, revision, kind = ?event.kind, "forwarding watch event");

            if !forward(&tx, event, &stop).await {
                return;
            }
            if revision > 0 {
                last_revision = revision;
            }
        }
    }
}

/// Sends one event, giving up if the watch is stopped or the receiver is gone.
///
/// Returns `true` once the event is in the channel.
pub(crate) async fn forward(
    tx: &mpsc::Sender<WatchEvent>,
    event: WatchEvent,
    stop: &StopSignal,
) -> bool {
    tokio::select! {
        biased;
        _ = stop.stopped() => false,
        sent = tx.send(event) => sent.is_ok(),
    }
}
