//! Watch streams with automatic, revision-aware reconnection
//!
//! # Architecture
//!
//! ```text
//! caller
//!   <- mpsc (bounded) <- supervisor task (watch_with_retry only)
//!                          <- mpsc (bounded) <- single-shot task
//!                                                <- WatchTransport raw stream
//! ```
//!
//! - [`stream`]: one subscription, converts wire events and ends with at most
//!   one terminal event.
//! - [`supervisor`]: drives single-shot subscriptions, computes resume
//!   revisions, applies jittered exponential backoff.
//! - [`shutdown`]: client-wide cancellation and task tracking.
//!
//! # Delivery
//!
//! Backpressure blocks: a slow consumer stalls the producer rather than
//! losing events. Every blocking point also watches the caller's token and
//! client shutdown, so no task outlives either.

mod backoff;
mod event;
mod options;
mod shutdown;
mod stream;
mod supervisor;

pub use backoff::*;
pub use event::*;
pub use options::*;
pub use shutdown::*;

pub(crate) use stream::spawn_watch_stream;
pub(crate) use supervisor::run_resilient_watch;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Adapts a watch channel into a [`futures::Stream`].
pub fn into_event_stream(receiver: mpsc::Receiver<WatchEvent>) -> ReceiverStream<WatchEvent> {
    ReceiverStream::new(receiver)
}

#[cfg(test)]
mod supervisor_test;
