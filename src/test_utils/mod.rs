//! Shared fixtures for unit tests: a scripted [`WatchTransport`] and wire
//! response helpers.

use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::stream;
use futures::StreamExt;
use parking_lot::Mutex;
use tonic::async_trait;

use crate::proto::Event;
use crate::proto::WatchRequest;
use crate::proto::WatchResponse;
use crate::RawWatchStream;
use crate::WatchError;
use crate::WatchTransport;

/// Behaviour of one `watch()` call
#[derive(Debug, Clone)]
pub(crate) enum Attempt {
    /// `watch()` itself fails
    Refuse(WatchError),
    /// Yields `items`, then ends (`hang == false`) or stays open forever
    Stream {
        items: Vec<Result<WatchResponse, WatchError>>,
        hang: bool,
    },
}

impl Attempt {
    pub(crate) fn ends(items: Vec<Result<WatchResponse, WatchError>>) -> Self {
        Attempt::Stream { items, hang: false }
    }

    pub(crate) fn hangs(items: Vec<Result<WatchResponse, WatchError>>) -> Self {
        Attempt::Stream { items, hang: true }
    }
}

#[derive(Debug, Default)]
struct Inner {
    script: Mutex<VecDeque<Attempt>>,
    requests: Mutex<Vec<WatchRequest>>,
    close_calls: AtomicUsize,
}

/// Replays one [`Attempt`] per `watch()` call. Once the script is used up,
/// further calls get a stream that stays open and silent.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedTransport {
    inner: Arc<Inner>,
}

impl ScriptedTransport {
    pub(crate) fn new(attempts: impl IntoIterator<Item = Attempt>) -> Self {
        let transport = Self::default();
        transport.inner.script.lock().extend(attempts);
        transport
    }

    pub(crate) fn requests(&self) -> Vec<WatchRequest> {
        self.inner.requests.lock().clone()
    }

    pub(crate) fn start_revisions(&self) -> Vec<u64> {
        self.inner.requests.lock().iter().map(|r| r.start_revision).collect()
    }

    pub(crate) fn watch_calls(&self) -> usize {
        self.inner.requests.lock().len()
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }

    /// Polls until `watch()` was called `n` times
    pub(crate) async fn wait_for_calls(
        &self,
        n: usize,
    ) {
        while self.watch_calls() < n {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

#[async_trait]
impl WatchTransport for ScriptedTransport {
    async fn watch(
        &self,
        request: WatchRequest,
    ) -> Result<RawWatchStream, WatchError> {
        self.inner.requests.lock().push(request);
        let attempt = self.inner.script.lock().pop_front();

        match attempt {
            Some(Attempt::Refuse(e)) => Err(e),
            Some(Attempt::Stream { items, hang: false }) => Ok(stream::iter(items).boxed()),
            Some(Attempt::Stream { items, hang: true }) => Ok(stream::iter(items).chain(stream::pending()).boxed()),
            None => Ok(stream::pending().boxed()),
        }
    }

    async fn close(&self) {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn put(
    key: &'static str,
    value: &'static str,
    revision: u64,
) -> Result<WatchResponse, WatchError> {
    Ok(WatchResponse::events(vec![Event::put(key, value, revision)]))
}

pub(crate) fn delete(
    key: &'static str,
    revision: u64,
) -> Result<WatchResponse, WatchError> {
    Ok(WatchResponse::events(vec![Event::delete(key, revision)]))
}

pub(crate) fn compacted(compact_revision: u64) -> Result<WatchResponse, WatchError> {
    Ok(WatchResponse::compacted(compact_revision))
}

pub(crate) fn unavailable() -> WatchError {
    WatchError::Transport {
        code: tonic::Code::Unavailable,
        message: "connection reset".to_string(),
    }
}
