//! In-memory store used by the integration tests.
//!
//! Every connection replays the recorded history from the requested revision
//! and then drops after `per_connection` events, until the history is
//! drained. After that the stream stays open.

use std::sync::Arc;

use coord_watch::proto::Event;
use coord_watch::proto::WatchRequest;
use coord_watch::proto::WatchResponse;
use coord_watch::RawWatchStream;
use coord_watch::WatchError;
use coord_watch::WatchTransport;
use futures::stream;
use futures::StreamExt;
use parking_lot::Mutex;
use tonic::async_trait;

#[derive(Clone)]
pub struct FlakyStore {
    history: Arc<Vec<Event>>,
    per_connection: usize,
    requests: Arc<Mutex<Vec<WatchRequest>>>,
}

impl FlakyStore {
    /// One put per revision, starting at revision 1
    pub fn with_puts(
        keys: &[&'static str],
        per_connection: usize,
    ) -> Self {
        let history = keys
            .iter()
            .enumerate()
            .map(|(i, key)| Event::put(*key, format!("v{}", i + 1), i as u64 + 1))
            .collect();
        Self {
            history: Arc::new(history),
            per_connection,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn start_revisions(&self) -> Vec<u64> {
        self.requests.lock().iter().map(|r| r.start_revision).collect()
    }

    fn matches(
        request: &WatchRequest,
        event: &Event,
    ) -> bool {
        let Some(kv) = &event.kv else {
            return false;
        };
        let key_matches = if request.prefix {
            kv.key.starts_with(&request.key)
        } else {
            kv.key == request.key
        };
        key_matches && kv.mod_revision >= request.start_revision
    }
}

#[async_trait]
impl WatchTransport for FlakyStore {
    async fn watch(
        &self,
        request: WatchRequest,
    ) -> Result<RawWatchStream, WatchError> {
        let pending: Vec<Event> = self
            .history
            .iter()
            .filter(|e| Self::matches(&request, e))
            .cloned()
            .collect();
        self.requests.lock().push(request);

        let drained = pending.len() <= self.per_connection;
        let batch = pending
            .into_iter()
            .take(self.per_connection)
            .map(|e| Ok(WatchResponse::events(vec![e])))
            .collect::<Vec<_>>();

        if drained {
            Ok(stream::iter(batch).chain(stream::pending()).boxed())
        } else {
            Ok(stream::iter(batch).boxed())
        }
    }

    async fn close(&self) {}
}
