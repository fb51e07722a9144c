use bytes::Bytes;

use crate::proto::Event;
use crate::proto::EventType;
use crate::proto::KeyValue;
use crate::proto::WatchResponse;
use crate::WatchError;

impl Event {
    pub fn put(
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
        mod_revision: u64,
    ) -> Self {
        Self {
            r#type: EventType::Put as i32,
            kv: Some(KeyValue {
                key: key.into(),
                value: value.into(),
                mod_revision,
                ..Default::default()
            }),
        }
    }

    pub fn delete(
        key: impl Into<Bytes>,
        mod_revision: u64,
    ) -> Self {
        Self {
            r#type: EventType::Delete as i32,
            kv: Some(KeyValue {
                key: key.into(),
                mod_revision,
                ..Default::default()
            }),
        }
    }
}

impl WatchResponse {
    /// Batch of change events at the given store revision
    pub fn events(events: Vec<Event>) -> Self {
        let revision = events
            .iter()
            .filter_map(|e| e.kv.as_ref().map(|kv| kv.mod_revision))
            .max()
            .unwrap_or_default();
        Self {
            revision,
            events,
            ..Default::default()
        }
    }

    /// Server-side cancellation because `compact_revision` is the oldest
    /// revision still available
    pub fn compacted(compact_revision: u64) -> Self {
        Self {
            compact_revision,
            canceled: true,
            cancel_reason: "required revision has been compacted".to_string(),
            ..Default::default()
        }
    }

    pub fn canceled(reason: impl Into<String>) -> Self {
        Self {
            canceled: true,
            cancel_reason: reason.into(),
            ..Default::default()
        }
    }

    /// Stream-ending error carried by this response, if any
    ///
    /// A non-zero compaction boundary always wins over a plain cancellation.
    pub fn stream_error(&self) -> Option<WatchError> {
        if self.compact_revision > 0 {
            return Some(WatchError::Compacted {
                compact_revision: self.compact_revision,
            });
        }
        if self.canceled {
            return Some(WatchError::Canceled {
                reason: self.cancel_reason.clone(),
            });
        }
        None
    }
}
