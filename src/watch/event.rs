//! Normalized watch event model.
//!
//! Decouples callers from the wire types in [`crate::proto`]. A [`WatchEvent`]
//! is either a change notification or the terminal value explaining why a
//! stream ended.

use bytes::Bytes;

use crate::proto;
use crate::WatchError;

/// Kind of change carried by a [`WatchEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    /// Key was inserted or updated
    Put,
    /// Key was deleted
    Delete,
    /// Unrecognized or malformed wire event, and terminal events.
    /// Never treated as a `Put`.
    Unknown,
}

/// A single delivered change, or the terminal failure of a stream
#[derive(Debug, Clone, PartialEq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    /// Affected key. Empty on terminal events.
    pub key: Bytes,
    /// New value. Always `None` for deletes and terminal events.
    pub value: Option<Bytes>,
    /// Mod revision of the change. On a terminal event: the last revision
    /// delivered before the failure, 0 if none.
    pub revision: u64,
    /// Oldest watchable revision; non-zero only when the stream ended
    /// because of compaction.
    pub compact_revision: u64,
    /// Set on terminal events and on malformed events.
    pub error: Option<WatchError>,
}

impl WatchEvent {
    pub fn put(
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
        revision: u64,
    ) -> Self {
        Self {
            kind: WatchEventKind::Put,
            key: key.into(),
            value: Some(value.into()),
            revision,
            compact_revision: 0,
            error: None,
        }
    }

    pub fn delete(
        key: impl Into<Bytes>,
        revision: u64,
    ) -> Self {
        Self {
            kind: WatchEventKind::Delete,
            key: key.into(),
            value: None,
            revision,
            compact_revision: 0,
            error: None,
        }
    }

    /// Terminal event closing a stream
    pub(crate) fn terminal(
        error: WatchError,
        last_revision: u64,
        compact_revision: u64,
    ) -> Self {
        Self {
            kind: WatchEventKind::Unknown,
            key: Bytes::new(),
            value: None,
            revision: last_revision,
            compact_revision,
            error: Some(error),
        }
    }

    fn malformed(
        key: Bytes,
        revision: u64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind: WatchEventKind::Unknown,
            key,
            value: None,
            revision,
            compact_revision: 0,
            error: Some(WatchError::MalformedEvent { reason: reason.into() }),
        }
    }

    /// Ordinary change notification without any error attached
    pub fn is_normal(&self) -> bool {
        self.error.is_none()
    }

    /// Last value of a stream; the channel closes right after it
    pub fn is_terminal(&self) -> bool {
        self.error.as_ref().is_some_and(WatchError::is_terminal)
    }

    pub fn is_compacted(&self) -> bool {
        self.error.as_ref().is_some_and(WatchError::is_compacted)
    }

    pub fn is_retries_exhausted(&self) -> bool {
        self.error.as_ref().is_some_and(WatchError::is_retries_exhausted)
    }
}

impl From<proto::Event> for WatchEvent {
    /// Converts a wire event.
    ///
    /// Never panics: a missing key/value payload or an unknown event type
    /// yields a [`WatchEventKind::Unknown`] event with
    /// [`WatchError::MalformedEvent`].
    fn from(event: proto::Event) -> Self {
        let Some(kv) = event.kv else {
            return WatchEvent::malformed(Bytes::new(), 0, "event carries no key/value payload");
        };

        match proto::EventType::try_from(event.r#type) {
            Ok(proto::EventType::Put) => WatchEvent::put(kv.key, kv.value, kv.mod_revision),
            Ok(proto::EventType::Delete) => WatchEvent::delete(kv.key, kv.mod_revision),
            Err(_) => WatchEvent::malformed(
                kv.key,
                kv.mod_revision,
                format!("unknown event type {}", event.r#type),
            ),
        }
    }
}
