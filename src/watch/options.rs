use bytes::Bytes;

use crate::proto::WatchRequest;

/// Per-call watch options
///
/// # Example
/// ```ignore
/// let options = WatchOptions::default()
///     .with_prefix()
///     .with_start_revision(42)
///     .with_buffer_size(1024);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Match every key starting with the watched key
    pub prefix: bool,
    /// First revision to deliver; `None` watches from now
    pub start_revision: Option<u64>,
    /// Output channel capacity; `None` uses [`crate::WatchConfig::buffer_size`]
    pub buffer_size: Option<usize>,
}

impl WatchOptions {
    pub fn with_prefix(mut self) -> Self {
        self.prefix = true;
        self
    }

    /// A revision of 0 is treated as "from now".
    pub fn with_start_revision(
        mut self,
        revision: u64,
    ) -> Self {
        self.start_revision = (revision > 0).then_some(revision);
        self
    }

    pub fn with_buffer_size(
        mut self,
        size: usize,
    ) -> Self {
        self.buffer_size = Some(size);
        self
    }

    pub(crate) fn to_request(
        &self,
        key: Bytes,
    ) -> WatchRequest {
        WatchRequest {
            client_id: 0,
            key,
            prefix: self.prefix,
            start_revision: self.start_revision.unwrap_or_default(),
        }
    }
}
