//! Watch Client Error Hierarchy
//!
//! Two layers of errors exist:
//! - [`Error`]: returned synchronously by client calls (local precondition
//!   failures, configuration, connection setup). Never retried.
//! - [`WatchError`]: carried inside a terminal [`crate::WatchEvent`] to explain
//!   why a subscription ended. Cloneable so events stay cloneable.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Watch key must not be empty
    #[error("Watch key must not be empty")]
    EmptyKey,

    /// The client has been closed; no new watches can be started
    #[error("Watch client is closed")]
    ClientClosed,

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Channel setup failures from the gRPC transport
    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),

    /// Subscription level failure surfaced synchronously
    #[error(transparent)]
    Watch(#[from] WatchError),
}

/// Reason a watch subscription ended.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WatchError {
    /// The raw stream ended without explanation
    #[error("Watch stream disconnected")]
    Disconnected,

    /// The server canceled the watch
    #[error("Watch canceled by server: {reason}")]
    Canceled { reason: String },

    /// Requested revision has been compacted away on the server
    #[error("Required revision has been compacted, oldest watchable revision is {compact_revision}")]
    Compacted { compact_revision: u64 },

    /// RPC level failure reported by the transport
    #[error("Watch transport error ({code:?}): {message}")]
    Transport { code: tonic::Code, message: String },

    /// A single wire event could not be decoded. Not terminal.
    #[error("Malformed watch event: {reason}")]
    MalformedEvent { reason: String },

    /// The retry budget of a resilient watch is used up
    #[error("Watch gave up after {retries} retries, last error: {last}")]
    RetriesExhausted { retries: u32, last: Box<WatchError> },
}

impl WatchError {
    pub fn is_compacted(&self) -> bool {
        matches!(self, WatchError::Compacted { .. })
    }

    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, WatchError::RetriesExhausted { .. })
    }

    /// Whether an event carrying this error ends the stream.
    ///
    /// Only [`WatchError::MalformedEvent`] is delivered in-band without
    /// closing the channel.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WatchError::MalformedEvent { .. })
    }
}

impl From<tonic::Status> for WatchError {
    fn from(status: tonic::Status) -> Self {
        WatchError::Transport {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}
