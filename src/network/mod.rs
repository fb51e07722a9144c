//! This module is the transport abstraction layer for watch subscriptions
//!
//! The watch machinery in [`crate::watch`] only ever talks to a
//! [`WatchTransport`]. The gRPC implementation lives in [`grpc`]; tests plug
//! in scripted or mocked transports.
pub mod grpc;

pub use grpc::*;

use futures::stream::BoxStream;
#[cfg(test)]
use mockall::automock;
use tonic::async_trait;

use crate::proto::WatchRequest;
use crate::proto::WatchResponse;
use crate::WatchError;

/// Raw per-call stream of watch responses.
///
/// Ending the stream (`None`) without an error is an unexplained disconnect.
/// An `Err` item ends the subscription.
pub type RawWatchStream = BoxStream<'static, std::result::Result<WatchResponse, WatchError>>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait WatchTransport: Send + Sync + 'static {
    /// Opens exactly one watch subscription.
    ///
    /// # Arguments
    /// * `request` - key, prefix flag and start revision (0 = from now)
    ///
    /// # Errors
    /// Failure to open the stream. The watch layer reports it to the caller as
    /// a terminal event; it is never returned synchronously.
    async fn watch(
        &self,
        request: WatchRequest,
    ) -> std::result::Result<RawWatchStream, WatchError>;

    /// Releases transport resources. Called once by
    /// [`crate::WatchClient::close`] after every watch task has exited.
    async fn close(&self);
}
