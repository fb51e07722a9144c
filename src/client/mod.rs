//! Watch client for the coordination store
//!
//! Provides the caller-facing components:
//! - [`WatchClient`] - Starts one-shot and self-healing watches, owns their shutdown
//! - [`WatchClientBuilder`] - Configurable client construction
//! - [`ClientConfig`] - gRPC connection parameters for [`crate::GrpcWatchTransport`]
//!
//! # Basic Usage
//! ```no_run
//! use coord_watch::{GrpcWatchTransport, RetryConfig, WatchClient, WatchOptions};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let transport = GrpcWatchTransport::connect("http://node1:9081", Default::default())
//!         .await
//!         .unwrap();
//!     let client = WatchClient::builder(transport)
//!         .buffer_size(512)
//!         .retry(RetryConfig::default().with_max_backoff(Duration::from_secs(10)))
//!         .build()
//!         .unwrap();
//!
//!     let ctx = CancellationToken::new();
//!     let mut events = client
//!         .watch_with_default_retry(&ctx, "services/", WatchOptions::default().with_prefix())
//!         .unwrap();
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{:?} {:?} @{}", event.kind, event.key, event.revision);
//!     }
//!
//!     client.close().await;
//! }
//! ```

mod builder;
#[allow(clippy::module_inception)]
mod client;
mod config;

pub use self::builder::*;
pub use self::client::*;
pub use self::config::*;
