//! Resilient watch streams for a coordination-store client.
//!
//! A watch subscribes to changes of one key (or a key prefix) and delivers
//! them as [`WatchEvent`]s over a bounded channel. [`WatchClient::watch`]
//! opens a single subscription; [`WatchClient::watch_with_retry`] keeps one
//! logical subscription alive across disconnects, resuming from the last
//! delivered revision with jittered exponential backoff.
//!
//! The wire side is abstracted behind [`WatchTransport`];
//! [`GrpcWatchTransport`] is the tonic implementation.

mod client;
mod config;
mod errors;
mod network;
pub mod proto;
mod watch;

pub use self::client::*;
pub use self::config::*;
pub use self::errors::*;
pub use self::network::*;
pub use self::watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
