//! Protocol Buffer definitions and generated code for the watch RPC service.
//!
//! This module contains Rust types generated from `proto/watch.proto` by
//! `build.rs` with tonic-build. The output is checked in; builds without
//! `protoc` use it as is.

pub mod watch {
    include!("../generated/coord.watch.rs");
}

pub use watch::watch_service_client::WatchServiceClient;
pub use watch::Event;
pub use watch::EventType;
pub use watch::KeyValue;
pub use watch::WatchRequest;
pub use watch::WatchResponse;

mod exts;
