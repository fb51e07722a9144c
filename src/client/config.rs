use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Client configuration parameters for the gRPC watch transport
///
/// Encapsulates all tunable settings for establishing and maintaining
/// the long-lived HTTP/2 connection that carries watch streams.
///
/// # Key Configuration Areas
/// - Connection establishment (TCP handshake timeout)
/// - Liveness of idle streams (TCP and HTTP/2 keepalive)
/// - Network efficiency settings (compression, message size)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client id sent with every watch request
    /// Default: 0 (anonymous)
    #[serde(default)]
    pub id: u32,

    /// Maximum time to wait for establishing a TCP connection
    /// Default: 1 second
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// TCP keepalive duration for idle connections
    /// Default: 5 minutes (300s)
    #[serde(default = "default_tcp_keepalive_ms")]
    pub tcp_keepalive_ms: u64,

    /// Interval for HTTP/2 keepalive pings. Watch streams can stay silent for
    /// a long time, pings detect dead peers.
    /// Default: 1 minute (60s)
    #[serde(default = "default_http2_keepalive_interval_ms")]
    pub http2_keepalive_interval_ms: u64,

    /// Timeout for HTTP/2 keepalive pings
    /// Default: 20 seconds
    #[serde(default = "default_http2_keepalive_timeout_ms")]
    pub http2_keepalive_timeout_ms: u64,

    /// Maximum size of a decoded watch response in bytes
    /// Default: 4MB
    #[serde(default = "default_max_decoding_message_size")]
    pub max_decoding_message_size: usize,

    /// Enable Gzip compression for network traffic
    /// Tradeoff: Reduces bandwidth usage at the cost of CPU
    /// Default: true (enabled)
    #[serde(default = "default_enable_compression")]
    pub enable_compression: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            id: 0,
            connect_timeout_ms: default_connect_timeout_ms(),
            tcp_keepalive_ms: default_tcp_keepalive_ms(),
            http2_keepalive_interval_ms: default_http2_keepalive_interval_ms(),
            http2_keepalive_timeout_ms: default_http2_keepalive_timeout_ms(),
            max_decoding_message_size: default_max_decoding_message_size(),
            enable_compression: default_enable_compression(),
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn tcp_keepalive(&self) -> Duration {
        Duration::from_millis(self.tcp_keepalive_ms)
    }

    pub fn http2_keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.http2_keepalive_interval_ms)
    }

    pub fn http2_keepalive_timeout(&self) -> Duration {
        Duration::from_millis(self.http2_keepalive_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Message("client.connect_timeout_ms must be greater than 0".into()).into());
        }
        if self.http2_keepalive_timeout_ms == 0 {
            return Err(
                ConfigError::Message("client.http2_keepalive_timeout_ms must be greater than 0".into()).into(),
            );
        }
        if self.max_decoding_message_size == 0 {
            return Err(
                ConfigError::Message("client.max_decoding_message_size must be greater than 0".into()).into(),
            );
        }
        Ok(())
    }
}

const fn default_connect_timeout_ms() -> u64 {
    1000
}
const fn default_tcp_keepalive_ms() -> u64 {
    300_000
}
const fn default_http2_keepalive_interval_ms() -> u64 {
    60_000
}
const fn default_http2_keepalive_timeout_ms() -> u64 {
    20_000
}
const fn default_max_decoding_message_size() -> usize {
    4 << 20
}
const fn default_enable_compression() -> bool {
    true
}
