use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::Result;

/// Watch stream defaults
///
/// # Example (TOML)
/// ```toml
/// [watch]
/// buffer_size = 256
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Capacity of the event channel returned to the caller
    ///
    /// Producers block when the buffer is full; events are never dropped.
    /// A larger buffer absorbs bursts from slow consumers.
    ///
    /// **Tuning Guidelines**:
    /// - < 1K events/sec: 256
    /// - higher throughput: raise proportionally
    ///
    /// **Default**: 256
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
        }
    }
}

impl WatchConfig {
    /// Validates watch configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(ConfigError::Message("watch.buffer_size must be greater than 0".into()).into());
        }

        if self.buffer_size > 100_000 {
            warn!(
                "watch.buffer_size ({}) is very large. Each watch may hold that many events in memory",
                self.buffer_size
            );
        }

        Ok(())
    }
}

const fn default_buffer_size() -> usize {
    256
}
