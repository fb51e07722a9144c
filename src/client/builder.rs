use super::WatchClient;
use crate::config::RetryConfig;
use crate::config::WatchClientConfig;
use crate::Result;
use crate::WatchTransport;

pub struct WatchClientBuilder<T: WatchTransport> {
    transport: T,
    config: WatchClientConfig,
}

impl<T: WatchTransport> WatchClientBuilder<T> {
    /// Create a new builder with default config over `transport`
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            config: WatchClientConfig::default(),
        }
    }

    /// Set the default channel capacity of every watch (default: 256)
    pub fn buffer_size(
        mut self,
        size: usize,
    ) -> Self {
        self.config.watch.buffer_size = size;
        self
    }

    /// Set the policy used by [`WatchClient::watch_with_default_retry`]
    pub fn retry(
        mut self,
        retry: RetryConfig,
    ) -> Self {
        self.config.retry = retry;
        self
    }

    /// Completely replaces the default configuration
    ///
    /// # Warning: Configuration Override
    /// This will discard all previous settings configured through individual
    /// methods like [`buffer_size`](WatchClientBuilder::buffer_size) or
    /// [`retry`](WatchClientBuilder::retry).
    ///
    /// # Example
    /// ```ignore
    /// let config = WatchClientConfig::new()?;
    /// let client = WatchClient::builder(transport).set_config(config).build()?;
    /// ```
    pub fn set_config(
        mut self,
        config: WatchClientConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and build the client
    pub fn build(self) -> Result<WatchClient<T>> {
        let config = self.config.validate()?;
        Ok(WatchClient::with_config(self.transport, config))
    }
}
