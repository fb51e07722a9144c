//! Configuration management for the watch client.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH`)
//! - Environment variable overrides (`COORD_WATCH__` prefix)
//! - Component-wise validation
mod retry;
mod watch;

pub use retry::*;
pub use watch::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::ClientConfig;
use crate::Result;

/// Environment variable prefix, e.g. `COORD_WATCH__RETRY__MAX_RETRIES=5`
pub const ENV_PREFIX: &str = "COORD_WATCH";

/// Main configuration container for the watch client
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct WatchClientConfig {
    /// Watch channel defaults
    #[serde(default)]
    pub watch: WatchConfig,
    /// Default reconnect policy for resilient watches
    #[serde(default)]
    pub retry: RetryConfig,
    /// gRPC connection parameters
    #[serde(default)]
    pub client: ClientConfig,
}

impl Debug for WatchClientConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("WatchClientConfig")
            .field("watch", &self.watch)
            .field("retry", &self.retry)
            .finish()
    }
}

impl WatchClientConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `COORD_WATCH__` prefix (highest priority)
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("COORD_WATCH__WATCH__BUFFER_SIZE", "1024");
    /// let cfg = WatchClientConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    ///
    /// The `on_retry` callback is not serializable and is carried over as is.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let mut config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        config.retry.on_retry = self.retry.on_retry.clone();
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.watch.validate()?;
        self.retry.validate()?;
        self.client.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
