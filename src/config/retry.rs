use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;
use crate::WatchError;

/// Default first reconnect delay
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Default ceiling for reconnect delays
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);
/// Default growth factor between reconnect delays
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// What a resilient watch reports before each reconnect
#[derive(Debug, Clone)]
pub struct RetryNotice {
    /// 1-based retry number since the last healthy connection
    pub attempt: u32,
    /// Why the previous connection ended
    pub cause: WatchError,
    /// Delay slept before reconnecting
    pub next_backoff: Duration,
    /// Last revision delivered to the caller, 0 if none
    pub last_revision: u64,
}

/// Observability hook invoked before every reconnect
pub type OnRetry = Arc<dyn Fn(&RetryNotice) + Send + Sync>;

/// Reconnect policy of [`crate::WatchClient::watch_with_retry`]
///
/// Zero values mean "use the default". Negative values are rejected by
/// [`RetryConfig::validate`].
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    /// First reconnect delay (unit: milliseconds). Default: 1000
    #[serde(default)]
    pub initial_backoff_ms: i64,

    /// Maximum reconnect delay (unit: milliseconds). Default: 30000.
    /// Raised to `initial_backoff_ms` when smaller.
    #[serde(default)]
    pub max_backoff_ms: i64,

    /// Backoff growth factor. Values below 1.0 fall back to 2.0
    #[serde(default)]
    pub backoff_multiplier: f64,

    /// Maximum number of reconnects (0 means unlimited retries)
    #[serde(default)]
    pub max_retries: i64,

    #[serde(skip)]
    pub on_retry: Option<OnRetry>,
}

impl fmt::Debug for RetryConfig {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("initial_backoff_ms", &self.initial_backoff_ms)
            .field("max_backoff_ms", &self.max_backoff_ms)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("max_retries", &self.max_retries)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl RetryConfig {
    pub fn with_initial_backoff(
        mut self,
        backoff: Duration,
    ) -> Self {
        self.initial_backoff_ms = duration_to_ms(backoff);
        self
    }

    pub fn with_max_backoff(
        mut self,
        backoff: Duration,
    ) -> Self {
        self.max_backoff_ms = duration_to_ms(backoff);
        self
    }

    pub fn with_backoff_multiplier(
        mut self,
        multiplier: f64,
    ) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_max_retries(
        mut self,
        max_retries: u32,
    ) -> Self {
        self.max_retries = i64::from(max_retries);
        self
    }

    pub fn on_retry<F>(
        mut self,
        callback: F,
    ) -> Self
    where
        F: Fn(&RetryNotice) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    /// Rejects negative values and fills in defaults.
    pub fn validate(&self) -> Result<RetrySettings> {
        if self.initial_backoff_ms < 0 {
            return Err(ConfigError::Message(format!(
                "retry.initial_backoff_ms must not be negative, got {}",
                self.initial_backoff_ms
            ))
            .into());
        }
        if self.max_backoff_ms < 0 {
            return Err(ConfigError::Message(format!(
                "retry.max_backoff_ms must not be negative, got {}",
                self.max_backoff_ms
            ))
            .into());
        }
        if self.max_retries < 0 {
            return Err(ConfigError::Message(format!(
                "retry.max_retries must not be negative, got {}",
                self.max_retries
            ))
            .into());
        }

        let initial_backoff = match self.initial_backoff_ms {
            0 => DEFAULT_INITIAL_BACKOFF,
            ms => Duration::from_millis(ms as u64),
        };
        let max_backoff = match self.max_backoff_ms {
            0 => DEFAULT_MAX_BACKOFF,
            ms => Duration::from_millis(ms as u64),
        }
        .max(initial_backoff);
        let backoff_multiplier = if self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0 {
            self.backoff_multiplier
        } else {
            DEFAULT_BACKOFF_MULTIPLIER
        };

        Ok(RetrySettings {
            initial_backoff,
            max_backoff,
            backoff_multiplier,
            max_retries: u32::try_from(self.max_retries).unwrap_or(u32::MAX),
            on_retry: self.on_retry.clone(),
        })
    }
}

/// Validated form of [`RetryConfig`] used by the supervisor
#[derive(Clone)]
pub struct RetrySettings {
    pub(crate) initial_backoff: Duration,
    pub(crate) max_backoff: Duration,
    pub(crate) backoff_multiplier: f64,
    /// 0 = unbounded
    pub(crate) max_retries: u32,
    pub(crate) on_retry: Option<OnRetry>,
}

impl fmt::Debug for RetrySettings {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RetrySettings")
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl RetrySettings {
    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// 0 means unbounded
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub(crate) fn notify(
        &self,
        notice: &RetryNotice,
    ) {
        if let Some(callback) = &self.on_retry {
            callback(notice);
        }
    }
}

/// Rounds up so a non-zero duration never becomes 0 ("use the default").
fn duration_to_ms(d: Duration) -> i64 {
    i64::try_from(d.as_nanos().div_ceil(1_000_000)).unwrap_or(i64::MAX)
}
