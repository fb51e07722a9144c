//! Watch client implementation
//!
//! Contains the primary interface [`WatchClient`] which combines:
//! - one-shot subscriptions through [`WatchClient::watch`]
//! - self-healing subscriptions via [`WatchClient::watch_with_retry`]
//!
//! Owns the shutdown coordination of every watch it starts.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;
use config::ConfigError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::WatchClientBuilder;
use crate::config::RetryConfig;
use crate::config::WatchClientConfig;
use crate::watch::run_resilient_watch;
use crate::watch::spawn_watch_stream;
use crate::watch::ShutdownCoordinator;
use crate::watch::StopSignal;
use crate::Error;
use crate::Result;
use crate::WatchEvent;
use crate::WatchOptions;
use crate::WatchTransport;

/// Main entry point for watching keys on the coordination store
///
/// Cheap to clone; clones share the transport and the shutdown state, so
/// closing any clone stops the watches of all of them.
///
/// Created through [`WatchClient::new`] or [`WatchClient::builder`].
pub struct WatchClient<T: WatchTransport> {
    pub(super) transport: Arc<T>,
    pub(super) config: Arc<WatchClientConfig>,
    pub(super) shutdown: ShutdownCoordinator,
    pub(super) transport_closed: Arc<AtomicBool>,
}

impl<T: WatchTransport> Clone for WatchClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.clone(),
            transport_closed: self.transport_closed.clone(),
        }
    }
}

impl<T: WatchTransport> WatchClient<T> {
    /// Client with default configuration
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, WatchClientConfig::default())
    }

    pub fn with_config(
        transport: T,
        config: WatchClientConfig,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            config: Arc::new(config),
            shutdown: ShutdownCoordinator::new(),
            transport_closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a configured client builder
    pub fn builder(transport: T) -> WatchClientBuilder<T> {
        WatchClientBuilder::new(transport)
    }

    pub fn config(&self) -> &WatchClientConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_shutdown()
    }

    /// Number of background watch tasks still running
    pub fn active_watches(&self) -> usize {
        self.shutdown.active_tasks()
    }

    /// Subscribes once to changes of `key` (or every key under it with
    /// [`WatchOptions::with_prefix`]).
    ///
    /// Returns immediately; the subscription is opened in the background.
    /// The channel ends either with a clean close (stopped through `ctx`,
    /// client closed, receiver dropped, stream ended) or with exactly one
    /// terminal event followed by closure. Never reconnects.
    ///
    /// # Errors
    /// - [`Error::EmptyKey`] if `key` is empty
    /// - [`Error::ClientClosed`] after [`WatchClient::close`]
    /// - [`Error::Config`] for a zero buffer size
    ///
    /// # Example
    /// ```rust,ignore
    /// let mut rx = client.watch(&ctx, "config/", WatchOptions::default().with_prefix())?;
    /// while let Some(event) = rx.recv().await {
    ///     if event.is_terminal() {
    ///         eprintln!("watch ended: {:?}", event.error);
    ///         break;
    ///     }
    ///     if event.is_normal() {
    ///         println!("{:?} {:?} @{}", event.kind, event.key, event.revision);
    ///     }
    /// }
    /// ```
    pub fn watch(
        &self,
        ctx: &CancellationToken,
        key: impl AsRef<[u8]>,
        options: WatchOptions,
    ) -> Result<mpsc::Receiver<WatchEvent>> {
        let key = self.check_key(key)?;
        let buffer_size = self.buffer_size(&options)?;
        let request = options.to_request(key);

        debug!(key = ?request.key, prefix = request.prefix, "starting watch");
        Ok(spawn_watch_stream(
            self.transport.clone(),
            request,
            buffer_size,
            self.stop_signal(ctx),
            &self.shutdown,
        ))
    }

    /// Like [`WatchClient::watch`], but transparently reconnects after
    /// failures, resuming after the last delivered revision (or at the
    /// server's compaction floor when that is higher).
    ///
    /// The channel closes only when `ctx` is cancelled, the client is
    /// closed, the receiver is dropped, or the retry budget is used up. In
    /// the last case the final event carries
    /// [`crate::WatchError::RetriesExhausted`].
    ///
    /// # Errors
    /// Same as [`WatchClient::watch`], plus [`Error::Config`] for an invalid
    /// `retry` configuration (negative values).
    pub fn watch_with_retry(
        &self,
        ctx: &CancellationToken,
        key: impl AsRef<[u8]>,
        retry: RetryConfig,
        options: WatchOptions,
    ) -> Result<mpsc::Receiver<WatchEvent>> {
        let key = self.check_key(key)?;
        let settings = retry.validate()?;
        let buffer_size = self.buffer_size(&options)?;
        let request = options.to_request(key);

        debug!(key = ?request.key, prefix = request.prefix, ?settings, "starting resilient watch");
        let (tx, rx) = mpsc::channel(buffer_size);
        self.shutdown.spawn(run_resilient_watch(
            self.transport.clone(),
            request,
            settings,
            buffer_size,
            tx,
            self.stop_signal(ctx),
            self.shutdown.clone(),
        ));
        Ok(rx)
    }

    /// [`WatchClient::watch_with_retry`] using the client's configured
    /// default retry policy.
    pub fn watch_with_default_retry(
        &self,
        ctx: &CancellationToken,
        key: impl AsRef<[u8]>,
        options: WatchOptions,
    ) -> Result<mpsc::Receiver<WatchEvent>> {
        self.watch_with_retry(ctx, key, self.config.retry.clone(), options)
    }

    /// Stops every watch started by this client (and its clones), waits for
    /// their tasks to exit, then closes the transport.
    ///
    /// Never blocks on an in-progress backoff. Idempotent.
    pub async fn close(&self) {
        self.shutdown.shutdown().await;
        if !self.transport_closed.swap(true, Ordering::AcqRel) {
            self.transport.close().await;
            debug!("watch client closed");
        }
    }

    fn check_key(
        &self,
        key: impl AsRef<[u8]>,
    ) -> Result<Bytes> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        if self.shutdown.is_shutdown() {
            return Err(Error::ClientClosed);
        }
        Ok(Bytes::copy_from_slice(key))
    }

    fn buffer_size(
        &self,
        options: &WatchOptions,
    ) -> Result<usize> {
        match options.buffer_size.unwrap_or(self.config.watch.buffer_size) {
            0 => Err(ConfigError::Message("watch buffer size must be greater than 0".into()).into()),
            size => Ok(size),
        }
    }

    fn stop_signal(
        &self,
        ctx: &CancellationToken,
    ) -> StopSignal {
        StopSignal::new(ctx.clone(), self.shutdown.token().clone())
    }
}
