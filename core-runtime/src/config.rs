//! # Bridge Configuration Module
//!
//! Provides configuration management for the native bridge.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `BridgeConfig` holding the host capabilities and dispatch settings the
//! bridge needs. It validates eagerly so that a misconfigured host fails at
//! startup instead of on the first call from script.
//!
//! ## Required Dependencies
//!
//! - `WorkerPool` - Thread pool that handlers offload long-running work to
//!
//! When the `desktop-shims` feature is enabled, a Tokio-backed pool from
//! `bridge-desktop` is injected automatically if none is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{BridgeConfig, UnresolvedPolicy};
//! use std::sync::Arc;
//!
//! let config = BridgeConfig::builder()
//!     .worker_pool(Arc::new(MyThreadPool))
//!     .unresolved_policy(UnresolvedPolicy::Silent)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use bridge_traits::WorkerPool;
use std::sync::Arc;

/// Largest accepted event buffer; larger values only hide slow subscribers.
const MAX_EVENT_BUFFER_SIZE: usize = 65_536;

/// What the service does when a gate refuses a call.
///
/// Covers unresolvable method signatures, undecodable arguments, handler
/// failures and legacy actions that report "not handled".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnresolvedPolicy {
    /// Send a terminal error to the script side with the matching error code.
    #[default]
    Report,
    /// Log locally and send nothing; the script side never hears back.
    Silent,
}

/// Bridge configuration.
///
/// Use [`BridgeConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct BridgeConfig {
    /// Host thread pool for background handler work
    pub worker_pool: Arc<dyn WorkerPool>,

    /// Behaviour when a call cannot be dispatched
    pub unresolved_policy: UnresolvedPolicy,

    /// Capacity of the lifecycle event bus
    pub event_buffer_size: usize,

    /// Logging settings, applied by the host through `init_logging`
    pub logging: LoggingConfig,
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("worker_pool", &self.worker_pool.name())
            .field("unresolved_policy", &self.unresolved_policy)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("logging", &self.logging)
            .finish()
    }
}

impl BridgeConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Event buffer size is within (0, 65536]
    /// - The worker pool reports itself available
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if !self.worker_pool.is_available() {
            return Err(Error::CapabilityMissing {
                capability: "WorkerPool".to_string(),
                message: format!(
                    "Worker pool '{}' reports itself unavailable",
                    self.worker_pool.name()
                ),
            });
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn worker_pool_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "WorkerPool".to_string(),
        message: "WorkerPool implementation is required for background handler work. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default TokioWorkerPool. \
                 Android: wrap CordovaInterface::getThreadPool(). \
                 iOS: wrap a global dispatch queue."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_worker_pool() -> Result<Arc<dyn WorkerPool>> {
    use bridge_desktop::TokioWorkerPool;

    // Reuse the caller's runtime when there is one; otherwise own a runtime.
    let pool = match TokioWorkerPool::current() {
        Ok(pool) => pool,
        Err(_) => TokioWorkerPool::new().map_err(|e| {
            Error::Internal(format!("Failed to create default WorkerPool: {}", e))
        })?,
    };

    let pool: Arc<dyn WorkerPool> = Arc::new(pool);
    Ok(pool)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_worker_pool() -> Result<Arc<dyn WorkerPool>> {
    Err(worker_pool_missing_error())
}

/// Builder for constructing [`BridgeConfig`] instances.
#[derive(Default)]
pub struct BridgeConfigBuilder {
    worker_pool: Option<Arc<dyn WorkerPool>>,
    unresolved_policy: UnresolvedPolicy,
    event_buffer_size: Option<usize>,
    logging: Option<LoggingConfig>,
}

impl BridgeConfigBuilder {
    /// Sets the worker pool implementation.
    ///
    /// If not provided, the desktop default (Tokio blocking pool) is used when
    /// the `desktop-shims` feature is enabled.
    pub fn worker_pool(mut self, pool: Arc<dyn WorkerPool>) -> Self {
        self.worker_pool = Some(pool);
        self
    }

    /// Sets how refused calls are surfaced.
    ///
    /// Default: [`UnresolvedPolicy::Report`]
    pub fn unresolved_policy(mut self, policy: UnresolvedPolicy) -> Self {
        self.unresolved_policy = policy;
        self
    }

    /// Sets the lifecycle event buffer size.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the logging configuration.
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds the final `BridgeConfig` instance.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` when no worker pool is available
    /// - `Config` when a value is out of range
    pub fn build(self) -> Result<BridgeConfig> {
        let worker_pool = match self.worker_pool {
            Some(pool) => pool,
            None => provide_default_worker_pool()?,
        };

        let config = BridgeConfig {
            worker_pool,
            unresolved_policy: self.unresolved_policy,
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
