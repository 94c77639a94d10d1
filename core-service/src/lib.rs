//! Bridge service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridge implementations (worker pool,
//! callback channels, logger sink) into the dispatch core and routes inbound
//! calls to gate instances. Desktop hosts typically enable the
//! `desktop-shims` feature (which depends on `bridge-desktop`) to get a
//! default worker pool.

pub mod error;
pub mod service;

pub use error::{Result, ServiceError};
pub use service::{BridgeService, GateFactory, GateServices};

pub use core_bridge::prelude;
pub use core_runtime::config::{BridgeConfig, UnresolvedPolicy};

/// Convenience bootstrapper for desktop hosts.
///
/// Builds a default configuration (Tokio worker pool, reported failures) and
/// an empty service ready for gate registration.
///
/// ```
/// # #[cfg(feature = "desktop-shims")]
/// # fn example() -> core_service::Result<()> {
/// let service = core_service::bootstrap_desktop()?;
/// assert_eq!(service.gate_count(), 0);
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop() -> Result<BridgeService> {
    let config = BridgeConfig::builder().build()?;
    Ok(BridgeService::new(config))
}
