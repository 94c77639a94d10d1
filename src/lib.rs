//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-service`, `gate-sample`). Host applications can
//! depend on `nativebridge-workspace` and enable the documented features without
//! needing to wire each crate individually.

#[cfg(any(feature = "desktop-shims", feature = "sample"))]
pub use core_service as service;

#[cfg(feature = "sample")]
pub use gate_sample as sample;
