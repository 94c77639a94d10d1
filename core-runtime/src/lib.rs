//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the native bridge:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the dispatch core and the
//! service facade depend on. It establishes the logging conventions and the
//! event broadcasting used to observe calls as they move through gates.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
