//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host runtime.
//!
//! ## Overview
//!
//! This crate defines the contract between the native dispatch core and the
//! host plugin runtime that owns the WebView/JS engine. Each trait represents a
//! capability the core requires but that is implemented differently per
//! platform (Android, iOS, desktop).
//!
//! ## Traits
//!
//! - [`CallbackChannel`](callback::CallbackChannel) - Deliver results to the script side
//! - [`WorkerPool`](background::WorkerPool) - Offload handler work to host threads
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ In Progress |
//! | Android  | TBD                 | 📋 Planned |
//! | iOS      | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert host failures (closed WebView, rejected
//! executor) into `BridgeError` with an actionable message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`. Results are delivered from worker
//! threads as well as from the thread that received the call.

pub mod background;
pub mod callback;
pub mod error;
pub mod log;

pub use error::BridgeError;

// Re-export commonly used types
pub use background::{InlineWorkerPool, Job, WorkerPool};
pub use callback::{CallbackChannel, PluginResult, ResultStatus};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
