//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux) and for tests.
//!
//! ## Overview
//!
//! - `WorkerPool` using the Tokio blocking thread pool
//! - `CallbackChannel` using an in-process Tokio mpsc queue
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{QueueChannel, TokioWorkerPool};
//!
//! let pool = TokioWorkerPool::new()?;
//! let (channel, mut results) = QueueChannel::new("callback-1");
//! // Hand `pool` to the bridge configuration and `channel` to each call.
//! ```

mod background;
mod callback;

pub use background::TokioWorkerPool;
pub use callback::{QueueChannel, QueueReceiver};
