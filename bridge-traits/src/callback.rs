//! Callback Channel
//!
//! The host-owned handle through which native results travel back to the
//! script side. One channel exists per inbound call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Status envelope understood by the host plugin runtime.
///
/// The script side routes `Ok` results to its success callback and `Error`
/// results to its failure callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    Ok,
    Error,
}

/// A single outbound result as the host runtime sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginResult {
    /// Success or failure envelope
    pub status: ResultStatus,
    /// Message body, usually the encoded wire array
    pub message: Value,
    /// Keep the script-side callback registered for further results
    pub keep_callback: bool,
}

impl PluginResult {
    /// A one-shot success result.
    pub fn ok(message: impl Into<Value>) -> Self {
        Self {
            status: ResultStatus::Ok,
            message: message.into(),
            keep_callback: false,
        }
    }

    /// A one-shot error result.
    pub fn error(message: impl Into<Value>) -> Self {
        Self {
            status: ResultStatus::Error,
            message: message.into(),
            keep_callback: false,
        }
    }

    pub fn with_keep_callback(mut self, keep: bool) -> Self {
        self.keep_callback = keep;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }
}

/// Callback channel trait
///
/// Implemented by the host runtime for every call it forwards to native code:
/// - **Android**: wraps a Cordova `CallbackContext`
/// - **iOS**: wraps a command delegate plus callback id
/// - **Desktop/tests**: an in-process queue (see `bridge-desktop`)
///
/// Implementations must be callable from any thread; worker tasks send
/// progress and completion through the same handle as the entry thread.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::callback::{CallbackChannel, PluginResult};
/// use serde_json::json;
///
/// fn answer(channel: &dyn CallbackChannel) -> bridge_traits::error::Result<()> {
///     channel.send_plugin_result(PluginResult::ok(json!([0, null, "task-1", "done"])))
/// }
/// ```
pub trait CallbackChannel: Send + Sync {
    /// Deliver a result to the script side.
    fn send_plugin_result(&self, result: PluginResult) -> Result<()>;

    /// Convenience wrapper for a one-shot success.
    fn success(&self, message: Value) -> Result<()> {
        self.send_plugin_result(PluginResult::ok(message))
    }

    /// Convenience wrapper for a one-shot error.
    fn error(&self, message: Value) -> Result<()> {
        self.send_plugin_result(PluginResult::error(message))
    }

    /// Identifier used in diagnostics (callback id on the host side).
    fn callback_id(&self) -> Option<&str> {
        None
    }
}
