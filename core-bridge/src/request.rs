//! # Inbound Calls
//!
//! Decoding of the exec-info envelope that accompanies every script call and
//! the immutable [`CallRequest`] built from it.
//!
//! ## Envelope
//!
//! ```json
//! {
//!   "feature": {
//!     "android": { "packageInfo": "com.example.SimpleGate" },
//!     "ios": { "className": "SimpleGate" }
//!   },
//!   "method": "coolMethod",
//!   "objectId": "gate-1",
//!   "taskId": "task-42",
//!   "compatible": false
//! }
//! ```
//!
//! `method` and `taskId` may be `null`. A call without a task id is neither
//! cancelable nor correlatable.

use crate::error::RequestError;
use bridge_traits::CallbackChannel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AndroidFeature {
    pub package_info: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IosFeature {
    pub class_name: String,
}

/// Per-platform names of the target handler set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub android: Option<AndroidFeature>,
    #[serde(default)]
    pub ios: Option<IosFeature>,
}

/// Routing information sent alongside the arguments of every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecInfo {
    pub feature: Feature,
    #[serde(default)]
    pub method: Option<String>,
    pub object_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub compatible: bool,
}

impl ExecInfo {
    pub fn from_value(value: Value) -> Result<Self, RequestError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Target class name; the android package name wins when both are set.
    pub fn class_name(&self) -> Result<&str, RequestError> {
        self.feature
            .android
            .as_ref()
            .map(|a| a.package_info.as_str())
            .or_else(|| self.feature.ios.as_ref().map(|i| i.class_name.as_str()))
            .filter(|name| !name.is_empty())
            .ok_or(RequestError::MissingClassName)
    }
}

/// One inbound call. Immutable once built; shared by every context clone.
#[derive(Clone, Default)]
pub struct CallRequest {
    pub method: Option<String>,
    pub args: Vec<Value>,
    pub class_name: Option<String>,
    pub object_id: String,
    pub task_id: Option<String>,
    pub compatible: bool,
    pub channel: Option<Arc<dyn CallbackChannel>>,
}

impl fmt::Debug for CallRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallRequest")
            .field("method", &self.method)
            .field("args", &self.args.len())
            .field("class_name", &self.class_name)
            .field("object_id", &self.object_id)
            .field("task_id", &self.task_id)
            .field("compatible", &self.compatible)
            .field("channel", &self.channel.as_ref().and_then(|c| c.callback_id()))
            .finish()
    }
}

impl CallRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            ..Self::default()
        }
    }

    /// Builds a request from a decoded envelope and its argument array.
    ///
    /// A missing class name is kept as `None` so the caller can still answer
    /// the call through its channel.
    pub fn from_exec_info(
        info: &ExecInfo,
        args: Vec<Value>,
        channel: Option<Arc<dyn CallbackChannel>>,
    ) -> Self {
        Self {
            method: info.method.clone(),
            args,
            class_name: info.class_name().ok().map(str::to_string),
            object_id: info.object_id.clone(),
            task_id: info.task_id.clone(),
            compatible: info.compatible,
            channel,
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = object_id.into();
        self
    }

    pub fn with_channel(mut self, channel: Arc<dyn CallbackChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn compatible(mut self, compatible: bool) -> Self {
        self.compatible = compatible;
        self
    }

    pub fn method_name(&self) -> Result<&str, RequestError> {
        self.method.as_deref().ok_or(RequestError::MissingMethod)
    }
}

/// Splits a raw JSON argument value into the ordered argument list.
pub fn args_from_value(value: Value) -> Result<Vec<Value>, RequestError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(RequestError::ArgumentsNotArray(other.to_string())),
    }
}
