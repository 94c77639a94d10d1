//! # Result Messages
//!
//! Wire encoding of call outcomes.
//!
//! Every message is a JSON array `[code, message|null, taskId|null, ...payload]`
//! wrapped in a [`PluginResult`]. The numeric codes are shared with the
//! script side and must not change.

use bridge_traits::{PluginResult, ResultStatus};
use serde_json::Value;

/// Result codes understood by the script side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ResultCode {
    SuccessOk = 0,
    SuccessProgress = 1,
    ErrorFail = 2,
    ErrorCancel = 3,
    ErrorInvalidArg = 4,
    ErrorNotImplement = 5,
    ErrorNotSupport = 6,
    ErrorInvalidOperation = 7,
    ErrorClassNotFound = 8,
    ErrorMethodNotFound = 9,
}

impl ResultCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_error(self) -> bool {
        !matches!(self, ResultCode::SuccessOk | ResultCode::SuccessProgress)
    }
}

impl TryFrom<i64> for ResultCode {
    type Error = i64;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        Ok(match value {
            0 => ResultCode::SuccessOk,
            1 => ResultCode::SuccessProgress,
            2 => ResultCode::ErrorFail,
            3 => ResultCode::ErrorCancel,
            4 => ResultCode::ErrorInvalidArg,
            5 => ResultCode::ErrorNotImplement,
            6 => ResultCode::ErrorNotSupport,
            7 => ResultCode::ErrorInvalidOperation,
            8 => ResultCode::ErrorClassNotFound,
            9 => ResultCode::ErrorMethodNotFound,
            other => return Err(other),
        })
    }
}

/// One outbound message for a call.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultMessage {
    /// Terminal success.
    Success {
        task_id: Option<String>,
        payload: Vec<Value>,
    },
    /// Non-terminal notification. With `keep_open` it is coded as progress;
    /// without, it carries the plain success code but still ends nothing.
    Progress {
        task_id: Option<String>,
        payload: Vec<Value>,
        keep_open: bool,
    },
    /// Terminal error.
    Error {
        code: ResultCode,
        message: Option<String>,
        task_id: Option<String>,
        payload: Vec<Value>,
    },
}

impl ResultMessage {
    pub fn success(task_id: Option<String>, payload: Vec<Value>) -> Self {
        ResultMessage::Success { task_id, payload }
    }

    pub fn progress(task_id: Option<String>, payload: Vec<Value>, keep_open: bool) -> Self {
        ResultMessage::Progress {
            task_id,
            payload,
            keep_open,
        }
    }

    pub fn error(
        code: ResultCode,
        message: Option<String>,
        task_id: Option<String>,
        payload: Vec<Value>,
    ) -> Self {
        ResultMessage::Error {
            code,
            message,
            task_id,
            payload,
        }
    }

    pub fn code(&self) -> ResultCode {
        match self {
            ResultMessage::Success { .. } => ResultCode::SuccessOk,
            ResultMessage::Progress {
                keep_open: true, ..
            } => ResultCode::SuccessProgress,
            ResultMessage::Progress { .. } => ResultCode::SuccessOk,
            ResultMessage::Error { code, .. } => *code,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            ResultMessage::Success { task_id, .. }
            | ResultMessage::Progress { task_id, .. }
            | ResultMessage::Error { task_id, .. } => task_id.as_deref(),
        }
    }

    pub fn payload(&self) -> &[Value] {
        match self {
            ResultMessage::Success { payload, .. }
            | ResultMessage::Progress { payload, .. }
            | ResultMessage::Error { payload, .. } => payload,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResultMessage::Progress { .. })
    }

    pub fn keep_callback(&self) -> bool {
        matches!(
            self,
            ResultMessage::Progress {
                keep_open: true,
                ..
            }
        )
    }

    pub fn status(&self) -> ResultStatus {
        match self {
            ResultMessage::Error { .. } => ResultStatus::Error,
            _ => ResultStatus::Ok,
        }
    }

    /// Encodes as `[code, message|null, taskId|null, ...payload]`.
    pub fn to_wire(&self) -> Value {
        let message = match self {
            ResultMessage::Error {
                message: Some(msg), ..
            } => Value::String(msg.clone()),
            _ => Value::Null,
        };
        let task_id = self
            .task_id()
            .map(|id| Value::String(id.to_string()))
            .unwrap_or(Value::Null);

        let mut wire = Vec::with_capacity(3 + self.payload().len());
        wire.push(Value::from(self.code().as_i32()));
        wire.push(message);
        wire.push(task_id);
        wire.extend(self.payload().iter().cloned());
        Value::Array(wire)
    }

    pub fn into_plugin_result(self) -> PluginResult {
        let status = self.status();
        let keep = self.keep_callback();
        PluginResult {
            status,
            message: self.to_wire(),
            keep_callback: keep,
        }
    }

    /// Decodes a wire array. Code 0 always decodes as terminal success, so a
    /// non-terminal notification sent without `keep_open` reads back as
    /// `Success`. Returns `None` for anything that is not a wire message.
    pub fn from_wire(wire: &Value) -> Option<Self> {
        let items = wire.as_array()?;
        if items.len() < 3 {
            return None;
        }

        let code = ResultCode::try_from(items[0].as_i64()?).ok()?;
        let message = match &items[1] {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            _ => return None,
        };
        let task_id = match &items[2] {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            _ => return None,
        };
        let payload = items[3..].to_vec();

        Some(match code {
            ResultCode::SuccessOk => ResultMessage::success(task_id, payload),
            ResultCode::SuccessProgress => ResultMessage::progress(task_id, payload, true),
            code => ResultMessage::error(code, message, task_id, payload),
        })
    }
}
