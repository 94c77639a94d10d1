//! # Dispatch Error Types

use crate::message::ResultCode;
use thiserror::Error;

/// Reasons a gate refused or failed a call.
///
/// A gate never reports these to the script side itself; the caller decides
/// whether to surface them (see `UnresolvedPolicy` in `core-runtime`).
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No registered handler has this name and argument signature.
    #[error("No handler for {method}{signature}")]
    MethodNotFound { method: String, signature: String },

    /// A handler matched but an argument could not be decoded.
    #[error("Invalid argument {index} for {method}: {reason}")]
    InvalidArgument {
        method: String,
        index: usize,
        reason: String,
    },

    /// The handler returned an error during its synchronous portion.
    #[error("Handler {method} failed: {reason}")]
    InvocationFailed { method: String, reason: String },

    /// The handler panicked during its synchronous portion.
    #[error("Handler {method} panicked: {message}")]
    HandlerPanicked { method: String, message: String },

    /// The legacy `execute` path reported the action as not handled.
    #[error("Action not handled: {0}")]
    ActionNotHandled(String),

    /// A context was used from the wrong thread or after completion.
    #[error("Task context misuse: {0}")]
    ContextMisuse(String),
}

impl DispatchError {
    /// Error band the script side expects for this failure.
    pub fn result_code(&self) -> ResultCode {
        match self {
            DispatchError::MethodNotFound { .. } => ResultCode::ErrorMethodNotFound,
            DispatchError::InvalidArgument { .. } => ResultCode::ErrorInvalidArg,
            DispatchError::ActionNotHandled(_) => ResultCode::ErrorMethodNotFound,
            DispatchError::ContextMisuse(_) => ResultCode::ErrorInvalidOperation,
            DispatchError::InvocationFailed { .. } | DispatchError::HandlerPanicked { .. } => {
                ResultCode::ErrorFail
            }
        }
    }
}

/// Errors decoding an inbound call envelope.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Malformed exec info: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Exec info names no target class")]
    MissingClassName,

    #[error("Exec info has no method or action name")]
    MissingMethod,

    #[error("Arguments must be a JSON array, got {0}")]
    ArgumentsNotArray(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_code_bands() {
        let not_found = DispatchError::MethodNotFound {
            method: "foo".to_string(),
            signature: "(number)".to_string(),
        };
        assert_eq!(not_found.result_code(), ResultCode::ErrorMethodNotFound);
        assert_eq!(not_found.to_string(), "No handler for foo(number)");

        let bad_arg = DispatchError::InvalidArgument {
            method: "foo".to_string(),
            index: 1,
            reason: "expected object".to_string(),
        };
        assert_eq!(bad_arg.result_code(), ResultCode::ErrorInvalidArg);

        let failed = DispatchError::InvocationFailed {
            method: "foo".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(failed.result_code(), ResultCode::ErrorFail);
        assert_eq!(
            DispatchError::ActionNotHandled("bar".to_string()).result_code(),
            ResultCode::ErrorMethodNotFound
        );
    }
}
