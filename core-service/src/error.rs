use core_bridge::message::ResultCode;
use core_bridge::{DispatchError, RequestError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Invalid request: {0}")]
    Request(#[from] RequestError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Gate class not registered: {0}")]
    ClassNotFound(String),

    #[error("Gate class already registered: {0}")]
    DuplicateClass(String),

    #[error("No gate instance for object: {0}")]
    GateNotFound(String),
}

impl ServiceError {
    /// Error band reported to the script side.
    pub fn result_code(&self) -> ResultCode {
        match self {
            ServiceError::ClassNotFound(_) => ResultCode::ErrorClassNotFound,
            ServiceError::Dispatch(e) => e.result_code(),
            ServiceError::Request(_) => ResultCode::ErrorInvalidArg,
            ServiceError::GateNotFound(_) => ResultCode::ErrorInvalidOperation,
            ServiceError::Runtime(_) | ServiceError::DuplicateClass(_) => ResultCode::ErrorFail,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
