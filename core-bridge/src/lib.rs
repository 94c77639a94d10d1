//! # Core Bridge Module
//!
//! The dispatch engine that maps script-side calls onto native handlers.
//!
//! ## Overview
//!
//! A call arrives as an operation name, an ordered list of JSON values and a
//! callback channel. The engine:
//! - Normalizes the argument kinds so every JSON number resolves alike
//! - Resolves the call against a registration table built by the handler set
//! - Invokes the handler with a per-call [`TaskContext`](context::TaskContext)
//! - Encodes outcomes into wire messages (success, progress, error)
//! - Tracks cancelable tasks in a per-gate registry
//!
//! ## Handler Contract
//!
//! A handler that returns without sending anything gets an implicit empty
//! success. A handler that detaches its context (see
//! [`Invocation::detach`](context::Invocation::detach)) owns the task and must
//! eventually `resolve` or `reject` it; the engine does not time out
//! abandoned tasks.
//!
//! ## Usage
//!
//! ```ignore
//! use core_bridge::prelude::*;
//!
//! struct Echo;
//!
//! impl HandlerSet for Echo {
//!     fn register(methods: &mut MethodTable<Self>) {
//!         methods.register("echo", |_, call, (text,): (String,)| {
//!             call.return_once(text.into());
//!             Ok(())
//!         });
//!     }
//! }
//!
//! let gate = Gate::new("object-1", Echo);
//! gate.invoke("echo", &args, &context)?;
//! ```

pub mod cancel;
pub mod channel;
pub mod context;
pub mod error;
pub mod gate;
pub mod message;
pub mod method;
pub mod request;
pub mod value;

pub use error::{DispatchError, RequestError, Result};

pub mod prelude {
    //! Types most handler sets need.
    pub use crate::cancel::CancellationRegistry;
    pub use crate::context::{Invocation, TaskContext};
    pub use crate::error::{DispatchError, RequestError};
    pub use crate::gate::{DispatchState, Dispatcher, Gate, HandlerSet};
    pub use crate::message::{ResultCode, ResultMessage};
    pub use crate::method::{Json, JsonObject, MethodTable};
    pub use crate::request::{CallRequest, ExecInfo};
    pub use crate::value::ValueKind;
}
