//! # Task Context
//!
//! Per-call state shared between the dispatcher and handler code.
//!
//! ## Overview
//!
//! A [`TaskContext`] is created for every inbound call. Clones share the same
//! completion state, so a handler that hands a clone to a worker thread keeps
//! the dispatcher informed about whether a terminal message went out.
//!
//! While a handler runs synchronously it receives an [`Invocation`], which is
//! only valid for the duration of the call. Anything that must outlive the call
//! has to take its own clone through [`Invocation::detach`] or
//! [`Invocation::context`] before leaving the dispatching thread:
//!
//! ```ignore
//! methods.register("slow", |_, call, ()| {
//!     let Some(ctx) = call.detach() else { return Ok(()) };
//!     let worker = ctx.clone();
//!     ctx.spawn(Box::new(move || worker.resolve(vec!["done".into()])))?;
//!     Ok(())
//! });
//! ```

use crate::cancel::CancellationRegistry;
use crate::error::DispatchError;
use crate::message::ResultMessage;
use crate::request::CallRequest;
use bridge_traits::{BridgeError, CallbackChannel, Job, WorkerPool};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{error, warn};

#[derive(Debug)]
pub(crate) struct CallState {
    needs_auto_complete: AtomicBool,
    terminated: AtomicBool,
}

impl Default for CallState {
    fn default() -> Self {
        Self {
            needs_auto_complete: AtomicBool::new(true),
            terminated: AtomicBool::new(false),
        }
    }
}

/// Detachable handle to one call.
///
/// `Send + Sync` and cheap to clone. Result operations (`notify`, `resolve`,
/// `reject`) are available from any thread; see the `channel` module.
#[derive(Clone)]
pub struct TaskContext {
    request: Arc<CallRequest>,
    origin_thread: ThreadId,
    state: Arc<CallState>,
    registry: Option<Arc<CancellationRegistry>>,
    pool: Option<Arc<dyn WorkerPool>>,
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("request", &self.request)
            .field("origin_thread", &self.origin_thread)
            .field("state", &self.state)
            .field("pool", &self.pool.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

impl TaskContext {
    /// Creates a context owned by the current thread.
    pub fn new(request: CallRequest) -> Self {
        Self {
            request: Arc::new(request),
            origin_thread: thread::current().id(),
            state: Arc::new(CallState::default()),
            registry: None,
            pool: None,
        }
    }

    /// Binds the context to the gate that dispatches it.
    ///
    /// The calling thread becomes the origin thread.
    pub(crate) fn attach(
        &self,
        registry: Arc<CancellationRegistry>,
        pool: Option<Arc<dyn WorkerPool>>,
    ) -> Self {
        Self {
            request: Arc::clone(&self.request),
            origin_thread: thread::current().id(),
            state: Arc::clone(&self.state),
            registry: Some(registry),
            pool: pool.or_else(|| self.pool.clone()),
        }
    }

    /// Supplies a worker pool for [`TaskContext::spawn`].
    pub fn with_pool(mut self, pool: Arc<dyn WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn request(&self) -> &CallRequest {
        &self.request
    }

    pub fn task_id(&self) -> Option<&str> {
        self.request.task_id.as_deref()
    }

    pub fn object_id(&self) -> &str {
        &self.request.object_id
    }

    pub fn method(&self) -> Option<&str> {
        self.request.method.as_deref()
    }

    pub fn is_compatible(&self) -> bool {
        self.request.compatible
    }

    pub fn channel(&self) -> Option<&Arc<dyn CallbackChannel>> {
        self.request.channel.as_ref()
    }

    pub fn origin_thread(&self) -> ThreadId {
        self.origin_thread
    }

    pub fn is_origin_thread(&self) -> bool {
        thread::current().id() == self.origin_thread
    }

    /// True once a terminal message has gone out for this call.
    pub fn is_terminated(&self) -> bool {
        self.state.terminated.load(Ordering::SeqCst)
    }

    pub(crate) fn needs_auto_complete(&self) -> bool {
        self.state.needs_auto_complete.load(Ordering::SeqCst)
    }

    pub(crate) fn set_auto_complete(&self, enabled: bool) {
        self.state
            .needs_auto_complete
            .store(enabled, Ordering::SeqCst);
    }

    /// Claims the single terminal slot. Returns false if it was taken.
    pub(crate) fn claim_terminal(&self) -> bool {
        self.set_auto_complete(false);
        !self.state.terminated.swap(true, Ordering::SeqCst)
    }

    /// Registers this call's task as cancelable.
    ///
    /// Returns false when the call has no task id or the context is not bound
    /// to a gate.
    pub fn register_cancelable(&self) -> bool {
        match (self.task_id(), self.registry.as_ref()) {
            (Some(task_id), Some(registry)) => {
                registry.register_cancelable(task_id);
                true
            }
            (None, _) => {
                warn!(
                    object_id = %self.object_id(),
                    "Call has no task id; it cannot be canceled"
                );
                false
            }
            (_, None) => {
                warn!(
                    object_id = %self.object_id(),
                    "Context is not bound to a gate; cancellation unavailable"
                );
                false
            }
        }
    }

    /// Poll point for cooperative cancellation.
    ///
    /// Untracked tasks read as canceled, matching the registry.
    pub fn is_canceled(&self) -> bool {
        match (self.task_id(), self.registry.as_ref()) {
            (Some(task_id), Some(registry)) => registry.is_canceled(task_id),
            _ => true,
        }
    }

    pub(crate) fn registry(&self) -> Option<&Arc<CancellationRegistry>> {
        self.registry.as_ref()
    }

    /// Runs `job` on the host worker pool.
    pub fn spawn(&self, job: Job) -> Result<(), BridgeError> {
        match self.pool.as_ref() {
            Some(pool) => pool.execute(job),
            None => Err(BridgeError::NotAvailable(
                "no worker pool attached to task context".to_string(),
            )),
        }
    }
}

/// Synchronous view of the call that a handler is currently running.
///
/// Borrowed for the duration of the handler only; it cannot be stored.
pub struct Invocation<'a> {
    context: &'a TaskContext,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(context: &'a TaskContext) -> Self {
        Self { context }
    }

    /// Returns a detachable context and sets whether the dispatcher should
    /// still auto-complete the call.
    ///
    /// Only permitted from the thread running the invocation; returns `None`
    /// and logs otherwise.
    pub fn context(&self, auto_complete: bool) -> Option<TaskContext> {
        match self.try_context(auto_complete) {
            Ok(context) => Some(context),
            Err(e) => {
                error!(object_id = %self.context.object_id(), error = %e, "Task context unavailable");
                None
            }
        }
    }

    /// Like [`Invocation::context`], but reports misuse as an error so a
    /// handler can propagate it with `?`.
    pub fn try_context(&self, auto_complete: bool) -> Result<TaskContext, DispatchError> {
        if !self.context.is_origin_thread() {
            return Err(DispatchError::ContextMisuse(format!(
                "task context of {} requested off the method entry thread",
                self.context.method().unwrap_or("<unnamed>")
            )));
        }
        self.context.set_auto_complete(auto_complete);
        Ok(self.context.clone())
    }

    /// Takes ownership of completion; the dispatcher will not auto-complete.
    pub fn detach(&self) -> Option<TaskContext> {
        self.context(false)
    }

    /// Sends `payload` as the call's return value.
    ///
    /// Only permitted from the thread running the invocation.
    pub fn return_once(&self, payload: Value) {
        if !self.context.is_origin_thread() {
            error!(
                object_id = %self.context.object_id(),
                method = ?self.context.method(),
                "return_once() is only permitted from the method entry thread"
            );
            return;
        }
        self.context.set_auto_complete(false);
        self.context.send(ResultMessage::success(
            self.context.task_id().map(str::to_string),
            vec![payload],
        ));
    }

    pub fn task_id(&self) -> Option<&str> {
        self.context.task_id()
    }

    pub fn request(&self) -> &CallRequest {
        self.context.request()
    }

    pub fn cancellation(&self) -> Option<&Arc<CancellationRegistry>> {
        self.context.registry()
    }
}
