//! # Gate
//!
//! The facade that a handler set plugs into.
//!
//! ## Overview
//!
//! A [`Gate`] owns one handler set instance, its registration table, the
//! cancellation registry of that instance and the optional worker pool handed
//! to task contexts. Calls run one at a time per gate: the handler lock is held
//! for resolution and the synchronous part of the handler, so long-running
//! work must be moved to the worker pool.
//!
//! ## Call States
//!
//! ```text
//! Idle ──invoke──> Dispatching ──┬──> Resolved        (terminal message sent)
//!                                └──> AwaitingAsync   (handler detached)
//! ```
//!
//! A handler that returns without sending anything is completed with an
//! empty success. A handler that detached its context owns completion from
//! then on; an awaiting task that is never resolved or rejected leaks its
//! script-side callback.
//!
//! ## Failures
//!
//! Resolution, decode and handler failures (including panics) return a
//! [`DispatchError`] and send nothing. Surfacing them to the script side is
//! up to the caller.

use crate::cancel::CancellationRegistry;
use crate::context::{Invocation, TaskContext};
use crate::error::{DispatchError, Result};
use crate::message::ResultMessage;
use crate::method::{CallOutcome, MethodTable};
use crate::value::{format_signature, normalize_args};
use bridge_traits::WorkerPool;
use core_runtime::events::{BridgeEvent, CancelEvent, DispatchEvent, EventBus};
use parking_lot::Mutex;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Capability interface of an application handler set.
pub trait HandlerSet: Send + Sized + 'static {
    /// Declares the operations this handler set exposes.
    fn register(methods: &mut MethodTable<Self>);

    /// Legacy string-keyed entry point for compatible calls.
    ///
    /// Return `Ok(true)` when the action was handled. Results go straight to
    /// `context.channel()`; the standard envelope is not applied.
    fn execute(&mut self, action: &str, args: &[Value], context: &TaskContext) -> anyhow::Result<bool> {
        let _ = (args, context);
        warn!(action, "execute() is not implemented by this handler set");
        Ok(false)
    }

    /// Called after the registry dropped `task_id` (or every task for `None`).
    fn on_cancel(&mut self, task_id: Option<&str>) {
        let _ = task_id;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Dispatching,
    Resolved,
    AwaitingAsync,
}

/// Object-safe view of a gate, for hosts holding gates of different types.
pub trait Dispatcher: Send + Sync {
    fn object_id(&self) -> &str;

    fn invoke(&self, method: &str, args: &[Value], context: &TaskContext) -> Result<DispatchState>;

    fn execute(&self, action: &str, args: &[Value], context: &TaskContext) -> Result<()>;

    fn cancel(&self, task_id: Option<&str>) -> usize;

    fn state(&self) -> DispatchState;

    fn signatures(&self) -> Vec<String>;
}

pub struct Gate<H: HandlerSet> {
    object_id: String,
    handler: Mutex<H>,
    methods: MethodTable<H>,
    registry: Arc<CancellationRegistry>,
    pool: Option<Arc<dyn WorkerPool>>,
    events: Option<EventBus>,
    state: Mutex<DispatchState>,
}

impl<H: HandlerSet> fmt::Debug for Gate<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("object_id", &self.object_id)
            .field("methods", &self.methods)
            .field("cancelable", &self.registry.len())
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl<H: HandlerSet> Gate<H> {
    pub fn new(object_id: impl Into<String>, handler: H) -> Self {
        let mut methods = MethodTable::new();
        H::register(&mut methods);

        Self {
            object_id: object_id.into(),
            handler: Mutex::new(handler),
            methods,
            registry: Arc::new(CancellationRegistry::new()),
            pool: None,
            events: None,
            state: Mutex::new(DispatchState::Idle),
        }
    }

    /// Worker pool given to every context dispatched by this gate.
    pub fn with_worker_pool(mut self, pool: Arc<dyn WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn methods(&self) -> &MethodTable<H> {
        &self.methods
    }

    pub fn registry(&self) -> &Arc<CancellationRegistry> {
        &self.registry
    }

    /// State of the most recent call.
    pub fn state(&self) -> DispatchState {
        *self.state.lock()
    }

    pub fn is_canceled(&self, task_id: &str) -> bool {
        self.registry.is_canceled(task_id)
    }

    /// Resolves `method` against the registration table and runs it.
    ///
    /// Returns the state the call ended in. On error nothing was sent for the
    /// call by the gate.
    #[instrument(skip(self, args, context), fields(object_id = %self.object_id, task_id = ?context.task_id()))]
    pub fn invoke(
        &self,
        method: &str,
        args: &[Value],
        context: &TaskContext,
    ) -> Result<DispatchState> {
        let mut handler = self.handler.lock();
        let ctx = context.attach(Arc::clone(&self.registry), self.pool.clone());

        self.set_state(DispatchState::Dispatching);
        self.emit(BridgeEvent::Dispatch(DispatchEvent::Started {
            object_id: self.object_id.clone(),
            method: method.to_string(),
            task_id: owned(ctx.task_id()),
        }));

        let kinds = normalize_args(args);
        let outcome = match self.methods.resolve(method, &kinds) {
            None => Err(DispatchError::MethodNotFound {
                method: method.to_string(),
                signature: format_signature(&kinds),
            }),
            Some(entry) => {
                debug!(signature = entry.signature(), "Resolved handler");
                let call = Invocation::new(&ctx);
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    entry.call(&mut *handler, &call, args)
                }));

                match result {
                    Ok(CallOutcome::Completed(Ok(()))) => Ok(()),
                    Ok(CallOutcome::Completed(Err(e))) => Err(handler_failure(method, e)),
                    Ok(CallOutcome::BadArgument(e)) => Err(DispatchError::InvalidArgument {
                        method: method.to_string(),
                        index: e.index,
                        reason: e.reason,
                    }),
                    Err(payload) => Err(DispatchError::HandlerPanicked {
                        method: method.to_string(),
                        message: panic_message(payload.as_ref()),
                    }),
                }
            }
        };

        match outcome {
            Ok(()) => {
                if ctx.needs_auto_complete() && !ctx.is_terminated() {
                    ctx.send(ResultMessage::success(owned(ctx.task_id()), Vec::new()));
                }

                let state = if ctx.is_terminated() || ctx.needs_auto_complete() {
                    DispatchState::Resolved
                } else {
                    DispatchState::AwaitingAsync
                };

                self.set_state(state);
                let event = match state {
                    DispatchState::AwaitingAsync => DispatchEvent::AwaitingAsync {
                        object_id: self.object_id.clone(),
                        method: method.to_string(),
                        task_id: owned(ctx.task_id()),
                    },
                    _ => DispatchEvent::Resolved {
                        object_id: self.object_id.clone(),
                        method: method.to_string(),
                        task_id: owned(ctx.task_id()),
                    },
                };
                self.emit(BridgeEvent::Dispatch(event));
                debug!(state = ?state, "Dispatch finished");
                Ok(state)
            }
            Err(e) => {
                match &e {
                    DispatchError::MethodNotFound { .. } => debug!(error = %e, "Method not found"),
                    _ => error!(error = %e, "Dispatch failed"),
                }

                // A failed call never completes on its own, so drop any
                // cancelable registration it made.
                if !ctx.is_terminated() {
                    if let Some(task_id) = ctx.task_id() {
                        self.registry.complete(task_id);
                    }
                }

                self.set_state(DispatchState::Idle);
                self.emit(BridgeEvent::Dispatch(DispatchEvent::Failed {
                    object_id: self.object_id.clone(),
                    method: method.to_string(),
                    task_id: owned(ctx.task_id()),
                    reason: e.to_string(),
                }));
                Err(e)
            }
        }
    }

    /// Legacy path: the handler set dispatches `action` by hand.
    #[instrument(skip(self, args, context), fields(object_id = %self.object_id, task_id = ?context.task_id()))]
    pub fn execute(&self, action: &str, args: &[Value], context: &TaskContext) -> Result<()> {
        let mut handler = self.handler.lock();
        let ctx = context.attach(Arc::clone(&self.registry), self.pool.clone());

        let result = panic::catch_unwind(AssertUnwindSafe(|| handler.execute(action, args, &ctx)));
        let outcome = match result {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(DispatchError::ActionNotHandled(action.to_string())),
            Ok(Err(e)) => Err(DispatchError::InvocationFailed {
                method: action.to_string(),
                reason: format!("{:#}", e),
            }),
            Err(payload) => Err(DispatchError::HandlerPanicked {
                method: action.to_string(),
                message: panic_message(payload.as_ref()),
            }),
        };

        match &outcome {
            Ok(()) => debug!("Legacy action handled"),
            Err(DispatchError::ActionNotHandled(_)) => warn!("Legacy action not handled"),
            Err(e) => error!(error = %e, "Legacy action failed"),
        }

        if outcome.is_err() && !ctx.is_terminated() {
            if let Some(task_id) = ctx.task_id() {
                self.registry.complete(task_id);
            }
        }

        self.emit(BridgeEvent::Dispatch(DispatchEvent::Legacy {
            object_id: self.object_id.clone(),
            action: action.to_string(),
            handled: outcome.is_ok(),
        }));
        outcome
    }

    /// Cancels one task, or every task of this gate for `None`.
    ///
    /// Cancellation only flips registry state; running tasks notice it the
    /// next time they poll. Returns how many tasks were removed.
    pub fn cancel(&self, task_id: Option<&str>) -> usize {
        let removed = self.registry.cancel(task_id);
        self.handler.lock().on_cancel(task_id);

        info!(
            object_id = %self.object_id,
            task_id = ?task_id,
            removed,
            "Cancel requested"
        );
        self.emit(BridgeEvent::Cancel(CancelEvent::Requested {
            object_id: self.object_id.clone(),
            task_id: owned(task_id),
            removed,
        }));
        removed
    }

    fn set_state(&self, state: DispatchState) {
        *self.state.lock() = state;
    }

    fn emit(&self, event: BridgeEvent) {
        if let Some(events) = &self.events {
            // No subscribers is not an error for a publisher.
            let _ = events.emit(event);
        }
    }
}

impl<H: HandlerSet> Dispatcher for Gate<H> {
    fn object_id(&self) -> &str {
        Gate::object_id(self)
    }

    fn invoke(&self, method: &str, args: &[Value], context: &TaskContext) -> Result<DispatchState> {
        Gate::invoke(self, method, args, context)
    }

    fn execute(&self, action: &str, args: &[Value], context: &TaskContext) -> Result<()> {
        Gate::execute(self, action, args, context)
    }

    fn cancel(&self, task_id: Option<&str>) -> usize {
        Gate::cancel(self, task_id)
    }

    fn state(&self) -> DispatchState {
        Gate::state(self)
    }

    fn signatures(&self) -> Vec<String> {
        self.methods.signatures()
    }
}

/// Keeps context misuse propagated by a handler distinguishable from an
/// ordinary handler error.
fn handler_failure(method: &str, error: anyhow::Error) -> DispatchError {
    match error.downcast::<DispatchError>() {
        Ok(misuse @ DispatchError::ContextMisuse(_)) => misuse,
        Ok(other) => DispatchError::InvocationFailed {
            method: method.to_string(),
            reason: other.to_string(),
        },
        Err(error) => DispatchError::InvocationFailed {
            method: method.to_string(),
            reason: format!("{:#}", error),
        },
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
