//! # Bridge Service
//!
//! Routes inbound calls to gate instances.
//!
//! ## Overview
//!
//! Hosts register one factory per gate class. The first call naming an
//! object id creates that object's gate; later calls reuse it until the
//! object is disposed. Each call is routed to `invoke`, or to the legacy
//! `execute` path when the envelope is marked compatible.
//!
//! ## Refused Calls
//!
//! Gates never answer calls they could not dispatch. The service does,
//! according to [`UnresolvedPolicy`]:
//!
//! | Failure | Code |
//! |---------|------|
//! | Unknown gate class | `ERROR_CLASS_NOT_FOUND` (8) |
//! | No matching method or legacy action | `ERROR_METHOD_NOT_FOUND` (9) |
//! | Undecodable argument or envelope | `ERROR_INVALID_ARG` (4) |
//! | Handler error or panic | `ERROR_FAIL` (2) |

use crate::error::{Result, ServiceError};
use bridge_traits::CallbackChannel;
use core_bridge::context::TaskContext;
use core_bridge::gate::{DispatchState, Dispatcher, Gate, HandlerSet};
use core_bridge::request::{args_from_value, CallRequest, ExecInfo};
use core_runtime::config::{BridgeConfig, UnresolvedPolicy};
use core_runtime::events::{BridgeEvent, EventBus, GateEvent, Receiver};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

/// Builds the gate for a new object id.
pub type GateFactory = Arc<dyn Fn(&str, &GateServices) -> Arc<dyn Dispatcher> + Send + Sync>;

/// Shared facilities handed to every gate the service creates.
#[derive(Clone)]
pub struct GateServices {
    pub config: BridgeConfig,
    pub events: EventBus,
}

pub struct BridgeService {
    services: GateServices,
    factories: RwLock<HashMap<String, GateFactory>>,
    gates: RwLock<HashMap<String, Arc<dyn Dispatcher>>>,
}

impl BridgeService {
    pub fn new(config: BridgeConfig) -> Self {
        let events = EventBus::new(config.event_buffer_size);
        Self {
            services: GateServices { config, events },
            factories: RwLock::new(HashMap::new()),
            gates: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.services.config
    }

    pub fn events(&self) -> &EventBus {
        &self.services.events
    }

    pub fn subscribe(&self) -> Receiver<BridgeEvent> {
        self.services.events.subscribe()
    }

    /// Registers a handler set type under `class_name`.
    ///
    /// `make` builds a fresh handler set for every new object id. Gates get
    /// the configured worker pool and the service event bus.
    pub fn register_gate<H, F>(&self, class_name: impl Into<String>, make: F) -> Result<()>
    where
        H: HandlerSet,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let factory: GateFactory = Arc::new(move |object_id: &str, services: &GateServices| {
            let gate = Gate::new(object_id, make())
                .with_worker_pool(Arc::clone(&services.config.worker_pool))
                .with_event_bus(services.events.clone());
            Arc::new(gate) as Arc<dyn Dispatcher>
        });
        self.register_factory(class_name, factory)
    }

    /// Registers a raw factory under `class_name`.
    pub fn register_factory(&self, class_name: impl Into<String>, factory: GateFactory) -> Result<()> {
        let class_name = class_name.into();
        let mut factories = self.factories.write();
        if factories.contains_key(&class_name) {
            return Err(ServiceError::DuplicateClass(class_name));
        }
        debug!(class_name = %class_name, "Registered gate class");
        factories.insert(class_name, factory);
        Ok(())
    }

    pub fn registered_classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = self.factories.read().keys().cloned().collect();
        classes.sort();
        classes
    }

    pub fn gate_count(&self) -> usize {
        self.gates.read().len()
    }

    /// Gate instance of `object_id`, if one was created.
    pub fn gate(&self, object_id: &str) -> Option<Arc<dyn Dispatcher>> {
        self.gates.read().get(object_id).cloned()
    }

    /// Dispatches one inbound call.
    ///
    /// On error the call has already been answered (or not) according to the
    /// configured policy; the error is returned for the host's own records.
    pub fn exec(
        &self,
        info: &ExecInfo,
        args: Vec<Value>,
        channel: Option<Arc<dyn CallbackChannel>>,
    ) -> Result<DispatchState> {
        let correlation_id = Uuid::new_v4();
        let span = info_span!(
            "exec",
            %correlation_id,
            object_id = %info.object_id,
            method = ?info.method,
            task_id = ?info.task_id,
            compatible = info.compatible
        );
        let _entered = span.enter();

        let context = TaskContext::new(CallRequest::from_exec_info(info, args, channel));
        let result = self.dispatch(info, &context);
        if let Err(e) = &result {
            self.surface(&context, e);
        }
        result
    }

    /// Decodes a raw envelope and argument array, then dispatches.
    pub fn exec_json(
        &self,
        exec_info: Value,
        args: Value,
        channel: Option<Arc<dyn CallbackChannel>>,
    ) -> Result<DispatchState> {
        let info = match ExecInfo::from_value(exec_info) {
            Ok(info) => info,
            Err(e) => {
                let error = ServiceError::from(e);
                warn!(error = %error, "Undecodable exec info");
                let request = CallRequest {
                    channel,
                    ..CallRequest::default()
                };
                self.surface(&TaskContext::new(request), &error);
                return Err(error);
            }
        };

        let args = match args_from_value(args) {
            Ok(args) => args,
            Err(e) => {
                let error = ServiceError::from(e);
                warn!(
                    object_id = %info.object_id,
                    task_id = ?info.task_id,
                    error = %error,
                    "Undecodable call arguments"
                );
                let request = CallRequest::from_exec_info(&info, Vec::new(), channel);
                self.surface(&TaskContext::new(request), &error);
                return Err(error);
            }
        };

        self.exec(&info, args, channel)
    }

    /// Cancels a task of the addressed object, or all of its tasks when the
    /// envelope carries no task id.
    ///
    /// Returns how many tasks were canceled. Unknown objects have nothing to
    /// cancel.
    pub fn cancel(&self, info: &ExecInfo) -> usize {
        match self.gate(&info.object_id) {
            Some(gate) => gate.cancel(info.task_id.as_deref()),
            None => {
                debug!(object_id = %info.object_id, "Cancel for unknown object ignored");
                0
            }
        }
    }

    /// Drops the gate of `object_id` after canceling its outstanding tasks.
    pub fn dispose(&self, object_id: &str) -> Result<()> {
        let gate = self
            .gates
            .write()
            .remove(object_id)
            .ok_or_else(|| ServiceError::GateNotFound(object_id.to_string()))?;

        gate.cancel(None);
        info!(object_id, "Gate disposed");
        self.emit(GateEvent::Disposed {
            object_id: object_id.to_string(),
        });
        Ok(())
    }

    fn dispatch(&self, info: &ExecInfo, context: &TaskContext) -> Result<DispatchState> {
        let class_name = info.class_name()?;
        let gate = self.gate_for(class_name, &info.object_id)?;
        let request = context.request();
        let method = request.method_name()?;

        if info.compatible {
            gate.execute(method, &request.args, context)?;
            Ok(DispatchState::Resolved)
        } else {
            Ok(gate.invoke(method, &request.args, context)?)
        }
    }

    fn gate_for(&self, class_name: &str, object_id: &str) -> Result<Arc<dyn Dispatcher>> {
        if let Some(gate) = self.gate(object_id) {
            return Ok(gate);
        }

        let factory = self.factories.read().get(class_name).cloned();
        let Some(factory) = factory else {
            warn!(class_name, "Gate class not registered");
            self.emit(GateEvent::ClassNotFound {
                class_name: class_name.to_string(),
            });
            return Err(ServiceError::ClassNotFound(class_name.to_string()));
        };

        let mut gates = self.gates.write();
        // Another thread may have created it while the lock was released.
        if let Some(gate) = gates.get(object_id) {
            return Ok(Arc::clone(gate));
        }

        let gate = factory(object_id, &self.services);
        gates.insert(object_id.to_string(), Arc::clone(&gate));
        drop(gates);

        info!(class_name, object_id, "Gate created");
        self.emit(GateEvent::Created {
            object_id: object_id.to_string(),
            class_name: class_name.to_string(),
        });
        Ok(gate)
    }

    fn surface(&self, context: &TaskContext, error: &ServiceError) {
        match self.services.config.unresolved_policy {
            UnresolvedPolicy::Report => {
                let message = error.to_string();
                context.reject_with(error.result_code(), Some(&message), Vec::new());
            }
            UnresolvedPolicy::Silent => {
                debug!(error = %error, "Refused call not reported");
            }
        }
    }

    fn emit(&self, event: GateEvent) {
        let _ = self.services.events.emit(BridgeEvent::Gate(event));
    }
}

impl std::fmt::Debug for BridgeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeService")
            .field("config", &self.services.config)
            .field("classes", &self.registered_classes())
            .field("gates", &self.gate_count())
            .finish()
    }
}
