//! # Bridge Events
//!
//! Gates and the service publish what happens to each call on a
//! `tokio::sync::broadcast` channel. Hosts, diagnostics screens and tests
//! subscribe to it instead of hooking into handler sets.
//!
//! ```text
//!  Gate ──── Dispatch / Cancel ───┐
//!                                 ├──> EventBus ──> subscribers
//!  BridgeService ─────── Gate ────┘
//! ```
//!
//! Publishing is synchronous and never blocks, so gates emit from the
//! dispatching thread and worker threads alike. `emit` fails only when nobody
//! is subscribed, which publishers ignore.
//!
//! A subscriber that falls more than the buffer size behind receives
//! `RecvError::Lagged(n)` once and then continues with newer events.
//!
//! ```rust
//! use core_runtime::events::{BridgeEvent, EventBus, GateEvent};
//!
//! let bus = EventBus::new(16);
//! let mut events = bus.subscribe();
//!
//! bus.emit(BridgeEvent::Gate(GateEvent::Created {
//!     object_id: "obj-1".to_string(),
//!     class_name: "com.example.SimpleGate".to_string(),
//! }))
//! .ok();
//!
//! assert!(events.try_recv().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Bridge Event Types
// ============================================================================

/// Everything published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum BridgeEvent {
    /// Method dispatch lifecycle
    Dispatch(DispatchEvent),
    /// Cancellation requests
    Cancel(CancelEvent),
    /// Gate instance lifecycle
    Gate(GateEvent),
}

impl BridgeEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            BridgeEvent::Dispatch(e) => e.description(),
            BridgeEvent::Cancel(e) => e.description(),
            BridgeEvent::Gate(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            BridgeEvent::Dispatch(DispatchEvent::Failed { .. }) => EventSeverity::Error,
            BridgeEvent::Gate(GateEvent::ClassNotFound { .. }) => EventSeverity::Error,
            BridgeEvent::Dispatch(DispatchEvent::Legacy { handled: false, .. }) => {
                EventSeverity::Warning
            }
            BridgeEvent::Cancel(_) | BridgeEvent::Gate(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Task id the event refers to, if any.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            BridgeEvent::Dispatch(DispatchEvent::Started { task_id, .. })
            | BridgeEvent::Dispatch(DispatchEvent::Resolved { task_id, .. })
            | BridgeEvent::Dispatch(DispatchEvent::AwaitingAsync { task_id, .. })
            | BridgeEvent::Dispatch(DispatchEvent::Failed { task_id, .. })
            | BridgeEvent::Cancel(CancelEvent::Requested { task_id, .. }) => task_id.as_deref(),
            _ => None,
        }
    }
}

/// How loudly a diagnostics view should show an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Dispatch Events
// ============================================================================

/// Events emitted while a call moves through a gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DispatchEvent {
    /// A call entered the dispatcher.
    Started {
        object_id: String,
        method: String,
        task_id: Option<String>,
    },
    /// The call finished with a terminal message already sent.
    Resolved {
        object_id: String,
        method: String,
        task_id: Option<String>,
    },
    /// The handler returned but completion was handed to background work.
    AwaitingAsync {
        object_id: String,
        method: String,
        task_id: Option<String>,
    },
    /// Resolution, decoding or the handler itself failed.
    Failed {
        object_id: String,
        method: String,
        task_id: Option<String>,
        /// Human-readable failure reason.
        reason: String,
    },
    /// A legacy `execute()` call returned.
    Legacy {
        object_id: String,
        action: String,
        handled: bool,
    },
}

impl DispatchEvent {
    fn description(&self) -> &str {
        match self {
            DispatchEvent::Started { .. } => "Dispatch started",
            DispatchEvent::Resolved { .. } => "Dispatch resolved",
            DispatchEvent::AwaitingAsync { .. } => "Dispatch awaiting async completion",
            DispatchEvent::Failed { .. } => "Dispatch failed",
            DispatchEvent::Legacy { .. } => "Legacy execute completed",
        }
    }
}

// ============================================================================
// Cancellation Events
// ============================================================================

/// Events related to cancel requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CancelEvent {
    /// A cancel signal reached a gate.
    Requested {
        object_id: String,
        /// `None` means cancel everything outstanding on the gate.
        task_id: Option<String>,
        /// Number of registered tasks removed.
        removed: usize,
    },
}

impl CancelEvent {
    fn description(&self) -> &str {
        match self {
            CancelEvent::Requested { task_id: None, .. } => "Cancel-all requested",
            CancelEvent::Requested { .. } => "Cancel requested",
        }
    }
}

// ============================================================================
// Gate Events
// ============================================================================

/// Events related to gate instances owned by the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum GateEvent {
    /// A gate instance was created for an object id.
    Created {
        object_id: String,
        class_name: String,
    },
    /// A gate instance was released.
    Disposed { object_id: String },
    /// A call named a class nobody registered.
    ClassNotFound { class_name: String },
}

impl GateEvent {
    fn description(&self) -> &str {
        match self {
            GateEvent::Created { .. } => "Gate created",
            GateEvent::Disposed { .. } => "Gate disposed",
            GateEvent::ClassNotFound { .. } => "Gate class not found",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for bridge events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// When a subscriber falls behind by more than `capacity` events it
    /// receives `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: BridgeEvent) -> Result<usize, SendError<BridgeEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&BridgeEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering.
///
/// ```rust
/// use core_runtime::events::{BridgeEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let dispatch_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, BridgeEvent::Dispatch(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<BridgeEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<BridgeEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&BridgeEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<BridgeEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            match &self.filter {
                Some(filter) if !filter(&event) => continue,
                _ => return Ok(event),
            }
        }
    }

    /// Only return events for one task id.
    pub fn for_task(self, task_id: impl Into<String>) -> Self {
        let task_id = task_id.into();
        self.filter(move |event| event.task_id() == Some(task_id.as_str()))
    }
}
