//! # Plexus Event Subscription Port
//!
//! Modules receive engine callbacks by subscribing to an [`EventBus`] while
//! they are active. The host decides what events exist; the bus only routes
//! them to whoever is subscribed at the moment of posting.
//!
//! - [`EventBus`]: the port itself. `subscribe`/`unsubscribe` are idempotent.
//! - [`DefaultEventBus`]: synchronous in-process implementation with an
//!   optional deferred queue.
//! - [`HostEvent`]: events the runtime itself emits (ticks, shutdown).
pub mod dispatcher;
pub mod types;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Result of event processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Event was processed and propagation should continue
    Continue,
    /// Event was processed and propagation should stop
    Stop,
}

/// Core event trait
pub trait Event: Any + fmt::Debug + Send + Sync {
    /// Get the name of this event
    fn name(&self) -> &'static str;

    /// Clone this event
    fn clone_event(&self) -> Box<dyn Event>;

    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Something that can be subscribed to the bus
pub trait EventSubscriber: Send + Sync {
    /// Unique subscriber name; the bus keys subscriptions by it
    fn subscriber_name(&self) -> &str;

    /// Higher priorities receive events first
    fn subscriber_priority(&self) -> i32 {
        0
    }

    fn handle_event(&self, event: &dyn Event) -> EventResult;
}

/// The event subscription port
pub trait EventBus: Send + Sync {
    /// Subscribe; a no-op if a subscriber with the same name is already present
    fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>);

    /// Unsubscribe by name; a no-op if not subscribed
    fn unsubscribe(&self, name: &str);

    fn is_subscribed(&self, name: &str) -> bool;

    /// Deliver an event synchronously to current subscribers
    fn post(&self, event: &dyn Event) -> EventResult;
}

pub use dispatcher::DefaultEventBus;
pub use types::HostEvent;
