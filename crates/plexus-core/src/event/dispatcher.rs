use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::event::{Event, EventBus, EventResult, EventSubscriber};

struct Subscription {
    seq: u64,
    subscriber: Arc<dyn EventSubscriber>,
}

/// Synchronous in-process event bus.
///
/// Subscribers are kept sorted by priority (highest first), ties broken by
/// subscription order. Delivery works on a snapshot of the subscriber list, so
/// handlers may subscribe or unsubscribe (themselves included) while an event
/// is being delivered.
pub struct DefaultEventBus {
    subscribers: RwLock<Vec<Subscription>>,
    next_seq: AtomicU64,
    event_queue: Mutex<VecDeque<Box<dyn Event>>>,
}

impl fmt::Debug for DefaultEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultEventBus")
            .field("subscribers", &self.subscriber_names())
            .field("event_queue_size", &self.queue_size())
            .finish()
    }
}

impl DefaultEventBus {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_seq: AtomicU64::new(1),
            event_queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Names of current subscribers in delivery order
    pub fn subscriber_names(&self) -> Vec<String> {
        let subscribers = self.subscribers.read().unwrap_or_else(PoisonError::into_inner);
        subscribers
            .iter()
            .map(|s| s.subscriber.subscriber_name().to_string())
            .collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Queue an event for later delivery by [`process_queue`](Self::process_queue)
    pub fn queue_event(&self, event: Box<dyn Event>) {
        self.event_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(event);
    }

    /// Deliver every queued event, including ones queued by handlers meanwhile.
    /// Returns the number of events processed.
    pub fn process_queue(&self) -> usize {
        let mut count = 0;
        loop {
            // Pop under the lock, deliver without it.
            let next = self
                .event_queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(event) = next else { break };
            self.post(&*event);
            count += 1;
        }
        count
    }

    pub fn queue_size(&self) -> usize {
        self.event_queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn snapshot(&self) -> Vec<Arc<dyn EventSubscriber>> {
        let subscribers = self.subscribers.read().unwrap_or_else(PoisonError::into_inner);
        subscribers.iter().map(|s| s.subscriber.clone()).collect()
    }
}

impl Default for DefaultEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for DefaultEventBus {
    fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        let name = subscriber.subscriber_name();
        if subscribers.iter().any(|s| s.subscriber.subscriber_name() == name) {
            return;
        }
        log::trace!("Subscribing '{}' to the event bus", name);
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        subscribers.push(Subscription { seq, subscriber });
        subscribers.sort_by(|a, b| {
            b.subscriber
                .subscriber_priority()
                .cmp(&a.subscriber.subscriber_priority())
                .then(a.seq.cmp(&b.seq))
        });
    }

    fn unsubscribe(&self, name: &str) {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|s| s.subscriber.subscriber_name() != name);
        if subscribers.len() < before {
            log::trace!("Unsubscribed '{}' from the event bus", name);
        }
    }

    fn is_subscribed(&self, name: &str) -> bool {
        let subscribers = self.subscribers.read().unwrap_or_else(PoisonError::into_inner);
        subscribers.iter().any(|s| s.subscriber.subscriber_name() == name)
    }

    fn post(&self, event: &dyn Event) -> EventResult {
        for subscriber in self.snapshot() {
            if subscriber.handle_event(event) == EventResult::Stop {
                return EventResult::Stop;
            }
        }
        EventResult::Continue
    }
}
