//! Named topic with snapshot delivery

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use super::event::{Event, SubscriptionId};
use super::failure::{SubscriberFailure, panic_message, subscriber_failures};

/// Callback registered on a [`Topic`]
pub type Subscriber<T> = Arc<dyn Fn(&Event<T>) + Send + Sync>;

/// Mutable topic state, guarded by a single lock
struct Registry<T> {
    /// Subscribers in registration order (ids are increasing)
    subscribers: Vec<(SubscriptionId, Subscriber<T>)>,
    /// Last subscription id handed out
    last_id: u64,
    /// Last sequence number assigned to a fire
    sequence: u64,
}

struct TopicInner<T> {
    name: Arc<str>,
    /// Set on the failure topic so its own subscriber panics are not re-reported
    failure_sink: bool,
    registry: Mutex<Registry<T>>,
}

/// A named publish/subscribe bus instance
///
/// Cloning a `Topic` yields another handle to the same instance.
pub struct Topic<T> {
    inner: Arc<TopicInner<T>>,
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Topic<T> {
    /// Topic name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether both handles refer to the same topic instance
    pub fn same_topic(&self, other: &Topic<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.lock().subscribers.len()
    }

    /// Whether the topic has no subscribers
    pub fn is_empty(&self) -> bool {
        self.subscriber_count() == 0
    }
}

impl<T: 'static> Topic<T> {
    /// Create a new topic
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), false)
    }

    pub(crate) fn failure_sink(name: &str) -> Self {
        Self::build(name.to_string(), true)
    }

    fn build(name: String, failure_sink: bool) -> Self {
        Self {
            inner: Arc::new(TopicInner {
                name: Arc::from(name),
                failure_sink,
                registry: Mutex::new(Registry {
                    subscribers: Vec::new(),
                    last_id: 0,
                    sequence: 0,
                }),
            }),
        }
    }

    /// Register a callback
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Event<T>) + Send + Sync + 'static,
    {
        self.subscribe_arc(Arc::new(callback))
    }

    /// Register a shared callback
    ///
    /// Keep a clone of the `Arc` to remove the registration later with
    /// [`unsubscribe_callback`](Self::unsubscribe_callback).
    pub fn subscribe_arc(&self, callback: Subscriber<T>) -> SubscriptionId {
        self.register_with(|_| callback)
    }

    /// Register a callback that runs for the first delivered event only
    ///
    /// The registration is removed as part of that first delivery. Concurrent
    /// fires never invoke the callback twice.
    pub fn subscribe_once<F>(&self, callback: F) -> SubscriptionId
    where
        F: FnOnce(&Event<T>) + Send + 'static,
    {
        let slot = Mutex::new(Some(callback));
        self.register_with(move |id| {
            let subscriber: Subscriber<T> = Arc::new(move |event: &Event<T>| {
                let Some(callback) = slot.lock().take() else {
                    return;
                };
                event.topic().unsubscribe(id);
                callback(event);
            });
            subscriber
        })
    }

    /// Allocate an id and register the subscriber built from it, atomically
    fn register_with<B>(&self, build: B) -> SubscriptionId
    where
        B: FnOnce(SubscriptionId) -> Subscriber<T>,
    {
        let mut registry = self.inner.registry.lock();
        registry.last_id += 1;
        let id = SubscriptionId::new(registry.last_id);
        let subscriber = build(id);
        registry.subscribers.push((id, subscriber));
        trace!(topic = %self.name(), subscription = %id, "subscribed");
        id
    }

    /// Remove a subscription by id
    ///
    /// Returns `false` if no such subscription exists (already removed or
    /// never registered).
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.inner.registry.lock();
        match registry
            .subscribers
            .binary_search_by_key(&id, |(existing, _)| *existing)
        {
            Ok(index) => {
                registry.subscribers.remove(index);
                trace!(topic = %self.name(), subscription = %id, "unsubscribed");
                true
            }
            Err(_) => false,
        }
    }

    /// Remove the first registration of `callback`, by pointer identity
    pub fn unsubscribe_callback(&self, callback: &Subscriber<T>) -> bool {
        let mut registry = self.inner.registry.lock();
        let position = registry
            .subscribers
            .iter()
            .position(|(_, existing)| Arc::ptr_eq(existing, callback));

        match position {
            Some(index) => {
                let (id, _) = registry.subscribers.remove(index);
                trace!(topic = %self.name(), subscription = %id, "unsubscribed by callback");
                true
            }
            None => false,
        }
    }

    /// Fire an event and deliver it to every current subscriber
    ///
    /// Pass `None` to fire without a payload. Returns the sequence number
    /// assigned to this fire. Delivery happens on the calling thread, in
    /// registration order, against a snapshot of the subscriber list taken
    /// at fire time.
    pub fn fire(&self, payload: impl Into<Option<T>>) -> u64 {
        let (event, snapshot) = {
            let mut registry = self.inner.registry.lock();
            registry.sequence += 1;
            let event = Event::new(self.clone(), payload.into(), registry.sequence);
            (event, registry.subscribers.clone())
        };

        trace!(
            topic = %self.name(),
            sequence = event.sequence(),
            subscribers = snapshot.len(),
            "firing event"
        );

        for (id, subscriber) in &snapshot {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| subscriber(&event)));
            if let Err(payload) = delivered {
                self.report_failure(*id, panic_message(&*payload));
            }
        }

        event.sequence()
    }

    fn report_failure(&self, subscription: SubscriptionId, message: String) {
        warn!(
            topic = %self.name(),
            subscription = %subscription,
            panic = %message,
            "Subscriber panicked"
        );

        if self.inner.failure_sink {
            return;
        }

        let failure = SubscriberFailure {
            topic: self.name().to_string(),
            subscription,
            message,
        };
        let reported = panic::catch_unwind(AssertUnwindSafe(|| {
            subscriber_failures().fire(failure);
        }));
        if reported.is_err() {
            warn!(topic = %self.name(), "Failed to report subscriber failure");
        }
    }
}

impl<T> fmt::Debug for Topic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.lock();
        f.debug_struct("Topic")
            .field("name", &self.inner.name)
            .field("subscribers", &registry.subscribers.len())
            .field("sequence", &registry.sequence)
            .finish()
    }
}
