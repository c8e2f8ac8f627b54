//! Event and subscription identifier types

use std::fmt;

use super::topic::Topic;

/// Identifier of a subscription, unique within its topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A fired event as seen by subscribers
///
/// Every subscriber present at fire time receives a reference to the same
/// `Event`. It carries a handle to the topic it was fired on, which lets a
/// callback unsubscribe itself or fire follow-up events.
pub struct Event<T> {
    topic: Topic<T>,
    payload: Option<T>,
    sequence: u64,
}

impl<T> Event<T> {
    pub(crate) fn new(topic: Topic<T>, payload: Option<T>, sequence: u64) -> Self {
        Self {
            topic,
            payload,
            sequence,
        }
    }

    /// Topic this event was fired on
    pub fn topic(&self) -> &Topic<T> {
        &self.topic
    }

    /// Payload, if the firer supplied one
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    /// Sequence number assigned at fire time (starts at 1)
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl<T: fmt::Debug> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("topic", &self.topic.name())
            .field("payload", &self.payload)
            .field("sequence", &self.sequence)
            .finish()
    }
}
