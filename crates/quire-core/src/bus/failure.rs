//! Process-wide subscriber failure reporting

use std::sync::LazyLock;

use super::event::SubscriptionId;
use super::topic::Topic;

/// Report of a subscriber that panicked while handling an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberFailure {
    /// Name of the topic the failing subscriber is registered on
    pub topic: String,
    /// The failing subscription
    pub subscription: SubscriptionId,
    /// Panic payload rendered as text
    pub message: String,
}

static SUBSCRIBER_FAILURES: LazyLock<Topic<SubscriberFailure>> =
    LazyLock::new(|| Topic::failure_sink("quire.subscriber_failures"));

/// Topic receiving a [`SubscriberFailure`] for every panicking subscriber
///
/// Shared by every topic in the process. Panics raised by subscribers of this
/// topic are logged and dropped instead of being reported again.
pub fn subscriber_failures() -> &'static Topic<SubscriberFailure> {
    &SUBSCRIBER_FAILURES
}

/// Render a panic payload as text
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let static_str: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*static_str), "static");

        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*owned), "owned");

        let other: Box<dyn std::any::Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(&*other), "unknown panic");
    }

    #[test]
    fn test_failure_topic_is_shared() {
        let a = subscriber_failures();
        let b = subscriber_failures();
        assert_eq!(a.name(), "quire.subscriber_failures");
        assert!(a.same_topic(b));
    }
}
