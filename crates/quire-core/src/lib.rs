//! # Quire Core
//!
//! Synchronous publish/subscribe primitive shared by the Quire crates.
//!
//! A [`Topic`] is a named, cheaply cloneable bus instance. Subscribers are
//! plain callbacks invoked on the firing thread, in registration order, with
//! an immutable [`Event`] snapshot.
//!
//! ## Guarantees
//!
//! - **Snapshot delivery**: `fire` captures the subscriber list under the topic
//!   lock and delivers outside of it, so callbacks may subscribe or
//!   unsubscribe on the same topic without deadlocking.
//! - **Failure isolation**: a panicking subscriber never stops delivery to the
//!   others and never unwinds into the firer. Each failure is published on the
//!   process-wide [`subscriber_failures`] topic.
//! - **Monotonic identifiers**: subscription ids and event sequence numbers are
//!   per-topic, start at 1 and are never reused.
//!
//! ## Example
//!
//! ```rust
//! use quire_core::Topic;
//!
//! let topic: Topic<String> = Topic::new("config.changed");
//! let id = topic.subscribe(|event| {
//!     println!("#{} -> {:?}", event.sequence(), event.payload());
//! });
//!
//! topic.fire("reloaded".to_string());
//! assert!(topic.unsubscribe(id));
//! ```

pub mod bus;

pub use bus::{
    Event, Subscriber, SubscriberFailure, SubscriptionId, Topic, panic_message, subscriber_failures,
};
