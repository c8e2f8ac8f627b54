//! Publish/subscribe bus
//!
//! - [`Topic`]: named bus instance owning subscribers and a sequence counter
//! - [`Event`]: immutable snapshot delivered to subscribers
//! - [`SubscriberFailure`]: report published when a subscriber panics

mod event;
mod failure;
mod topic;

pub use event::{Event, SubscriptionId};
pub use failure::{SubscriberFailure, panic_message, subscriber_failures};
pub use topic::{Subscriber, Topic};
