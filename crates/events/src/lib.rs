//! Notification bus for the storefront theme service.
//!
//! Background tasks publish their outcome as an [`Event`]; any number of
//! observers (dashboard WebSocket clients, tests) receive it. Delivery is
//! best-effort: a subscriber that falls behind loses the oldest events.
//!
//! Every event carries the [`TaskId`] of the task that produced it.
//! [`EventBus::subscribe`] sees everything, [`EventBus::subscribe_task`]
//! only sees one task's events.

mod bus;

pub use bus::{EventBus, Subscription};
pub use shopfront_protocol::{Event, TaskId};

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 64;
