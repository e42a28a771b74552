//! Broadcast-backed event bus.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use shopfront_protocol::{Event, TaskId};

/// Process-wide publisher of task outcome events.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to every current subscriber.
    ///
    /// Returns how many subscribers were handed the event. Publishing with
    /// no subscribers is not an error; the event is simply dropped.
    pub fn publish(&self, event: impl Into<Event>) -> usize {
        let event = event.into();
        let task_id = event.task_id();
        let event_type = event.event_type();
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::debug!(%task_id, %event_type, receivers, "event published");
                receivers
            }
            Err(_) => {
                tracing::debug!(%task_id, %event_type, "event dropped: no subscribers");
                0
            }
        }
    }

    /// Subscribes to every event published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            task: None,
        }
    }

    /// Subscribes to events produced by one task only.
    pub fn subscribe_task(&self, task_id: TaskId) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            task: Some(task_id),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CAPACITY)
    }
}

/// Receiving half of a bus subscription.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<Event>,
    task: Option<TaskId>,
}

impl Subscription {
    /// Waits for the next matching event.
    ///
    /// Returns `None` once every [`EventBus`] handle has been dropped.
    /// Events lost because this subscriber lagged are skipped.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// The task this subscription is restricted to, if any.
    pub fn task_filter(&self) -> Option<TaskId> {
        self.task
    }

    fn matches(&self, event: &Event) -> bool {
        self.task.is_none_or(|id| event.task_id() == id)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use shopfront_protocol::ThemeInstalled;

    use super::*;

    fn installed(task_id: TaskId, success: bool) -> Event {
        if success {
            ThemeInstalled::succeeded(task_id).into()
        } else {
            ThemeInstalled::failed(task_id, "boom").into()
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(installed(TaskId::new(), true)), 0);
    }

    #[tokio::test]
    async fn every_subscriber_receives_every_event() {
        let bus = EventBus::new(4);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        let first = TaskId::new();
        let second = TaskId::new();
        assert_eq!(bus.publish(installed(first, true)), 2);
        bus.publish(installed(second, false));

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.recv().await.unwrap().task_id(), first);
            assert_eq!(sub.recv().await.unwrap().task_id(), second);
        }
    }

    #[tokio::test]
    async fn task_subscription_filters_other_tasks() {
        let bus = EventBus::new(8);
        let wanted = TaskId::new();
        let mut sub = bus.subscribe_task(wanted);
        assert_eq!(sub.task_filter(), Some(wanted));

        bus.publish(installed(TaskId::new(), true));
        bus.publish(installed(wanted, false));

        let Event::ThemeInstalled(event) = sub.recv().await.unwrap();
        assert_eq!(event.task_id, wanted);
        assert!(!event.success);
    }

    #[tokio::test]
    async fn task_subscription_waits_for_its_task() {
        let bus = EventBus::new(8);
        let mut sub = bus.subscribe_task(TaskId::new());
        bus.publish(installed(TaskId::new(), true));

        let result = tokio::time::timeout(Duration::from_millis(50), sub.recv()).await;
        assert!(result.is_err(), "unrelated event must not be delivered");
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_to_newest() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        let ids: Vec<TaskId> = (0..4).map(|_| TaskId::new()).collect();
        for id in &ids {
            bus.publish(installed(*id, true));
        }

        assert_eq!(sub.recv().await.unwrap().task_id(), ids[2]);
        assert_eq!(sub.recv().await.unwrap().task_id(), ids[3]);
    }

    #[tokio::test]
    async fn recv_ends_when_bus_dropped() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();
        drop(bus);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn subscriber_count_tracks_drops() {
        let bus = EventBus::default();
        let sub = bus.subscribe();
        let _other = bus.subscribe_task(TaskId::new());
        assert_eq!(bus.subscriber_count(), 2);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 1);
    }
}
