use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use crate::event::ClinicEvent;

const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out hub shared as `Arc<EventBus>`. Every subscriber sees every
/// event published after it subscribed.
///
/// ```rust
/// use clinicops_events::{Audience, ClinicEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
/// bus.publish(
///     ClinicEvent::new("inventory.low_stock", "Low stock", "Gloves at 3 boxes")
///         .with_audience(Audience::roles(&["admin"])),
/// );
/// assert_eq!(rx.try_recv().unwrap().event_type, "inventory.low_stock");
/// ```
pub struct EventBus {
    sender: broadcast::Sender<ClinicEvent>,
    published: AtomicU64,
}

impl EventBus {
    /// A receiver that falls more than `capacity` events behind loses the
    /// oldest ones and gets `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: AtomicU64::new(0),
        }
    }

    /// Never blocks and never fails; with no subscribers the event is lost.
    pub fn publish(&self, event: ClinicEvent) {
        self.published.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            event_type = %event.event_type,
            entity_type = ?event.entity_type,
            entity_id = ?event.entity_id,
            audience = ?event.audience,
            "Event published"
        );
        if self.sender.send(event).is_err() {
            tracing::trace!("No subscribers for event");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClinicEvent> {
        self.sender.subscribe()
    }

    /// Zero in a running server means the notification router has stopped.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Events published since startup, delivered or not.
    pub fn published_total(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audience::Audience;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(
            ClinicEvent::new("handover.assigned", "New handover", "Check ward B")
                .with_audience(Audience::User(9)),
        );

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type, "handover.assigned");
        assert_eq!(received.audience, Audience::User(9));
    }

    #[tokio::test]
    async fn every_subscriber_gets_a_copy() {
        let bus = EventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(ClinicEvent::new("document.published", "SOP", "v2"));

        assert_eq!(first.recv().await.unwrap().event_type, "document.published");
        assert_eq!(second.recv().await.unwrap().event_type, "document.published");
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let bus = EventBus::default();
        bus.publish(ClinicEvent::new("early.event", "t", "m"));
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn publish_with_no_subscribers_is_still_counted() {
        let bus = EventBus::default();
        bus.publish(ClinicEvent::new("orphan.event", "t", "m"));
        assert_eq!(bus.published_total(), 1);
        assert_eq!(bus.subscriber_count(), 0);

        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }
}
