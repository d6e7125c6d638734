//! Broadcast-based event bus.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;

use crate::event::OpenclawEvent;

/// Default channel capacity. Sized generously since subscribers (the
/// dispatcher heartbeat, the transcript indexer, metrics) are expected to
/// drain promptly; a slow subscriber only loses events, it never blocks
/// publishers.
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// In-process publish/subscribe bus for [`OpenclawEvent`]s.
///
/// Ordering guarantee (spec §5): events are published in wall-clock order
/// per `runId` because every mutation that publishes an event does so while
/// still holding the subagent manager's critical section.
pub struct EventBus {
    sender: broadcast::Sender<Arc<OpenclawEvent>>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with an explicit channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers the event was delivered to. `0` is
    /// expected and harmless when nothing is currently subscribed.
    pub fn publish(&self, event: OpenclawEvent) -> usize {
        self.sender.send(Arc::new(event)).unwrap_or(0)
    }

    /// Subscribe to future events. Events published before this call are not
    /// replayed.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of currently active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// The channel capacity this bus was created with.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            capacity: self.capacity,
        }
    }
}

/// Receiver for events from an [`EventBus`].
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<OpenclawEvent>>,
}

impl EventReceiver {
    /// Receive the next event, waiting if necessary.
    ///
    /// Returns `None` only if the bus has been dropped. A slow receiver that
    /// lags behind the channel capacity skips the missed events (logging a
    /// warning) rather than returning `None`.
    pub async fn recv(&mut self) -> Option<Arc<OpenclawEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive the next event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<OpenclawEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "event receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openclaw_core::{RunId, SessionKey};

    fn sample_event() -> OpenclawEvent {
        OpenclawEvent::Spawned {
            run_id: RunId::new(),
            requester_session_key: SessionKey::new("s1"),
            child_session_key: SessionKey::new("s1/child"),
            task: "do a thing".to_owned(),
            started_at: openclaw_core::now(),
        }
    }

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        let count = bus.publish(sample_event());
        assert_eq!(count, 1);

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event_type(), "spawned");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_returns_zero() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(sample_event()), 0);
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = EventBus::new();
        let mut r1 = bus.subscribe();
        let mut r2 = bus.subscribe();

        assert_eq!(bus.publish(sample_event()), 2);
        assert!(r1.recv().await.is_some());
        assert!(r2.recv().await.is_some());
    }

    #[tokio::test]
    async fn try_recv_empty_is_none() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        assert!(receiver.try_recv().is_none());
    }

    #[tokio::test]
    async fn subscriber_count_tracks_active_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        let r1 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(r1);
    }

    #[test]
    fn default_capacity_is_documented_constant() {
        let bus = EventBus::new();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
    }
}
