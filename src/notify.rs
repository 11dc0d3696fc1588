use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::limits::DEFAULT_EVENT_BUFFER;
use crate::store::StoreEvent;

/// Broadcast hub for change notifications, one channel per collection.
pub struct NotifyHub {
    channels: DashMap<String, broadcast::Sender<StoreEvent>>,
    capacity: usize,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

impl NotifyHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to changes of a collection. Creates the channel if needed.
    pub fn subscribe(&self, collection: &str) -> broadcast::Receiver<StoreEvent> {
        let sender = self
            .channels
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, event: &StoreEvent) {
        if let Some(sender) = self.channels.get(&event.collection) {
            let _ = sender.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(collection: &str, key: &str) -> StoreEvent {
        StoreEvent {
            collection: collection.into(),
            key: Some(key.into()),
            value: Some(json!({"reason": "x"})),
        }
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::default();
        let mut rx = hub.subscribe("blocked_periods");

        let ev = event("blocked_periods", "p1");
        hub.send(&ev);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, ev);
    }

    #[tokio::test]
    async fn other_collections_are_not_delivered() {
        let hub = NotifyHub::default();
        let mut rx = hub.subscribe("users");
        hub.send(&event("counseling_bookings", "b1"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new(4);
        hub.send(&event("counseling_bookings", "b1"));
        assert!(hub.channels.is_empty());
    }
}
