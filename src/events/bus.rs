//! # Event bus for broadcasting lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that the
//! broker uses to announce channel lifecycle changes to any number of
//! observers.
//!
//! - [`Bus::publish`] sends an event to all subscribers (non-blocking).
//! - [`Bus::subscribe`] creates a new receiver for consuming events.
//!
//! Events are not persisted: with no active subscribers they are dropped
//! silently, and the bounded buffer discards the oldest undelivered
//! events when full.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events.
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// Errors are ignored when there are no subscribers; the broker
    /// operates fine unobserved.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Subscribes to the bus and returns a new independent receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn delivers_to_every_subscriber() {
        let bus = Bus::new(8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(Event::now(EventKind::Published));

        assert_eq!(rx1.recv().await.unwrap().kind, EventKind::Published);
        assert_eq!(rx2.recv().await.unwrap().kind, EventKind::Published);
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_a_no_op() {
        let bus = Bus::new(8);
        bus.publish(Event::now(EventKind::ShutdownRequested));
    }
}
