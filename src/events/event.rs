//! # Lifecycle events emitted by the broker.
//!
//! The [`EventKind`] enum classifies what happened; the [`Event`] struct
//! carries the metadata (channel id, topic, timestamps).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that
//! increases monotonically, so events can be ordered correctly even when
//! delivered out-of-order through async channels.
//!
//! ## Example
//! ```rust
//! # #[cfg(feature = "events")]
//! # {
//! use longpoll::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::ChannelDropped).with_channel("s-42");
//!
//! assert_eq!(ev.kind, EventKind::ChannelDropped);
//! assert_eq!(ev.channel.as_deref(), Some("s-42"));
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of broker lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A subscription channel was created and registered.
    ChannelCreated,
    /// A subscription channel left the registry (explicit removal or
    /// idle expiry).
    ChannelDropped,
    /// Data was published on a topic and fanned out to the registry.
    Published,
    /// Broker shutdown began; every channel is being dropped.
    ShutdownRequested,
}

/// Lifecycle event with optional metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp (may go backwards, use for logging only).
    pub at: SystemTime,
    /// Subscription channel id, if applicable.
    pub channel: Option<String>,
    /// Topic name, if applicable.
    pub topic: Option<String>,
    /// The kind of event.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp
    /// and the next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, Ordering::Relaxed),
            at: SystemTime::now(),
            channel: None,
            topic: None,
            kind,
        }
    }

    /// Attaches a subscription channel id.
    pub fn with_channel(mut self, id: impl Into<String>) -> Self {
        self.channel = Some(id.into());
        self
    }

    /// Attaches a topic name.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::now(EventKind::Published);
        let b = Event::now(EventKind::Published);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_attach_metadata() {
        let ev = Event::now(EventKind::ChannelCreated)
            .with_channel("id-1")
            .with_topic("news");
        assert_eq!(ev.kind, EventKind::ChannelCreated);
        assert_eq!(ev.channel.as_deref(), Some("id-1"));
        assert_eq!(ev.topic.as_deref(), Some("news"));
    }
}
