use async_trait::async_trait;

use crate::events::Event;

/// Hook into broker lifecycle events (logging, metrics, custom sinks).
///
/// Attach an implementation with
/// [`Broker::attach_observer`](crate::Broker::attach_observer); the
/// broker forwards every bus event to it in order. Implementations
/// should return quickly: a slow observer only delays its own event
/// stream, never the broker.
///
/// Downstream implementations need the `events` feature, which exports
/// the [`Event`] type at the crate root.
#[async_trait]
pub trait Observer {
    /// Called for every lifecycle event, in publish order.
    async fn on_event(&self, event: &Event);
}
