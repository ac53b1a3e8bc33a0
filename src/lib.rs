//! # longpoll
//!
//! **Longpoll** is an in-process publish/subscribe broker built around
//! the long-polling delivery pattern.
//!
//! Clients create topic-filtered subscription channels and repeatedly
//! issue blocking get calls that return as soon as any matching data has
//! been published, or empty after a bounded wait. The crate is designed
//! to back HTTP long-poll endpoints but carries no HTTP code itself; it
//! is purely a data-flow engine.
//!
//! ## Features
//!
//! | Area              | Description                                                          | Key types / traits           |
//! |-------------------|----------------------------------------------------------------------|------------------------------|
//! | **Broker**        | Registry of subscriptions; publish fan-out, lookup, shutdown.        | [`Broker`]                   |
//! | **Channels**      | Single-subscriber, multi-topic queues with idle self-destruction.    | [`Channel`]                  |
//! | **Idle timer**    | Pingable timeout primitive driving channel lifetimes.                | [`Timeout`]                  |
//! | **Observer API**  | Hook into channel lifecycle events (logging, metrics).               | [`Observer`]                 |
//! | **Errors**        | Typed errors for the broker and channel surfaces.                    | [`BrokerError`], [`ChannelError`] |
//! | **Configuration** | Broker tunables.                                                     | [`Config`]                   |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in `LogWriter` observer _(demo/reference only)_.
//! - `events`: re-exports [`Event`](crate::events::Event) and
//!   [`EventKind`](crate::events::EventKind) at the crate root for custom
//!   observer integrations.
//!
//! ```no_run
//! use std::time::Duration;
//! use longpoll::Broker;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker: Broker<String> = Broker::new();
//!
//!     // A subscription must be polled at least once a minute to stay up.
//!     let id = broker.subscribe(Duration::from_secs(60), ["news"])?;
//!
//!     // Park a get call, then publish into it.
//!     let pending = broker.get(&id, Duration::from_secs(20))?;
//!     broker.publish("hello".to_string(), &["news"]).await?;
//!
//!     let batch = pending.await?;
//!     assert_eq!(batch.len(), 1);
//!
//!     broker.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! Delivery contract, in short: a value published to a subscribed topic
//! is delivered to exactly one get call on that channel, in publish
//! order; a poll that ends without data is a successful empty batch, not
//! an error; a channel nobody polls within its idle timeout terminates
//! itself and leaves the registry.
//!
//! ---

mod config;
mod core;
mod error;
pub mod events;
mod observers;

// ---- Public re-exports ----

pub use crate::config::Config;
pub use crate::core::{Broker, Channel, CloseHook, Timeout, TimeoutHook};
pub use crate::error::{BrokerError, ChannelError};
pub use crate::observers::Observer;

// Optional: expose event types.
// Enable with: `--features events`
#[cfg(feature = "events")]
pub use crate::events::{Event, EventKind};

// Optional: expose a simple built-in logging observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use crate::observers::LogWriter;
