//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the broker registry.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! The broker is the only publisher; consumers are
//! [`Observer`](crate::Observer) listeners and anything holding a
//! receiver from `Broker::subscribe_events` (feature `events`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
