//! Long-polling core: channels, registry and the idle timer.
//!
//! This module contains the data-flow engine. The public API re-exported
//! from here is [`Broker`], [`Channel`] and [`Timeout`]; the broker is
//! the entry point for almost every caller.
//!
//! ## Files & responsibilities
//! - **broker.rs**: registry of subscription channels; subscribe/publish
//!   fan-out/get-by-id, enumeration (with a live-channel cache), orderly
//!   shutdown; publishes lifecycle events on the bus.
//! - **channel.rs**: one long-polling subscription; topic-filtered
//!   queue, the single-waiter handoff protocol, idle self-destruction.
//! - **timeout.rs**: pingable idle timer with expiry hook and exit
//!   report; every get call pings it.
//!
//! ## Wiring (module-level flow)
//! ```text
//! caller ──► Broker::subscribe(timeout, topics…) ──► Channel::new
//!                 │                                     └─ Timeout::start (hook = channel close)
//!                 └─ registry.insert(id → channel)
//!
//! caller ──► Broker::publish(data, topics…)
//!                 └─ for each live channel × topic: Channel::publish
//!                        └─ queue.push + ping parked waiter
//!
//! caller ──► Broker::get(id, polltime) ──► Channel::get
//!                 ├─ Timeout::ping (extends the idle lifetime)
//!                 ├─ queued data? deliver immediately
//!                 └─ park waiter ── publish signal / polltime ──► deliver
//!
//! Timeout expiry ──► Channel::close ──► on_close(id) ──► registry.remove
//! Broker::shutdown ──► drain registry ──► Channel::close for each
//! ```
//!
//! ## Notes
//! - `alive` flags are atomic and checked lock-free on the fast paths;
//!   every mutating path re-checks them under the lock.
//! - Locks guard in-memory operations only and are never held across an
//!   await.
//! - Shutdown drains the registry directly instead of relying on close
//!   hooks, so the hook's registry re-entry can never deadlock it.

mod broker;
mod channel;
mod timeout;

pub use broker::Broker;
pub use channel::{Channel, CloseHook};
pub use timeout::{Timeout, TimeoutHook};
