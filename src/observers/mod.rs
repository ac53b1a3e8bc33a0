//! Observer layer: consumers of the lifecycle event stream.
//!
//! The broker emits events; it does not format or route them. This
//! module holds the [`Observer`] trait and the built-in stdout
//! reference implementation (feature `logging`).

mod observer;

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use observer::Observer;
