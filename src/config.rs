//! # Broker configuration.
//!
//! [`Config`] centralizes the tunables of a [`Broker`](crate::Broker)
//! instance. Subscription lifetimes and poll windows are per-call
//! arguments, not configuration.
//!
//! # Example
//! ```
//! use longpoll::Config;
//!
//! let mut cfg = Config::default();
//! cfg.bus_capacity = 256;
//!
//! assert_eq!(cfg.bus_capacity, 256);
//! ```

/// Configuration for a broker instance.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the lifecycle event bus channel. When exceeded, the
    /// oldest undelivered events are dropped.
    pub bus_capacity: usize,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self { bus_capacity: 1024 }
    }
}
