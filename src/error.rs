//! # Error types used by the broker and its subscription channels.
//!
//! This module defines two error enums:
//!
//! - [`ChannelError`] errors raised by a single subscription channel
//!   (and by the idle-timer validation underneath it).
//! - [`BrokerError`] errors raised by the broker registry.
//!
//! Both types provide `as_label` for stable log/metric strings. A poll
//! that ends without data is **not** an error: the get call delivers an
//! empty batch instead.

use std::time::Duration;

use thiserror::Error;

/// # Errors produced by a subscription channel.
///
/// Construction failures are argument problems; `ChannelDown` is the
/// terminal-state rejection shared by every mutating operation.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The channel has been closed; nothing can be published or fetched.
    #[error("subscription channel is down")]
    ChannelDown,

    /// A subscription needs at least one topic to listen on.
    #[error("at least one topic expected")]
    NoTopics,

    /// The idle timeout must be a positive duration.
    #[error("positive timeout expected, got {value:?}")]
    InvalidTimeout {
        /// The rejected duration.
        value: Duration,
    },

    /// The per-get poll window must be a positive duration.
    #[error("positive polltime expected, got {value:?}")]
    InvalidPolltime {
        /// The rejected duration.
        value: Duration,
    },
}

impl ChannelError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ChannelError::ChannelDown => "channel_down",
            ChannelError::NoTopics => "channel_no_topics",
            ChannelError::InvalidTimeout { .. } => "channel_invalid_timeout",
            ChannelError::InvalidPolltime { .. } => "channel_invalid_polltime",
        }
    }
}

/// # Errors produced by the broker registry.
///
/// Channel-level failures surface through the `Channel` variant so
/// callers can keep matching on one type at the broker API.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The broker has been shut down; no operation is accepted anymore.
    #[error("pubsub broker is down")]
    BrokerDown,

    /// No live subscription channel is registered under this id.
    #[error("no channel for id '{id}'")]
    UnknownId {
        /// The id that failed to resolve.
        id: String,
    },

    /// An underlying subscription channel rejected the operation.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl BrokerError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::BrokerDown => "broker_down",
            BrokerError::UnknownId { .. } => "broker_unknown_id",
            BrokerError::Channel(e) => e.as_label(),
        }
    }
}
