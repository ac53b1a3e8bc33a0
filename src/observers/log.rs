//! # Simple logging observer for debugging and demos.
//!
//! [`LogWriter`] prints lifecycle events to stdout in a human-readable
//! format.
//!
//! ## Output format
//! ```text
//! [subscribed] channel=5f0c…
//! [dropped] channel=5f0c…
//! [published] topic=news
//! [shutdown-requested]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::observers::Observer;

/// Simple stdout logging observer.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions for debugging and demonstration purposes; implement a
/// custom [`Observer`] for structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Observer for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::ChannelCreated => {
                println!("[subscribed] channel={:?}", e.channel);
            }
            EventKind::ChannelDropped => {
                println!("[dropped] channel={:?}", e.channel);
            }
            EventKind::Published => {
                println!("[published] topic={:?}", e.topic);
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
        }
    }
}
