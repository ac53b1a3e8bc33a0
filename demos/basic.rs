//! # Demo: basic
//!
//! Minimal long-poll round trip: one subscription, one parked get call,
//! one publish.
//!
//! ## Flow
//! ```text
//! subscribe("news") ──► get(5s) parks
//!                            │
//! publish("breaking story") ─┘──► batch of one value
//! get(200ms) ──► empty batch (no data, not an error)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic
//! ```

use std::time::Duration;

use longpoll::Broker;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let broker: Broker<String> = Broker::new();

    // 1. One subscription; it must be polled once a minute to stay up
    let id = broker.subscribe(Duration::from_secs(60), ["news"])?;
    println!("[subscribed] id={id}");

    // 2. Park a get call, then publish into it
    let pending = broker.get(&id, Duration::from_secs(5))?;
    broker
        .publish("breaking story".to_string(), &["news"])
        .await?;

    let batch = pending.await?;
    for value in &batch {
        println!("[received] {value}");
    }

    // 3. A poll that ends without data is an empty batch, not an error
    let empty = broker.get(&id, Duration::from_millis(200))?.await?;
    println!("[received] {} further values", empty.len());

    broker.shutdown();
    Ok(())
}
