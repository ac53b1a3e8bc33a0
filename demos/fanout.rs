//! # Demo: fanout
//!
//! Three subscriptions with overlapping topic sets. A publish reaches
//! only the matching ones, and a subscription nobody polls expires on
//! its own and leaves the registry.
//!
//! ## Run
//! ```bash
//! cargo run --example fanout
//! ```

use std::time::Duration;

use longpoll::Broker;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let broker: Broker<String> = Broker::new();

    let ab = broker.subscribe(Duration::from_secs(60), ["alpha", "beta"])?;
    let bc = broker.subscribe(Duration::from_secs(60), ["beta", "gamma"])?;
    let cd = broker.subscribe(Duration::from_secs(1), ["gamma", "delta"])?;

    println!("[topics] {:?}", broker.topics());

    // "beta" matches the first two subscriptions only
    broker.publish("one".to_string(), &["beta"]).await?;
    for (name, id) in [("ab", &ab), ("bc", &bc), ("cd", &cd)] {
        let queued = broker.channel(id).map(|ch| ch.queue_size()).unwrap_or(0);
        println!("[queued] {name}={queued}");
    }

    // collect on the two matching subscriptions
    for id in [&ab, &bc] {
        let batch = broker.get(id, Duration::from_millis(100))?.await?;
        println!("[drained] {} value(s) from {id}", batch.len());
    }

    // the third subscription is never polled and expires by itself
    tokio::time::sleep(Duration::from_millis(1500)).await;
    println!("[alive] {} subscription(s) left", broker.ids().len());
    assert!(broker.channel(&cd).is_none());

    broker.shutdown();
    Ok(())
}
