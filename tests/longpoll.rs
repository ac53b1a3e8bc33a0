//! End-to-end coverage of the broker surface: fan-out, the long-poll
//! handoff, idle expiry, shutdown, and the aggregate delivery
//! guarantees (nothing lost, nothing delivered twice).

use std::collections::HashSet;
use std::time::Duration;

use longpoll::{Broker, BrokerError};
use tokio::time;

const MINUTE: Duration = Duration::from_secs(60);

#[tokio::test(start_paused = true)]
async fn fan_out_reaches_every_matching_subscription() {
    let broker: Broker<String> = Broker::new();
    let id1 = broker.subscribe(MINUTE, ["A", "B"]).unwrap();
    let id2 = broker.subscribe(MINUTE, ["A", "B"]).unwrap();
    assert_ne!(id1, id2);

    broker.publish("{}".to_string(), &["C"]).await.unwrap();
    time::sleep(Duration::from_millis(200)).await;
    assert_eq!(broker.channel(&id1).unwrap().queue_size(), 0);
    assert_eq!(broker.channel(&id2).unwrap().queue_size(), 0);

    broker.publish("{}".to_string(), &["A"]).await.unwrap();
    time::sleep(Duration::from_millis(200)).await;
    assert_eq!(broker.channel(&id1).unwrap().queue_size(), 1);
    assert_eq!(broker.channel(&id2).unwrap().queue_size(), 1);
}

#[tokio::test(start_paused = true)]
async fn parked_get_receives_a_published_value() {
    let broker: Broker<String> = Broker::new();
    let id = broker.subscribe(MINUTE, ["A"]).unwrap();

    let pending = broker.get(&id, Duration::from_secs(20)).unwrap();
    time::sleep(Duration::from_millis(5)).await;
    assert!(broker.channel(&id).unwrap().is_get_waiting());

    broker.publish("{}".to_string(), &["A"]).await.unwrap();
    let batch = pending.await.unwrap();
    assert_eq!(batch.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn overlapping_gets_deliver_exactly_once() {
    let broker: Broker<String> = Broker::new();
    let id = broker.subscribe(MINUTE, ["A"]).unwrap();

    let first = broker.get(&id, Duration::from_secs(20)).unwrap();
    time::sleep(Duration::from_millis(100)).await;
    let second = broker.get(&id, Duration::from_secs(20)).unwrap();
    time::sleep(Duration::from_millis(5)).await;

    broker.publish("{}".to_string(), &["A"]).await.unwrap();

    let got_first = first.await.unwrap();
    let got_second = second.await.unwrap();

    // the earlier getter was sent back when the newer one arrived
    assert!(got_first.is_empty());
    assert_eq!(got_first.len() + got_second.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn idle_subscription_expires_on_schedule() {
    let broker: Broker<String> = Broker::new();
    let id = broker.subscribe(Duration::from_millis(400), ["A"]).unwrap();
    let ch = broker.channel(&id).unwrap();

    time::sleep(Duration::from_millis(396)).await;
    assert!(ch.is_alive());

    time::sleep(Duration::from_millis(12)).await;
    assert!(!ch.is_alive());
    assert!(broker.channel(&id).is_none());
    assert!(broker.ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn get_calls_keep_the_subscription_alive() {
    let broker: Broker<String> = Broker::new();
    let id = broker.subscribe(Duration::from_millis(300), ["A"]).unwrap();

    for _ in 0..5 {
        time::sleep(Duration::from_millis(200)).await;
        let batch = broker
            .get(&id, Duration::from_millis(1))
            .unwrap()
            .await
            .unwrap();
        assert!(batch.is_empty());
    }
    assert!(broker.channel(&id).is_some());
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_releases_a_parked_get() {
    let broker: Broker<String> = Broker::new();
    let id = broker.subscribe(MINUTE, ["A", "B", "C"]).unwrap();
    let ch = broker.channel(&id).unwrap();

    let pending = broker.get(&id, Duration::from_millis(200)).unwrap();
    time::sleep(Duration::from_millis(5)).await;

    broker.unsubscribe(&id);

    let batch = pending.await.unwrap();
    assert!(batch.is_empty());
    assert!(!ch.is_alive());
    assert!(broker.channel(&id).is_none());
}

#[tokio::test]
async fn topics_union_is_sorted() {
    let broker: Broker<String> = Broker::new();
    broker.subscribe(MINUTE, ["A", "B"]).unwrap();
    broker.subscribe(MINUTE, ["B", "C"]).unwrap();
    broker.subscribe(MINUTE, ["C", "D"]).unwrap();

    assert_eq!(broker.topics(), ["A", "B", "C", "D"]);
}

#[tokio::test]
async fn shutdown_is_terminal_and_idempotent() {
    let broker: Broker<String> = Broker::new();
    let id = broker.subscribe(MINUTE, ["A"]).unwrap();

    broker.shutdown();
    broker.shutdown();

    assert!(matches!(
        broker.subscribe(MINUTE, ["A"]),
        Err(BrokerError::BrokerDown)
    ));
    assert!(matches!(
        broker.publish("{}".to_string(), &["A"]).await,
        Err(BrokerError::BrokerDown)
    ));
    assert!(matches!(
        broker.get(&id, Duration::from_secs(1)),
        Err(BrokerError::BrokerDown)
    ));
    assert!(broker.ids().is_empty());
    assert!(broker.channels().is_empty());
    assert!(broker.topics().is_empty());
}

#[tokio::test(start_paused = true)]
async fn single_getter_sees_publish_order() {
    let broker: Broker<String> = Broker::new();
    let id = broker.subscribe(MINUTE, ["A"]).unwrap();

    for i in 0..5 {
        broker.publish(format!("v{i}"), &["A"]).await.unwrap();
    }

    let batch = broker
        .get(&id, Duration::from_secs(20))
        .unwrap()
        .await
        .unwrap();
    let batch: Vec<&str> = batch.iter().map(|v| v.as_str()).collect();
    assert_eq!(batch, ["v0", "v1", "v2", "v3", "v4"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_publishers_lose_and_duplicate_nothing() {
    const PUBLISHERS: usize = 8;
    const PER_PUBLISHER: usize = 50;

    let broker: Broker<String> = Broker::new();
    let id = broker.subscribe(MINUTE, ["load"]).unwrap();

    let mut publishers = Vec::new();
    for p in 0..PUBLISHERS {
        let broker = broker.clone();
        publishers.push(tokio::spawn(async move {
            for i in 0..PER_PUBLISHER {
                broker.publish(format!("{p}:{i}"), &["load"]).await.unwrap();
            }
        }));
    }
    futures::future::join_all(publishers).await;

    let mut received: Vec<String> = Vec::new();
    loop {
        let batch = broker
            .get(&id, Duration::from_millis(100))
            .unwrap()
            .await
            .unwrap();
        if batch.is_empty() {
            break;
        }
        received.extend(batch.iter().map(|v| v.as_str().to_owned()));
    }

    assert_eq!(received.len(), PUBLISHERS * PER_PUBLISHER);
    let unique: HashSet<&str> = received.iter().map(|s| s.as_str()).collect();
    assert_eq!(unique.len(), PUBLISHERS * PER_PUBLISHER);

    // each publisher's values arrive in its own publish order
    for p in 0..PUBLISHERS {
        let prefix = format!("{p}:");
        let seq: Vec<usize> = received
            .iter()
            .filter_map(|s| s.strip_prefix(&prefix))
            .map(|i| i.parse().unwrap())
            .collect();
        assert_eq!(seq, (0..PER_PUBLISHER).collect::<Vec<_>>());
    }
}
