//! # Subscription registry and fan-out.
//!
//! [`Broker`] owns the map from subscription id to [`Channel`] and fans
//! every publication out across it. Channels unregister themselves
//! through their close hook when they expire, so the registry never
//! holds a terminated entry for long; explicit removal and shutdown
//! take the direct path and never depend on the hook.
//!
//! A cloned broker is a handle to the same registry.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::config::Config;
use crate::core::channel::{Channel, CloseHook};
use crate::error::{BrokerError, ChannelError};
use crate::events::{Bus, Event, EventKind};
use crate::observers::Observer;

/// The subscription manager: add and remove long-polling subscription
/// channels, publish to all of them, receive data by subscription id.
pub struct Broker<T: Send + Sync + 'static> {
    shared: Arc<Shared<T>>,
}

struct Shared<T: Send + Sync + 'static> {
    /// Single true→false transition on shutdown.
    alive: AtomicBool,
    registry: Mutex<Registry<T>>,
    bus: Bus,
}

struct Registry<T> {
    channels: HashMap<String, Arc<Channel<T>>>,
    /// Live-channel snapshot, reset to `None` on any membership change
    /// so enumeration does not rebuild it under every call.
    cache: Option<Vec<Arc<Channel<T>>>>,
}

impl<T: Send + Sync + 'static> Clone for Broker<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + Sync + 'static> Default for Broker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> Broker<T> {
    /// Creates a new, empty broker with the default [`Config`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new, empty broker with the given configuration.
    pub fn with_config(cfg: Config) -> Self {
        Self {
            shared: Arc::new(Shared {
                alive: AtomicBool::new(true),
                registry: Mutex::new(Registry {
                    channels: HashMap::new(),
                    cache: None,
                }),
                bus: Bus::new(cfg.bus_capacity),
            }),
        }
    }

    /// Creates a new subscription channel open for publishing and
    /// returns its id.
    ///
    /// The channel's close hook removes it from the registry, so idle
    /// expiry and explicit closes both keep the map consistent. Fails
    /// with [`BrokerError::BrokerDown`] after shutdown; channel
    /// construction errors propagate.
    pub fn subscribe<I, S>(&self, timeout: Duration, topics: I) -> Result<String, BrokerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.is_alive() {
            return Err(BrokerError::BrokerDown);
        }

        let shared = Arc::downgrade(&self.shared);
        let hook: CloseHook = Box::new(move |id: &str| {
            if let Some(shared) = shared.upgrade() {
                shared.unregister(id);
            }
        });
        let ch = Channel::new(timeout, Some(hook), topics)?;
        let id = ch.id().to_string();

        {
            let mut reg = self.shared.registry.lock();
            // shutdown may have drained the map since the check above;
            // a channel registered now would leak alive forever
            if !self.is_alive() {
                drop(reg);
                ch.close();
                return Err(BrokerError::BrokerDown);
            }
            reg.cache = None;
            reg.channels.insert(id.clone(), ch);
        }

        self.shared
            .bus
            .publish(Event::now(EventKind::ChannelCreated).with_channel(id.as_str()));
        Ok(id)
    }

    /// Publishes a value on every subscription channel, once per topic.
    /// Mismatched topics and dead channels are ignored silently.
    ///
    /// Fan-out iterates over a snapshot of the live channels, so
    /// channels expiring mid-publish are harmless.
    pub async fn publish<S>(&self, data: impl Into<Arc<T>>, topics: &[S]) -> Result<(), BrokerError>
    where
        S: AsRef<str>,
    {
        if !self.is_alive() {
            return Err(BrokerError::BrokerDown);
        }
        if topics.is_empty() {
            return Err(BrokerError::Channel(ChannelError::NoTopics));
        }

        let data = data.into();
        for ch in self.channels() {
            for topic in topics {
                // a channel dying mid-fan-out is not the publisher's concern
                let _ = ch.publish(Arc::clone(&data), topic.as_ref()).await;
            }
        }
        for topic in topics {
            self.shared
                .bus
                .publish(Event::now(EventKind::Published).with_topic(topic.as_ref()));
        }
        Ok(())
    }

    /// Requests data published on any topic of the given subscription.
    /// See [`Channel::get`] for the delivery contract.
    pub fn get(
        &self,
        id: &str,
        polltime: Duration,
    ) -> Result<oneshot::Receiver<Vec<Arc<T>>>, BrokerError> {
        if !self.is_alive() {
            return Err(BrokerError::BrokerDown);
        }
        match self.channel(id) {
            Some(ch) => Ok(ch.get(polltime)?),
            None => Err(BrokerError::UnknownId { id: id.to_string() }),
        }
    }

    /// Returns the live subscription channel behind the given id.
    pub fn channel(&self, id: &str) -> Option<Arc<Channel<T>>> {
        if !self.is_alive() {
            return None;
        }
        let reg = self.shared.registry.lock();
        reg.channels.get(id).filter(|ch| ch.is_alive()).cloned()
    }

    /// Returns all currently live subscription channels.
    ///
    /// Operations across the whole registry snapshot this list first and
    /// release the lock right away: a channel removed afterwards still
    /// sees the operation, one added afterwards does not.
    pub fn channels(&self) -> Vec<Arc<Channel<T>>> {
        if !self.is_alive() {
            return Vec::new();
        }
        let mut reg = self.shared.registry.lock();
        if reg.cache.is_none() {
            let live: Vec<Arc<Channel<T>>> = reg
                .channels
                .values()
                .filter(|ch| ch.is_alive())
                .cloned()
                .collect();
            reg.cache = Some(live);
        }
        match &reg.cache {
            Some(live) => live.clone(),
            None => Vec::new(),
        }
    }

    /// Returns the ids of all currently live subscription channels.
    pub fn ids(&self) -> Vec<String> {
        self.channels()
            .iter()
            .filter(|ch| ch.is_alive())
            .map(|ch| ch.id().to_string())
            .collect()
    }

    /// Returns the sorted, deduplicated union of topics across all live
    /// subscription channels.
    pub fn topics(&self) -> Vec<String> {
        let mut topics = BTreeSet::new();
        for ch in self.channels() {
            if ch.is_alive() {
                topics.extend(ch.topics());
            }
        }
        topics.into_iter().collect()
    }

    /// Terminates the subscription channel behind the given id and
    /// removes it from the registry. Silent on unknown ids and after
    /// shutdown.
    pub fn unsubscribe(&self, id: &str) {
        if let Some(ch) = self.channel(id) {
            // remove directly rather than waiting on the close hook, so
            // the entry goes away even for an already-dying channel
            self.shared.unregister(id);
            ch.close();
        }
    }

    /// Shuts the broker down and drops every subscription channel.
    /// Idempotent; only the first call acts.
    ///
    /// Entries are drained under the registry lock and closed after it
    /// is released; the close hooks find the map already empty.
    pub fn shutdown(&self) {
        if !self.shared.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shared
            .bus
            .publish(Event::now(EventKind::ShutdownRequested));

        let drained: Vec<Arc<Channel<T>>> = {
            let mut reg = self.shared.registry.lock();
            reg.cache = None;
            reg.channels.drain().map(|(_, ch)| ch).collect()
        };
        for ch in drained {
            ch.close();
        }
    }

    /// Reports whether the broker is up and running.
    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    /// Spawns a listener forwarding every lifecycle event to `observer`.
    ///
    /// The listener stops when the event stream lags or closes; attach a
    /// fresh observer to resume.
    pub fn attach_observer<O>(&self, observer: O)
    where
        O: Observer + Send + Sync + 'static,
    {
        let mut rx = self.shared.bus.subscribe();
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                observer.on_event(&ev).await;
            }
        });
    }

    /// Returns a receiver of the raw lifecycle event stream.
    #[cfg(feature = "events")]
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }
}

impl<T: Send + Sync + 'static> Shared<T> {
    /// Removes a channel entry; emits [`EventKind::ChannelDropped`] only
    /// when the entry was actually present.
    fn unregister(&self, id: &str) {
        let removed = {
            let mut reg = self.registry.lock();
            reg.cache = None;
            reg.channels.remove(id)
        };
        if removed.is_some() {
            self.bus
                .publish(Event::now(EventKind::ChannelDropped).with_channel(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    const MINUTE: Duration = Duration::from_secs(60);

    fn broker() -> Broker<String> {
        Broker::new()
    }

    #[tokio::test]
    async fn subscribe_assigns_distinct_ids() {
        let broker = broker();
        let id1 = broker.subscribe(MINUTE, ["a", "b"]).unwrap();
        let id2 = broker.subscribe(MINUTE, ["a", "b"]).unwrap();

        assert_ne!(id1, id2);
        assert_eq!(broker.ids().len(), 2);
        assert_eq!(broker.channels().len(), 2);
        assert!(broker.channel(&id1).is_some());
        assert!(broker.channel("missing").is_none());
    }

    #[tokio::test]
    async fn subscribe_propagates_channel_errors() {
        let broker = broker();
        let res = broker.subscribe(MINUTE, Vec::<String>::new());
        assert!(matches!(
            res,
            Err(BrokerError::Channel(ChannelError::NoTopics))
        ));
        let res = broker.subscribe(Duration::ZERO, ["a"]);
        assert!(matches!(
            res,
            Err(BrokerError::Channel(ChannelError::InvalidTimeout { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn publish_reaches_only_matching_topics() {
        let broker = broker();
        let id1 = broker.subscribe(MINUTE, ["a", "b"]).unwrap();
        let id2 = broker.subscribe(MINUTE, ["b", "c"]).unwrap();

        broker.publish("x".to_string(), &["z"]).await.unwrap();
        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(broker.channel(&id1).unwrap().queue_size(), 0);
        assert_eq!(broker.channel(&id2).unwrap().queue_size(), 0);

        broker.publish("x".to_string(), &["a"]).await.unwrap();
        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(broker.channel(&id1).unwrap().queue_size(), 1);
        assert_eq!(broker.channel(&id2).unwrap().queue_size(), 0);
    }

    #[tokio::test]
    async fn publish_requires_topics() {
        let broker = broker();
        let res = broker.publish("x".to_string(), &[] as &[&str]).await;
        assert!(matches!(
            res,
            Err(BrokerError::Channel(ChannelError::NoTopics))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn get_delegates_to_the_channel() {
        let broker = broker();
        let id = broker.subscribe(MINUTE, ["a"]).unwrap();

        let pending = broker.get(&id, Duration::from_secs(20)).unwrap();
        broker.publish("x".to_string(), &["a"]).await.unwrap();

        let batch = pending.await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].as_str(), "x");
    }

    #[tokio::test]
    async fn get_rejects_unknown_ids() {
        let broker = broker();
        let res = broker.get("missing", Duration::from_secs(1));
        assert!(matches!(res, Err(BrokerError::UnknownId { .. })));
    }

    #[tokio::test]
    async fn topics_are_sorted_and_deduplicated() {
        let broker = broker();
        broker.subscribe(MINUTE, ["b", "a"]).unwrap();
        broker.subscribe(MINUTE, ["c", "b"]).unwrap();

        assert_eq!(broker.topics(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn unsubscribe_removes_and_terminates() {
        let broker = broker();
        let id = broker.subscribe(MINUTE, ["a"]).unwrap();
        let ch = broker.channel(&id).unwrap();

        broker.unsubscribe(&id);

        assert!(!ch.is_alive());
        assert!(broker.channel(&id).is_none());
        assert!(broker.ids().is_empty());

        // silent on a second call and on unknown ids
        broker.unsubscribe(&id);
        broker.unsubscribe("missing");
    }

    #[tokio::test(start_paused = true)]
    async fn expired_channels_leave_the_registry() {
        let broker = broker();
        let id = broker.subscribe(Duration::from_millis(100), ["a"]).unwrap();
        assert_eq!(broker.ids().len(), 1);

        time::sleep(Duration::from_millis(150)).await;

        assert!(broker.channel(&id).is_none());
        assert!(broker.ids().is_empty());
        assert!(broker.topics().is_empty());
    }

    #[tokio::test]
    async fn shutdown_rejects_everything_afterwards() {
        let broker = broker();
        let id = broker.subscribe(MINUTE, ["a"]).unwrap();
        let ch = broker.channel(&id).unwrap();

        broker.shutdown();
        broker.shutdown();

        assert!(!broker.is_alive());
        assert!(!ch.is_alive());
        assert!(broker.ids().is_empty());
        assert!(broker.channels().is_empty());
        assert!(broker.topics().is_empty());
        assert!(matches!(
            broker.subscribe(MINUTE, ["a"]),
            Err(BrokerError::BrokerDown)
        ));
        assert!(matches!(
            broker.publish("x".to_string(), &["a"]).await,
            Err(BrokerError::BrokerDown)
        ));
        assert!(matches!(
            broker.get(&id, Duration::from_secs(1)),
            Err(BrokerError::BrokerDown)
        ));
    }

    #[cfg(feature = "events")]
    #[tokio::test]
    async fn lifecycle_events_are_observable() {
        let broker = broker();
        let mut rx = broker.subscribe_events();

        let id = broker.subscribe(MINUTE, ["a"]).unwrap();
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ChannelCreated);
        assert_eq!(ev.channel.as_deref(), Some(id.as_str()));

        broker.unsubscribe(&id);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ChannelDropped);

        broker.shutdown();
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ShutdownRequested);
    }
}
