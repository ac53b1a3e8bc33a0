//! # A single long-polling subscription channel.
//!
//! [`Channel`] owns a fixed topic set, an in-memory queue of published
//! values, and a single "waiting getter" slot. Data published to any of
//! the subscribed topics is either handed to the currently parked get
//! call or queued for the next one; the receiving side is never split
//! by topic.
//!
//! The channel self-destructs when no get call arrives within the idle
//! timeout given at construction. Every get call extends the lifetime
//! by a full timeout.
//!
//! ## Handoff protocol
//! ```text
//!  publish(data, topic) ──► queue.push(data) ──► ping parked waiter
//!                                                      │
//!  get(polltime) ─► queue non-empty? drain & return    ▼
//!                   else park waiter ◄── signal ── waiter wakes,
//!                        │                         drains the queue
//!                        └── polltime elapses ──► return empty
//! ```
//!
//! At most one waiter is ever parked. A newly arriving get pre-empts
//! the parked one (it is signaled and returns whatever is queued,
//! normally nothing), so no value is ever delivered twice and nothing
//! queued is lost across overlapping get calls.

use std::collections::HashSet;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tokio::{task, time};
use uuid::Uuid;

use crate::core::timeout::{Timeout, TimeoutHook};
use crate::error::ChannelError;

/// Callback invoked once with the channel id on the terminal transition.
///
/// The broker registers its unregister path here so a channel that
/// expires on its own also leaves the registry.
pub type CloseHook = Box<dyn Fn(&str) + Send + Sync + 'static>;

/// A single-subscriber, multi-topic long-polling channel.
///
/// Values are held as `Arc<T>` and never interpreted; a datum published
/// to several channels is shared, not cloned.
pub struct Channel<T> {
    id: String,
    /// Single true→false transition; checked lock-free on fast paths.
    alive: AtomicBool,
    /// Fixed at construction, cleared on close.
    topics: RwLock<HashSet<String>>,
    state: Mutex<GetState<T>>,
    watcher: Timeout,
    on_close: Option<CloseHook>,
}

struct GetState<T> {
    /// Published but uncollected values, in publish order. Non-empty
    /// only while no waiter is parked.
    queue: Vec<Arc<T>>,
    /// At most one parked getter.
    waiter: Option<Waiter>,
    next_tag: u64,
}

/// Descriptor of a parked get call.
///
/// `tx == None` means the waiter has been pinged already and the slot
/// will be cleared by whoever wakes up first. The tag lets a woken
/// getter check it is still the current waiter before clearing the
/// slot.
struct Waiter {
    tag: u64,
    tx: Option<oneshot::Sender<()>>,
}

impl<T: Send + Sync + 'static> Channel<T> {
    /// Constructs a new subscription channel with the given idle timeout,
    /// optional close hook, and topics (duplicates are deduplicated).
    ///
    /// Fails with [`ChannelError::NoTopics`] when no topic is given and
    /// [`ChannelError::InvalidTimeout`] when the timeout is zero. The
    /// idle timer starts immediately: the first get call must arrive
    /// within the timeout window. Must be called from within a Tokio
    /// runtime.
    pub fn new<I, S>(
        timeout: Duration,
        on_close: Option<CloseHook>,
        topics: I,
    ) -> Result<Arc<Self>, ChannelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let topics: HashSet<String> = topics.into_iter().map(Into::into).collect();
        if topics.is_empty() {
            return Err(ChannelError::NoTopics);
        }
        if timeout.is_zero() {
            // the watcher would reject this as well; fail before spawning it
            return Err(ChannelError::InvalidTimeout { value: timeout });
        }

        let ch = Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let expire: TimeoutHook = Box::new(move || {
                if let Some(ch) = weak.upgrade() {
                    ch.close();
                }
            });
            Self {
                id: Uuid::new_v4().to_string(),
                alive: AtomicBool::new(true),
                topics: RwLock::new(topics),
                state: Mutex::new(GetState {
                    queue: Vec::new(),
                    waiter: None,
                    next_tag: 0,
                }),
                watcher: Timeout::start(timeout, Some(expire)),
                on_close,
            }
        });
        log::info!("new subscription channel {} ({timeout:?})", ch.id);
        Ok(ch)
    }

    /// Publishes a value if `topic` is one of those given at
    /// construction; values published to other topics are silently
    /// ignored. No topic information is kept with the value.
    ///
    /// Fails with [`ChannelError::ChannelDown`] once the channel has
    /// been closed. Never blocks on queue space: the queue is unbounded
    /// in memory.
    pub async fn publish(&self, data: impl Into<Arc<T>>, topic: &str) -> Result<(), ChannelError> {
        if !self.is_alive() {
            return Err(ChannelError::ChannelDown);
        }
        if !self.topics.read().contains(topic) {
            return Ok(());
        }
        {
            let mut state = self.state.lock();
            // the channel may have died between the check above and the lock
            if self.is_alive() {
                state.queue.push(data.into());
                ping_waiter(&mut state);
            }
        }
        // parked getters get little chance to run under non-stop publishing
        task::yield_now().await;
        Ok(())
    }

    /// Requests the values published on any subscribed topic. Returns a
    /// single-slot handle that delivers the accumulated batch.
    ///
    /// When values are already queued the handle resolves immediately
    /// with all of them. Otherwise the call parks until the next publish
    /// or until `polltime` elapses, in which case the batch is empty. A
    /// new get call is expected right after the handle resolves, both to
    /// collect further values and to keep the channel alive.
    ///
    /// Concurrent get calls are allowed, but every value is delivered to
    /// exactly one of them and any parked call is sent back (normally
    /// empty) when a new one arrives.
    ///
    /// Fails with [`ChannelError::ChannelDown`] once closed and
    /// [`ChannelError::InvalidPolltime`] when `polltime` is zero.
    pub fn get(
        self: &Arc<Self>,
        polltime: Duration,
    ) -> Result<oneshot::Receiver<Vec<Arc<T>>>, ChannelError> {
        if !self.is_alive() {
            return Err(ChannelError::ChannelDown);
        }
        if polltime.is_zero() {
            return Err(ChannelError::InvalidPolltime { value: polltime });
        }
        let (resp_tx, resp_rx) = oneshot::channel();
        let ch = Arc::clone(self);
        tokio::spawn(async move { ch.serve_get(polltime, resp_tx).await });
        Ok(resp_rx)
    }

    async fn serve_get(self: Arc<Self>, polltime: Duration, resp: oneshot::Sender<Vec<Arc<T>>>) {
        self.watcher.ping();

        let (signal, tag) = {
            let mut state = self.state.lock();
            // the channel may have died between the get() check and the lock
            if !self.is_alive() {
                let _ = resp.send(Vec::new());
                return;
            }
            log::debug!("incoming get request on {}", self.id);

            // send any parked getter back early; it will find the queue empty
            ping_waiter(&mut state);

            if !state.queue.is_empty() {
                let batch = mem::take(&mut state.queue);
                log::debug!("get served {} queued values on {}", batch.len(), self.id);
                // the pre-empted getter must not pick these values up
                state.waiter = None;
                let _ = resp.send(batch);
                return;
            }

            let tag = state.next_tag;
            state.next_tag += 1;
            let (tx, rx) = oneshot::channel();
            state.waiter = Some(Waiter { tag, tx: Some(tx) });
            (rx, tag)
        };

        tokio::select! {
            _ = signal => {
                let mut state = self.state.lock();
                // may be empty when the wake-up came from close
                let batch = mem::take(&mut state.queue);
                log::debug!("get woke with {} values on {}", batch.len(), self.id);
                clear_waiter(&mut state, tag);
                let _ = resp.send(batch);
            }
            _ = time::sleep(polltime) => {
                let mut state = self.state.lock();
                log::debug!("get ended empty after {polltime:?} on {}", self.id);
                clear_waiter(&mut state, tag);
                let _ = resp.send(Vec::new());
            }
        }
    }

    /// Terminates the channel: no further publishing or receiving, the
    /// parked get call (if any) is sent back empty, the idle timer is
    /// stopped and the close hook runs with the channel id. Idempotent;
    /// only the first call acts.
    pub fn close(&self) {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        log::warn!("dropping subscription channel {}", self.id);

        self.watcher.close();
        // no publishing possible from here on
        self.topics.write().clear();
        {
            let mut state = self.state.lock();
            // nothing is delivered from a dead channel
            state.queue.clear();
            ping_waiter(&mut state);
            state.waiter = None;
        }
        if let Some(hook) = &self.on_close {
            hook(&self.id);
        }
    }

    /// Returns the subscription id assigned at construction.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the current topic set: the deduplicated construction set
    /// while alive, empty after close.
    pub fn topics(&self) -> Vec<String> {
        self.topics.read().iter().cloned().collect()
    }

    /// Snapshot of the number of queued, uncollected values.
    pub fn queue_size(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Reports whether a get call is currently parked. The answer may be
    /// stale by the time it is observed during continuous publishing.
    pub fn is_get_waiting(&self) -> bool {
        self.state.lock().waiter.is_some()
    }

    /// Reports whether the channel is up and running.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Signals the parked waiter, if one exists and has not been pinged yet.
fn ping_waiter<T>(state: &mut GetState<T>) {
    if let Some(waiter) = state.waiter.as_mut() {
        if let Some(tx) = waiter.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Clears the waiter slot only if it still holds the descriptor `tag`
/// belongs to; a newer getter may have installed its own since.
fn clear_waiter<T>(state: &mut GetState<T>, tag: u64) {
    if state.waiter.as_ref().map(|w| w.tag) == Some(tag) {
        state.waiter = None;
    }
}
