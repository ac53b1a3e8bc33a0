//! # Pingable idle timer with an expiry hook and exit report.
//!
//! [`Timeout`] tracks the time since it was last pinged and fires an
//! optional hook once that gap reaches the configured duration. Every
//! [`Timeout::ping`] pushes the deadline out by a full duration. Closing
//! the timer early suppresses the hook but still reports the exit.
//!
//! This is the lifetime monitor behind every subscription channel: a
//! channel that nobody polls within its idle timeout is expired by this
//! timer, which calls the channel's own close as its hook.
//!
//! ```text
//!   ping()  ──► last_ping = now
//!                    │
//!              supervisory task (tick = duration / 100)
//!                    │
//!       elapsed ≥ duration ──► on_timeout() ──► report(true)
//!       close()             ──►    (skipped) ──► report(true)
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::ChannelError;

/// Callback invoked once when the timer expires naturally.
pub type TimeoutHook = Box<dyn FnOnce() + Send + 'static>;

/// Floor for the supervisory wake-up granularity.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Extendable idle timer.
///
/// The supervisory task wakes roughly a hundred times per configured
/// duration, so expiry detection and close propagation both land within
/// about 1% of the duration.
pub struct Timeout {
    started: Instant,
    /// Nanoseconds between `started` and the most recent ping.
    last_ping: Arc<AtomicU64>,
    alive: Arc<AtomicBool>,
    cancel: CancellationToken,
    report: watch::Receiver<bool>,
}

impl Timeout {
    /// Creates and starts a new idle timer with an optional expiry hook.
    ///
    /// Fails with [`ChannelError::InvalidTimeout`] when `after` is zero.
    /// Must be called from within a Tokio runtime.
    pub fn new(after: Duration, on_timeout: Option<TimeoutHook>) -> Result<Self, ChannelError> {
        if after.is_zero() {
            return Err(ChannelError::InvalidTimeout { value: after });
        }
        Ok(Self::start(after, on_timeout))
    }

    /// Starts the timer without validating `after`; callers have already
    /// rejected the zero duration.
    pub(crate) fn start(after: Duration, on_timeout: Option<TimeoutHook>) -> Self {
        let started = Instant::now();
        let last_ping = Arc::new(AtomicU64::new(0));
        let alive = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();
        let (report_tx, report_rx) = watch::channel(false);

        let tor = Self {
            started,
            last_ping: Arc::clone(&last_ping),
            alive: Arc::clone(&alive),
            cancel: cancel.clone(),
            report: report_rx,
        };

        let tick = (after / 100).max(MIN_TICK);
        tokio::spawn(async move {
            let mut hook = on_timeout;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = time::sleep(tick) => {}
                }
                let pinged = Duration::from_nanos(last_ping.load(Ordering::Relaxed));
                if started.elapsed().saturating_sub(pinged) >= after {
                    // only the first close/expiry path runs the hook
                    if alive.swap(false, Ordering::SeqCst) {
                        log::warn!("idle timeout hit after {after:?}");
                        if let Some(hook) = hook.take() {
                            hook();
                        }
                    }
                    break;
                }
            }
            let _ = report_tx.send(true);
        });

        tor
    }

    /// Pings the timer, extending it for another full duration.
    ///
    /// No-op once the timer is no longer alive.
    pub fn ping(&self) {
        if self.is_alive() {
            self.last_ping
                .store(self.started.elapsed().as_nanos() as u64, Ordering::Relaxed);
        }
    }

    /// Stops the timer without running the expiry hook. Idempotent.
    ///
    /// The exit is still reported on the report channel.
    pub fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.cancel.cancel();
    }

    /// Returns a receiver that flips to `true` exactly once when the
    /// supervisory task exits, whether by expiry or by [`Timeout::close`].
    pub fn report_channel(&self) -> watch::Receiver<bool> {
        self.report.clone()
    }

    /// Reports whether the timer is still running.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
