//! Periodic ticks for the session driver.
//!
//! Two timers run for the lifetime of a chat session: a heartbeat that
//! keeps an open connection alive and a reconnect poll that replaces a
//! closed one. Each is a [`PeriodicTask`] that pushes a [`Tick`] into the
//! driver's tick channel; the driver is the only place ticks are acted on.
//!
//! Ticks are delivered with `try_send`. If the driver is busy and the
//! channel is full the tick is dropped, so a stalled driver never sees a
//! burst of stale ticks when it catches up.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Default period between heartbeat pings.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Default period between reconnect checks.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(3);

/// Shortest period a timer will run at; smaller periods are raised to it.
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(100);

/// Capacity of the tick channel. Small on purpose: ticks are not queued.
pub const TICK_CHANNEL_CAPACITY: usize = 4;

/// Which timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tick {
    /// Time to ping the server.
    Heartbeat,
    /// Time to check whether the connection needs replacing.
    ReconnectPoll,
}

/// A background task emitting `tick` every `period`.
///
/// The first tick fires one full period after spawning. Dropping or
/// cancelling the task stops it; nothing fires afterwards.
#[derive(Debug)]
pub struct PeriodicTask {
    tick: Tick,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn a timer on the current runtime.
    ///
    /// Periods shorter than [`MIN_TICK_PERIOD`] (including zero) are raised
    /// to it.
    pub fn spawn(period: Duration, tick: Tick, tx: mpsc::Sender<Tick>) -> Self {
        if period < MIN_TICK_PERIOD {
            tracing::warn!(?tick, ?period, "timer period too short, using minimum");
        }
        let period = period.max(MIN_TICK_PERIOD);
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                match tx.try_send(tick) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::trace!(?tick, "tick channel full, dropping tick");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
        });
        Self {
            tick,
            handle: Some(handle),
        }
    }

    /// Which tick this task emits.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Whether the task has been cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.handle.is_none()
    }

    /// Stop the timer. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!(tick = ?self.tick, "timer cancelled");
            handle.abort();
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
