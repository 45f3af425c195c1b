//! Per-room timers for Bullpen.
//!
//! A room needs two clocks, both owned by its actor and polled from the
//! actor's `tokio::select!` loop:
//!
//! - [`Countdown`] counts the seconds players have left to move. It is
//!   advisory: the room pushes the remaining value and, at zero, applies
//!   whatever expiry policy it was configured with.
//! - [`Pacer`] is a one-shot delay between resolved plays so observers can
//!   follow the board.
//!
//! Both pend forever while disarmed, so an idle branch never wins a
//! `select!`. Both are cancel-safe: dropping the future before it
//! resolves leaves the timer exactly as it was.
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = rx.recv() => { /* handle commands */ }
//!         tick = countdown.wait_for_tick() => { /* push tick.remaining */ }
//!         () = pacer.wait() => { /* resolve the next play */ }
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// Configuration for a [`Countdown`].
#[derive(Debug, Clone)]
pub struct CountdownConfig {
    /// Value the countdown restarts from.
    pub seconds: u32,
    /// Real time between two decrements. One second in production; tests
    /// shrink it.
    pub period: Duration,
    /// Random jitter (0–max µs) added to the first tick after each restart
    /// so rooms that restart together don't fire in lockstep.
    pub initial_jitter_us: u64,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            seconds: 30,
            period: Duration::from_secs(1),
            initial_jitter_us: 2_000,
        }
    }
}

impl CountdownConfig {
    /// Shortest accepted period. Anything smaller is clamped.
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    pub fn with_seconds(seconds: u32) -> Self {
        Self {
            seconds,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values. Called by [`Countdown::new`].
    pub fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(period = ?self.period, "countdown period too small, clamping");
            self.period = Self::MIN_PERIOD;
        }
        self
    }
}

/// One decrement of a running [`Countdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    /// Seconds left after this decrement.
    pub remaining: u32,
    /// `true` exactly once, on the tick that reaches zero. The countdown
    /// stops itself after it.
    pub expired: bool,
}

/// A restartable, cancellable countdown.
pub struct Countdown {
    config: CountdownConfig,
    remaining: u32,
    next_tick: Option<Instant>,
    restarts: u64,
}

impl Countdown {
    /// A stopped countdown. Call [`restart`](Self::restart) to run it.
    pub fn new(config: CountdownConfig) -> Self {
        let config = config.validated();
        Self {
            remaining: config.seconds,
            config,
            next_tick: None,
            restarts: 0,
        }
    }

    /// Resets to the configured value and starts ticking.
    ///
    /// A countdown configured with zero seconds never runs.
    pub fn restart(&mut self) {
        self.remaining = self.config.seconds;
        if self.config.seconds == 0 {
            self.next_tick = None;
            return;
        }
        let jitter = if self.config.initial_jitter_us > 0 {
            Duration::from_micros(rand::rng().random_range(0..self.config.initial_jitter_us))
        } else {
            Duration::ZERO
        };
        self.next_tick = Some(Instant::now() + self.config.period + jitter);
        self.restarts += 1;
        debug!(seconds = self.remaining, restarts = self.restarts, "countdown restarted");
    }

    /// Stops the countdown. Idempotent.
    pub fn cancel(&mut self) {
        if self.next_tick.take().is_some() {
            debug!(remaining = self.remaining, "countdown cancelled");
        }
    }

    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Seconds left. Meaningful while running or right after expiry.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// How many times the countdown has been (re)started.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Waits for the next decrement. Pends forever while stopped.
    pub async fn wait_for_tick(&mut self) -> CountdownTick {
        let Some(next) = self.next_tick else {
            return std::future::pending().await;
        };

        time::sleep_until(next).await;

        // Skip rather than burst if the actor fell behind.
        let now = Instant::now();
        let late_by = now.saturating_duration_since(next);
        if late_by > self.config.period {
            warn!(late_ms = late_by.as_millis() as u64, "countdown tick late");
        }

        self.remaining = self.remaining.saturating_sub(1);
        let expired = self.remaining == 0;
        self.next_tick = if expired {
            None
        } else {
            Some(now + self.config.period)
        };
        trace!(remaining = self.remaining, expired, "countdown tick");

        CountdownTick {
            remaining: self.remaining,
            expired,
        }
    }
}

// ---------------------------------------------------------------------------
// Pacer
// ---------------------------------------------------------------------------

/// A one-shot delay that can be armed, re-armed, and cancelled.
pub struct Pacer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules the next firing `delay` from now, replacing any pending one.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    /// Drops the pending firing, if any.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves once when the armed delay elapses, then disarms.
    /// Pends forever while disarmed.
    pub async fn wait(&mut self) {
        let Some(deadline) = self.deadline else {
            return std::future::pending().await;
        };
        time::sleep_until(deadline).await;
        self.deadline = None;
    }
}
