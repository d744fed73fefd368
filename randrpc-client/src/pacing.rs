//! Client-side pacing state
//!
//! The service attaches an `advisoryDelay` (milliseconds) to every successful
//! reply: the minimum time the client should wait before its next request.
//! [`PacingState`] remembers when the last exchange finished and which delay
//! was advised, and tells the dispatcher how long to wait before the next one.
//!
//! # Pacing Decision
//!
//! ```text
//! wait = advisory_delay - (now - last_exchange)
//!
//! wait == 0                  -> send immediately
//! 0 < wait <= max_blocking   -> sleep for `wait`, then send
//! wait > max_blocking        -> fail with PacingExceeded, nothing is sent
//! ```
//!
//! Each exchange replaces the advisory delay outright; delays never
//! accumulate. Error replies carry no delay, which resets it to zero.
//!
//! Time is read from `tokio::time::Instant`, so tests can drive the state
//! with a paused clock.

use randrpc_core::{Error, Result};
use std::time::Duration;
use tokio::time::Instant;

/// Default upper bound on how long a request may be held back
pub const DEFAULT_MAX_BLOCKING: Duration = Duration::from_millis(3000);

/// Timestamp of the last exchange plus the advised delay
#[derive(Debug, Clone)]
pub struct PacingState {
    last_exchange: Instant,
    advisory_delay: Duration,
    max_blocking: Duration,
}

impl PacingState {
    /// Create a state that treats "now" as the last exchange, with no delay
    pub fn new(max_blocking: Duration) -> Self {
        Self {
            last_exchange: Instant::now(),
            advisory_delay: Duration::ZERO,
            max_blocking,
        }
    }

    /// Remaining advised wait; zero once the delay has elapsed
    pub fn time_until_next_allowed(&self) -> Duration {
        self.advisory_delay
            .saturating_sub(self.last_exchange.elapsed())
    }

    /// Decide whether the next exchange may proceed
    ///
    /// Returns the duration to suspend for (possibly zero), or
    /// `PacingExceeded` when the wait is longer than the blocking tolerance.
    pub fn gate(&self) -> Result<Duration> {
        let wait = self.time_until_next_allowed();
        if wait > self.max_blocking {
            return Err(Error::PacingExceeded {
                wait,
                max: self.max_blocking,
            });
        }
        Ok(wait)
    }

    /// Replace the advised delay and stamp the exchange as finished now
    pub fn record_exchange(&mut self, advisory_delay: Duration) {
        self.advisory_delay = advisory_delay;
        self.last_exchange = Instant::now();
    }

    /// Stamp an exchange that produced no decodable reply
    ///
    /// The previous advisory delay stays in force.
    pub fn touch(&mut self) {
        self.last_exchange = Instant::now();
    }

    pub fn advisory_delay(&self) -> Duration {
        self.advisory_delay
    }

    pub fn max_blocking(&self) -> Duration {
        self.max_blocking
    }
}

/// Whole milliseconds of `duration`, saturating at `u64::MAX`
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for PacingState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BLOCKING)
    }
}
