//! Fixed one-second window throttle.
//!
//! The limiter counts bytes recorded since the start of the current window.
//! Before each read the caller invokes [`RateLimiter::throttle`]:
//!
//! - more than one second since the window opened: the window restarts and
//!   the counter is cleared;
//! - otherwise, once the counter has reached the limit: the caller sleeps for
//!   the rest of the second and a fresh window begins.
//!
//! The scheme is coarse. A whole chunk may be read after the counter is just
//! below the limit, so a window can overshoot by one chunk, and consecutive
//! windows can burst up to `limit` bytes each side of a boundary.

use std::time::{Duration, Instant};

#[cfg(any(test, feature = "test-support"))]
mod test_support;

#[cfg(any(test, feature = "test-support"))]
pub use self::test_support::{RecordedSleepSession, recorded_sleep_session};

#[cfg(any(test, feature = "test-support"))]
use self::test_support::append_recorded_sleep;

const WINDOW: Duration = Duration::from_secs(1);

/// Result returned by [`RateLimiter::throttle`] describing how long the limiter slept.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[must_use]
pub struct LimiterSleep {
    requested: Duration,
    actual: Duration,
}

impl LimiterSleep {
    /// Constructs a new [`LimiterSleep`] record from the requested and actual durations.
    pub const fn new(requested: Duration, actual: Duration) -> Self {
        Self { requested, actual }
    }

    /// Returns the amount of time the limiter asked to sleep.
    #[must_use]
    pub const fn requested(&self) -> Duration {
        self.requested
    }

    /// Returns the time actually observed around the sleep.
    #[must_use]
    pub const fn actual(&self) -> Duration {
        self.actual
    }

    /// Returns `true` when the limiter did not sleep.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.requested.is_zero() && self.actual.is_zero()
    }
}

/// Bytes-per-second cap enforced over fixed one-second windows.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    limit: u64,
    window_start: Instant,
    window_bytes: u64,
}

impl RateLimiter {
    /// Creates a limiter allowing `limit` bytes per second; `0` disables it.
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self::starting_at(limit, Instant::now())
    }

    /// Creates a limiter whose first window opens at `start`.
    #[must_use]
    pub const fn starting_at(limit: u64, start: Instant) -> Self {
        Self {
            limit,
            window_start: start,
            window_bytes: 0,
        }
    }

    /// Creates a limiter that never sleeps.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(0)
    }

    /// Returns `true` when a non-zero limit is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.limit != 0
    }

    /// Configured limit in bytes per second (`0` when disabled).
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Bytes recorded in the current window.
    #[must_use]
    pub const fn window_bytes(&self) -> u64 {
        self.window_bytes
    }

    /// Adds `bytes` to the current window.
    pub fn record(&mut self, bytes: u64) {
        if self.is_enabled() {
            self.window_bytes = self.window_bytes.saturating_add(bytes);
        }
    }

    /// Applies the window rules at the current time, sleeping if required.
    pub fn throttle(&mut self) -> LimiterSleep {
        self.throttle_at(Instant::now())
    }

    /// Applies the window rules as if the current time were `now`.
    pub fn throttle_at(&mut self, now: Instant) -> LimiterSleep {
        if !self.is_enabled() {
            return LimiterSleep::default();
        }

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed > WINDOW {
            self.window_start = now;
            self.window_bytes = 0;
            return LimiterSleep::default();
        }

        if self.window_bytes < self.limit {
            return LimiterSleep::default();
        }

        let requested = WINDOW.saturating_sub(elapsed);
        tracing::trace!(
            window_bytes = self.window_bytes,
            limit = self.limit,
            sleep_us = requested.as_micros() as u64,
            "rate limit reached"
        );
        let started = Instant::now();
        sleep_for(requested);
        let actual = started.elapsed();

        self.window_start = now + requested;
        self.window_bytes = 0;
        LimiterSleep::new(requested, actual)
    }
}

fn sleep_for(duration: Duration) {
    if duration.is_zero() {
        return;
    }

    #[cfg(any(test, feature = "test-support"))]
    append_recorded_sleep(duration);

    #[cfg(not(test))]
    std::thread::sleep(duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_limiter_never_sleeps() {
        let mut session = recorded_sleep_session();
        session.clear();

        let start = Instant::now();
        let mut limiter = RateLimiter::starting_at(0, start);
        limiter.record(u64::MAX);
        assert!(limiter.throttle_at(start).is_noop());
        assert_eq!(limiter.window_bytes(), 0);
        assert!(session.is_empty());
    }

    #[test]
    fn below_limit_passes_through() {
        let mut session = recorded_sleep_session();
        session.clear();

        let start = Instant::now();
        let mut limiter = RateLimiter::starting_at(1000, start);
        limiter.record(999);
        assert!(limiter.throttle_at(start + Duration::from_millis(10)).is_noop());
        assert_eq!(limiter.window_bytes(), 999);
        assert!(session.is_empty());
    }

    #[test]
    fn reaching_limit_sleeps_rest_of_window() {
        let mut session = recorded_sleep_session();
        session.clear();

        let start = Instant::now();
        let mut limiter = RateLimiter::starting_at(1000, start);
        limiter.record(1000);
        let slept = limiter.throttle_at(start + Duration::from_millis(300));

        assert_eq!(slept.requested(), Duration::from_millis(700));
        assert_eq!(limiter.window_bytes(), 0);
        assert_eq!(session.take(), [Duration::from_millis(700)]);
    }

    #[test]
    fn stale_window_resets_without_sleeping() {
        let mut session = recorded_sleep_session();
        session.clear();

        let start = Instant::now();
        let mut limiter = RateLimiter::starting_at(1000, start);
        limiter.record(5000);
        assert!(limiter.throttle_at(start + Duration::from_millis(1500)).is_noop());
        assert_eq!(limiter.window_bytes(), 0);
        assert!(session.is_empty());
    }

    #[test]
    fn overshoot_is_tolerated_within_window() {
        let mut session = recorded_sleep_session();
        session.clear();

        let start = Instant::now();
        let mut limiter = RateLimiter::starting_at(1000, start);
        limiter.record(900);
        assert!(limiter.throttle_at(start).is_noop());
        // One more chunk pushes the window past the limit before the next check.
        limiter.record(4096);
        let slept = limiter.throttle_at(start + Duration::from_millis(100));
        assert_eq!(slept.requested(), Duration::from_millis(900));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn window_after_sleep_starts_at_boundary() {
        let mut session = recorded_sleep_session();
        session.clear();

        let start = Instant::now();
        let mut limiter = RateLimiter::starting_at(10, start);
        limiter.record(10);
        let _ = limiter.throttle_at(start + Duration::from_millis(400));
        limiter.record(10);
        // 0.5s into the new window that opened at +1s.
        let slept = limiter.throttle_at(start + Duration::from_millis(1500));
        assert_eq!(slept.requested(), Duration::from_millis(500));
        assert_eq!(session.total_duration(), Duration::from_millis(1100));
    }

    #[test]
    fn limiter_sleep_noop_default() {
        assert!(LimiterSleep::default().is_noop());
        assert!(!LimiterSleep::new(Duration::from_millis(1), Duration::ZERO).is_noop());
    }
}
