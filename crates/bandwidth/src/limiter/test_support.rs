use std::mem;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Duration;

fn recorded_sleeps() -> &'static Mutex<Vec<Duration>> {
    static RECORDED_SLEEPS: OnceLock<Mutex<Vec<Duration>>> = OnceLock::new();
    RECORDED_SLEEPS.get_or_init(|| Mutex::new(Vec::new()))
}

fn recorded_sleep_session_lock() -> &'static Mutex<()> {
    static SESSION_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    SESSION_LOCK.get_or_init(|| Mutex::new(()))
}

pub(super) fn append_recorded_sleep(duration: Duration) {
    lock_recorded_sleeps().push(duration);
}

fn lock_recorded_sleeps() -> MutexGuard<'static, Vec<Duration>> {
    recorded_sleeps()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

/// Guard that provides exclusive access to the recorded sleep durations.
///
/// Tests obtain a session, [`clear`](Self::clear) it, run the code under
/// test, then inspect what the limiter asked to sleep. Holding the guard keeps
/// concurrently running tests from appending to or draining the shared log.
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub struct RecordedSleepSession<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl RecordedSleepSession<'_> {
    /// Removes any previously recorded durations.
    pub fn clear(&mut self) {
        lock_recorded_sleeps().clear();
    }

    /// Returns `true` when no sleep durations have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock_recorded_sleeps().is_empty()
    }

    /// Returns the number of recorded sleeps.
    #[must_use]
    pub fn len(&self) -> usize {
        lock_recorded_sleeps().len()
    }

    /// Returns a copy of the recorded durations without clearing them.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Duration> {
        lock_recorded_sleeps().clone()
    }

    /// Sum of every recorded sleep.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        lock_recorded_sleeps()
            .iter()
            .fold(Duration::ZERO, |acc, d| acc.saturating_add(*d))
    }

    /// Drains the recorded durations.
    pub fn take(&mut self) -> Vec<Duration> {
        mem::take(&mut *lock_recorded_sleeps())
    }
}

/// Opens an exclusive session over the recorded sleep log.
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
#[must_use]
pub fn recorded_sleep_session() -> RecordedSleepSession<'static> {
    RecordedSleepSession {
        _guard: recorded_sleep_session_lock()
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()),
    }
}
