//! A time interface that can be replaced by a fake time implementation
//! during testing.
//!
//! All expiry decisions of the cache are made against a [`Clock`]. Time is
//! expressed as the [`Duration`] passed since some arbitrary but fixed
//! starting point of the clock.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

//------------ Clock ---------------------------------------------------------

/// A source of monotonic time.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Returns the time passed since the clock’s starting point.
    fn now(&self) -> Duration;
}

//------------ SystemClock ---------------------------------------------------

/// Implementation of the [`Clock`] trait using [`Instant`] from std::time.
///
/// The starting point is the moment the clock was created. Clones share
/// the starting point.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Creates a new clock starting now.
    #[must_use]
    pub fn new() -> Self {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

//------------ FakeClock -----------------------------------------------------

/// Implementation of the [`Clock`] trait to fake the passing of time, for
/// example for testing.
///
/// Time only advances through [`adjust_time`][Self::adjust_time]. Clones
/// share the same time.
#[derive(Clone, Debug, Default)]
pub struct FakeClock {
    /// The current fake time.
    now: Arc<Mutex<Duration>>,
}

impl FakeClock {
    /// Creates a new clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjust the current time by adding a [`Duration`].
    pub fn adjust_time(&self, adjust: Duration) {
        tracing::trace!("adjust_time: adjust {:?}", adjust);
        let mut now = self.now.lock();
        *now = now.saturating_add(adjust);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fake_clock() {
        let clock = FakeClock::new();
        let other = clock.clone();
        assert_eq!(clock.now(), Duration::ZERO);
        other.adjust_time(Duration::from_secs(301));
        assert_eq!(clock.now(), Duration::from_secs(301));
    }

    #[test]
    fn system_clock() {
        let clock = SystemClock::new();
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
