//! Time sources for PoET consensus
//!
//! All timestamps are wall-clock seconds as `f64`, matching the values the
//! enclave stamps into its timers.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::warn;

/// Clock capability injected into timers and enclaves
pub trait TimeSource: Send + Sync {
    /// Current time in seconds
    fn now(&self) -> f64;
}

/// Wall clock (seconds since the Unix epoch)
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> f64 {
        seconds_since_epoch(SystemTime::now())
    }
}

/// Seconds between the Unix epoch and `time`, negative before the epoch
fn seconds_since_epoch(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_secs_f64(),
        Err(err) => {
            let behind = err.duration().as_secs_f64();
            warn!(behind, "system clock is before the Unix epoch");
            -behind
        }
    }
}

/// Manually driven clock for simulation and tests
/// INVARIANT: never moves backwards
#[derive(Debug, Default)]
pub struct ManualClock {
    value: Mutex<f64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        ManualClock {
            value: Mutex::new(start),
        }
    }

    /// Advance by `secs` (negative values are ignored)
    pub fn advance(&self, secs: f64) -> f64 {
        let mut value = self.value.lock();
        if secs > 0.0 {
            *value += secs;
        }
        *value
    }

    /// Jump forward to `target`; only moves forward
    pub fn set(&self, target: f64) -> f64 {
        let mut value = self.value.lock();
        if target > *value {
            *value = target;
        }
        *value
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> f64 {
        *self.value.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_system_clock_advancing() {
        let clock = SystemClock;
        let t1 = clock.now();
        let t2 = clock.now();
        assert!(t1 > 0.0);
        assert!(t2 >= t1);
    }

    #[test]
    fn test_pre_epoch_time_is_negative() {
        let before = UNIX_EPOCH - Duration::from_millis(2500);
        assert_eq!(seconds_since_epoch(before), -2.5);
        assert_eq!(seconds_since_epoch(UNIX_EPOCH + Duration::from_secs(7)), 7.0);
    }

    #[test]
    fn test_manual_clock_monotonic() {
        let clock = ManualClock::new(100.0);
        assert_eq!(clock.advance(5.0), 105.0);
        assert_eq!(clock.advance(-3.0), 105.0);
        assert_eq!(clock.set(90.0), 105.0);
        assert_eq!(clock.set(200.0), 200.0);
        assert_eq!(clock.now(), 200.0);
    }
}
