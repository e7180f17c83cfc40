//! Monotonic timing
//!
//! Interval measurements use `CLOCK_MONOTONIC_RAW` where the platform has
//! it: unlike `CLOCK_MONOTONIC` it is not slewed by NTP or `adjtime()`.

use std::cell::Cell;

use crate::{BlkBenchError, Result};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Opaque point on a monotonic time line, in nanoseconds from an
/// unspecified origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub fn as_nanos(&self) -> u64 {
        self.0
    }
}

/// Nanoseconds between two timestamps. `later` must not precede `earlier`;
/// if it does the result saturates at zero.
pub fn elapsed_ns(earlier: Timestamp, later: Timestamp) -> u64 {
    later.0.saturating_sub(earlier.0)
}

/// Source of timestamps for the benchmarks
pub trait Clock {
    /// Current timestamp
    fn now(&self) -> Result<Timestamp>;

    /// Tick granularity reported by the underlying clock
    fn resolution_ns(&self) -> Result<u64>;

    /// The +/- error bound of a single timed interval: half of the larger of
    /// the clock resolution and the cost of taking two back-to-back samples.
    fn measurement_tolerance_ns(&self) -> Result<u64> {
        let resolution = self.resolution_ns()?;
        let t0 = self.now()?;
        let t1 = self.now()?;
        let overhead = elapsed_ns(t0, t1);

        Ok(resolution.max(overhead) / 2)
    }
}

/// The system's raw monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
mod unix_impl {
    use super::*;

    #[cfg(any(target_os = "linux", target_os = "android"))]
    const CLOCK_ID: libc::clockid_t = libc::CLOCK_MONOTONIC_RAW;

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    const CLOCK_ID: libc::clockid_t = libc::CLOCK_MONOTONIC;

    fn timespec_to_ns(ts: &libc::timespec) -> u64 {
        (ts.tv_sec as u64)
            .saturating_mul(NANOS_PER_SEC)
            .saturating_add(ts.tv_nsec as u64)
    }

    impl Clock for MonotonicClock {
        fn now(&self) -> Result<Timestamp> {
            let mut ts = libc::timespec {
                tv_sec: 0,
                tv_nsec: 0,
            };
            // SAFETY: `ts` is a valid, writable timespec.
            let retval = unsafe { libc::clock_gettime(CLOCK_ID, &mut ts) };
            if retval == -1 {
                return Err(BlkBenchError::ClockError(std::io::Error::last_os_error()));
            }
            Ok(Timestamp(timespec_to_ns(&ts)))
        }

        fn resolution_ns(&self) -> Result<u64> {
            let mut ts = libc::timespec {
                tv_sec: 0,
                tv_nsec: 0,
            };
            // SAFETY: `ts` is a valid, writable timespec.
            let retval = unsafe { libc::clock_getres(CLOCK_ID, &mut ts) };
            if retval == -1 {
                return Err(BlkBenchError::ClockError(std::io::Error::last_os_error()));
            }
            Ok(timespec_to_ns(&ts))
        }
    }
}

#[cfg(not(unix))]
mod portable_impl {
    use super::*;
    use std::sync::OnceLock;
    use std::time::Instant;

    fn origin() -> Instant {
        static ORIGIN: OnceLock<Instant> = OnceLock::new();
        *ORIGIN.get_or_init(Instant::now)
    }

    impl Clock for MonotonicClock {
        fn now(&self) -> Result<Timestamp> {
            Ok(Timestamp(origin().elapsed().as_nanos() as u64))
        }

        fn resolution_ns(&self) -> Result<u64> {
            Ok(1)
        }
    }
}

/// Deterministic clock that advances by a fixed step every time it is read
#[derive(Debug)]
pub struct SteppingClock {
    current: Cell<u64>,
    step_ns: u64,
    resolution_ns: u64,
}

impl SteppingClock {
    pub fn new(step_ns: u64) -> Self {
        Self {
            current: Cell::new(0),
            step_ns,
            resolution_ns: 1,
        }
    }

    pub fn with_resolution(mut self, resolution_ns: u64) -> Self {
        self.resolution_ns = resolution_ns;
        self
    }

    /// Move time forward without taking a sample
    pub fn advance(&self, nanos: u64) {
        self.current.set(self.current.get() + nanos);
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Result<Timestamp> {
        let now = self.current.get();
        self.current.set(now + self.step_ns);
        Ok(Timestamp(now))
    }

    fn resolution_ns(&self) -> Result<u64> {
        Ok(self.resolution_ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_runs_backwards() {
        let clock = MonotonicClock::new();
        let mut previous = clock.now().unwrap();
        for _ in 0..1000 {
            let next = clock.now().unwrap();
            assert!(next >= previous);
            previous = next;
        }
    }

    #[test]
    fn test_monotonic_clock_resolution_is_sane() {
        let resolution = MonotonicClock::new().resolution_ns().unwrap();
        assert!(resolution > 0);
        assert!(resolution < NANOS_PER_SEC);
    }

    #[test]
    fn test_elapsed_ns() {
        let t0 = Timestamp::from_nanos(1_000);
        let t1 = Timestamp::from_nanos(4_500);
        assert_eq!(elapsed_ns(t0, t1), 3_500);
        assert_eq!(elapsed_ns(t1, t1), 0);
        assert_eq!(elapsed_ns(t1, t0), 0);
    }

    #[test]
    fn test_tolerance_uses_resolution_when_larger() {
        let clock = SteppingClock::new(10).with_resolution(1_000);
        assert_eq!(clock.measurement_tolerance_ns().unwrap(), 500);
    }

    #[test]
    fn test_tolerance_uses_overhead_when_larger() {
        let clock = SteppingClock::new(3_000).with_resolution(1);
        assert_eq!(clock.measurement_tolerance_ns().unwrap(), 1_500);
    }

    #[test]
    fn test_stepping_clock_advance() {
        let clock = SteppingClock::new(5);
        assert_eq!(clock.now().unwrap().as_nanos(), 0);
        clock.advance(100);
        assert_eq!(clock.now().unwrap().as_nanos(), 105);
    }
}
