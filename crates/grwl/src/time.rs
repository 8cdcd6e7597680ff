//! The library timer.
//!
//! Time is measured in seconds since initialization, or since the last
//! [`Library::set_time`], on a monotonic clock. [`Timer`] handles may be
//! cloned and read from any thread.

use std::{sync::Arc, time::Instant};

use parking_lot::Mutex;

use crate::{
    error::{raise, ErrorCode, Result},
    Library,
};

const NANOS_PER_SEC: f64 = 1e9;

/// Upper bound (exclusive) for [`Library::set_time`], in seconds. Chosen so
/// that the time in nanoseconds always fits in a `u64`.
pub const MAX_TIME: f64 = 18_446_744_073.0;

#[derive(Clone, Debug)]
pub struct Timer {
    start: Instant,
    /// Added to the elapsed time, in nanoseconds.
    offset: Arc<Mutex<i128>>,
}

impl Default for Timer {
    fn default() -> Self {
        Self {
            start: Instant::now(),
            offset: Arc::new(Mutex::new(0)),
        }
    }
}

impl Timer {
    /// Raw timer ticks. See [`Timer::frequency`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn value(&self) -> u64 {
        let elapsed = self.start.elapsed().as_nanos() as i128;
        (elapsed + *self.offset.lock()).max(0) as u64
    }

    /// Ticks per second.
    #[must_use]
    pub fn frequency(&self) -> u64 {
        1_000_000_000
    }

    /// Seconds since the timer was started or last set.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn time(&self) -> f64 {
        self.value() as f64 / NANOS_PER_SEC
    }

    #[allow(clippy::cast_possible_truncation)]
    fn set(&self, seconds: f64) {
        let target = (seconds * NANOS_PER_SEC) as i128;
        let elapsed = self.start.elapsed().as_nanos() as i128;
        *self.offset.lock() = target - elapsed;
    }
}

impl Library {
    /// Seconds since initialization or the last [`Library::set_time`].
    pub fn time(&self) -> Result<f64> {
        self.require_init()?;
        Ok(self.timer.time())
    }

    /// Sets the current time. Must be finite and in `0.0..MAX_TIME`.
    pub fn set_time(&mut self, seconds: f64) -> Result<()> {
        self.require_init()?;

        if !seconds.is_finite() || !(0.0..MAX_TIME).contains(&seconds) {
            return Err(raise(
                ErrorCode::InvalidValue,
                format!("invalid time {seconds}"),
            ));
        }

        self.timer.set(seconds);
        Ok(())
    }

    pub fn timer_value(&self) -> Result<u64> {
        self.require_init()?;
        Ok(self.timer.value())
    }

    pub fn timer_frequency(&self) -> Result<u64> {
        self.require_init()?;
        Ok(self.timer.frequency())
    }

    /// A handle to the timer for use from other threads.
    pub fn timer(&self) -> Result<Timer> {
        self.require_init()?;
        Ok(self.timer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::platform::null::NullPlatform;

    #[test]
    fn set_time_validates_and_offsets() {
        let (platform, _) = NullPlatform::new();
        let mut lib = Library::new(platform);

        let err = lib.time().unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotInitialized);

        lib.init().unwrap();

        for bad in [-1.0, f64::NAN, f64::INFINITY, MAX_TIME] {
            let err = lib.set_time(bad).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidValue);
        }

        lib.set_time(1000.0).unwrap();
        let now = lib.time().unwrap();
        assert!((1000.0..1001.0).contains(&now));

        // Clones share the offset.
        let timer = lib.timer().unwrap();
        lib.set_time(5.0).unwrap();
        let elsewhere = std::thread::spawn(move || timer.time()).join().unwrap();
        assert!((5.0..6.0).contains(&elsewhere));

        assert_eq!(lib.timer_frequency().unwrap(), 1_000_000_000);
        assert!(lib.timer_value().unwrap() >= 5_000_000_000);
    }
}
