//! Wrap-safe timebase helpers
//!
//! The board supplies free-running 32-bit millisecond and microsecond
//! counters. Both wrap (after ~49.7 days and ~71.6 minutes); every
//! interval in the crate is computed with modular subtraction so a wrap
//! between two samples is harmless.

/// Interval between two counter samples, correct across one wrap
#[inline]
pub fn time_diff(later: u32, earlier: u32) -> u32 {
    later.wrapping_sub(earlier)
}

/// Convert a duration in seconds to milliseconds
///
/// Negative and NaN inputs map to zero, huge inputs saturate.
#[inline]
pub fn secs_to_ms(secs: f32) -> u32 {
    (secs * 1000.0) as u32
}

/// Resumable elapsed-time counter
///
/// Used for the shot timer: stopping keeps the accumulated time and
/// starting again resumes from it until [`Stopwatch::reset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stopwatch {
    accumulated_ms: u32,
    started_ms: Option<u32>,
}

impl Stopwatch {
    /// Create a stopped stopwatch reading zero
    pub const fn new() -> Self {
        Self {
            accumulated_ms: 0,
            started_ms: None,
        }
    }

    /// Start (or resume) counting; no-op if already running
    pub fn start(&mut self, now_ms: u32) {
        if self.started_ms.is_none() {
            self.started_ms = Some(now_ms);
        }
    }

    /// Stop counting, keeping the time accumulated so far
    pub fn stop(&mut self, now_ms: u32) {
        if let Some(started) = self.started_ms.take() {
            self.accumulated_ms = self
                .accumulated_ms
                .saturating_add(time_diff(now_ms, started));
        }
    }

    /// Stop and clear
    pub fn reset(&mut self) {
        self.accumulated_ms = 0;
        self.started_ms = None;
    }

    /// Whether the stopwatch is currently counting
    pub fn is_running(&self) -> bool {
        self.started_ms.is_some()
    }

    /// Total counted time
    pub fn elapsed_ms(&self, now_ms: u32) -> u32 {
        match self.started_ms {
            Some(started) => self
                .accumulated_ms
                .saturating_add(time_diff(now_ms, started)),
            None => self.accumulated_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_time_diff_across_wrap() {
        assert_eq!(time_diff(5, u32::MAX - 4), 10);
        assert_eq!(time_diff(1000, 400), 600);
    }

    #[test]
    fn test_secs_to_ms() {
        assert_eq!(secs_to_ms(3.0), 3000);
        assert_eq!(secs_to_ms(0.5), 500);
        assert_eq!(secs_to_ms(-1.0), 0);
    }

    #[test]
    fn test_stopwatch_resumes() {
        let mut sw = Stopwatch::new();
        sw.start(1000);
        assert_eq!(sw.elapsed_ms(1500), 500);

        sw.stop(2000);
        assert!(!sw.is_running());
        assert_eq!(sw.elapsed_ms(9000), 1000);

        sw.start(10_000);
        assert_eq!(sw.elapsed_ms(10_250), 1250);

        sw.reset();
        assert_eq!(sw.elapsed_ms(20_000), 0);
    }

    #[test]
    fn test_double_start_keeps_origin() {
        let mut sw = Stopwatch::new();
        sw.start(100);
        sw.start(900);
        assert_eq!(sw.elapsed_ms(1100), 1000);
    }

    proptest! {
        #[test]
        fn prop_diff_is_true_interval(start in any::<u32>(), delta in 0u32..=u32::MAX / 2) {
            let later = start.wrapping_add(delta);
            prop_assert_eq!(time_diff(later, start), delta);
        }
    }
}
