//! Sleep seam for deterministic tests.
//!
//! Every wait in the bot (retry backoff, poll interval, jitter, cycle gap,
//! error cooldown) goes through [`Sleeper`] so tests can substitute an
//! instant implementation and simulate elapsed time without real waiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeping via `std::thread::sleep`.
#[derive(Debug, Default, Clone)]
pub struct SystemSleeper;

impl Sleeper for SystemSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Sleep `total` in one-second slices, checking `stop` between slices so a
/// ctrl-c is honored mid-wait rather than only at coarse boundaries.
///
/// Returns `false` if the stop flag was raised before the full duration
/// elapsed.
pub fn sleep_unless_stopped(sleeper: &dyn Sleeper, total: Duration, stop: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_secs(1);

    let mut remaining = total;
    while remaining > Duration::ZERO {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let step = remaining.min(SLICE);
        sleeper.sleep(step);
        remaining -= step;
    }
    !stop.load(Ordering::Relaxed)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records requested sleeps and returns immediately.
    #[derive(Debug, Default)]
    pub struct InstantSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    impl InstantSleeper {
        pub fn total_slept(&self) -> Duration {
            self.slept.lock().unwrap().iter().sum()
        }

        pub fn sleeps(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    impl Sleeper for InstantSleeper {
        fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::InstantSleeper;
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn full_sleep_when_not_stopped() {
        let sleeper = InstantSleeper::default();
        let stop = AtomicBool::new(false);

        let completed = sleep_unless_stopped(&sleeper, Duration::from_secs(5), &stop);
        assert!(completed);
        assert_eq!(sleeper.total_slept(), Duration::from_secs(5));
    }

    #[test]
    fn fractional_tail_is_not_rounded_away() {
        let sleeper = InstantSleeper::default();
        let stop = AtomicBool::new(false);

        sleep_unless_stopped(&sleeper, Duration::from_millis(2500), &stop);
        assert_eq!(sleeper.total_slept(), Duration::from_millis(2500));
    }

    #[test]
    fn raised_stop_flag_returns_early() {
        let sleeper = InstantSleeper::default();
        let stop = AtomicBool::new(true);

        let completed = sleep_unless_stopped(&sleeper, Duration::from_secs(60), &stop);
        assert!(!completed);
        assert_eq!(sleeper.total_slept(), Duration::ZERO);
    }
}
