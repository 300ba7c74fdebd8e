//! Checkpoint timer for benchmarks and perf-flavored tests.
//!
//! Not part of scheduling correctness — the pools never consult the clock.
//! Emits through the `log` facade at info level; a profile logs its total
//! elapsed time when dropped.

use log::info;
use std::time::{Duration, Instant};

/// Named profile with incremental checkpoints.
pub struct Timer {
    profile: String,
    start: Instant,
    previous: Instant,
}

impl Timer {
    pub fn new(profile: impl Into<String>) -> Self {
        let profile = profile.into();
        info!("timer: starting profile ({profile})");
        let now = Instant::now();
        Self {
            profile,
            start: now,
            previous: now,
        }
    }

    /// Time elapsed since the previous checkpoint (or construction), and
    /// start a new checkpoint.
    pub fn elapsed_previous(&mut self, subprofile: &str) -> Duration {
        let now = Instant::now();
        let elapsed = now - self.previous;
        info!(
            "timer: subprofile [{}/{}]: {:?}",
            self.profile, subprofile, elapsed
        );
        self.previous = now;
        elapsed
    }

    /// Time elapsed since construction.
    pub fn elapsed_start(&self) -> Duration {
        let elapsed = self.start.elapsed();
        info!("timer: profile [{}]: {:?}", self.profile, elapsed);
        elapsed
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.elapsed_start();
    }
}
