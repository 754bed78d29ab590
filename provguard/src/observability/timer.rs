//! Wall-clock timing of guarded work.

use std::time::{Duration, Instant};

use tracing::debug;

/// Measures how long a named piece of work takes.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts timing `name`.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the name being timed.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the time elapsed so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Returns the time elapsed so far in whole milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Stops the timer, logging and returning the duration in milliseconds.
    pub fn finish(self) -> u64 {
        let duration_ms = self.elapsed_ms();
        debug!(span = %self.name, duration_ms, "Timed span finished");
        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_measures_sleep() {
        let timer = SpanTimer::start("sleep");
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(timer.name(), "sleep");
        assert!(timer.elapsed() >= Duration::from_millis(5));
        assert!(timer.finish() >= 5);
    }
}
