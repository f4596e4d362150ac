use std::time::{Duration, Instant};

/// Measures how long the current track has been playing, excluding pauses.
///
/// # Examples
///
/// ```rust
/// let mut stopwatch = Stopwatch::default();
/// stopwatch.start();
/// stopwatch.pause();
/// assert!(stopwatch.elapsed() < std::time::Duration::from_secs(1));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stopwatch {
    /// Time accumulated before the running period.
    accumulated: Duration,
    /// Start of the running period, if running.
    running_since: Option<Instant>,
}

impl Stopwatch {
    /// Restarts from zero.
    pub fn start(&mut self) {
        self.accumulated = Duration::ZERO;
        self.running_since = Some(Instant::now());
    }

    pub fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    pub fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.accumulated + self.running_since.map_or(Duration::ZERO, |since| since.elapsed())
    }
}
