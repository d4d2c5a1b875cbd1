//! Writer-side progress logging.
//!
//! Thread-safe counter that logs a line each time the running total crosses
//! an interval boundary, and a closing line when the stream ends.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::logging::format_count;

/// Interval-crossing progress logger.
///
/// # Example
/// ```
/// use encpipe_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("bytes written").with_interval(100);
/// for _ in 0..250 {
///     tracker.add(1); // logs at 100 and 200
/// }
/// tracker.log_final(); // "bytes written: 250 (done)"
/// ```
pub struct ProgressTracker {
    interval: u64,
    message: String,
    count: AtomicU64,
}

impl ProgressTracker {
    /// Create a tracker with the default interval of 65,536.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 65_536, message: message.into(), count: AtomicU64::new(0) }
    }

    /// Override the logging interval. An interval of 0 disables interval
    /// logging (the final line still prints).
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval;
        self
    }

    /// Current total.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    /// Add to the total, logging if an interval boundary was crossed.
    pub fn add(&self, additional: u64) {
        let before = self.count.fetch_add(additional, Ordering::AcqRel);
        if self.interval == 0 {
            return;
        }
        let after = before + additional;
        if before / self.interval != after / self.interval {
            info!("{}: {}", self.message, format_count(after));
        }
    }

    /// Log the closing total.
    pub fn log_final(&self) {
        info!("{}: {} (done)", self.message, format_count(self.count()));
    }
}
