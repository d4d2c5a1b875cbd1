//! Log formatting utilities.
//!
//! Shared helpers for rendering counts, durations, and throughput in log
//! lines, plus a timer that brackets a whole operation.

use std::time::{Duration, Instant};

/// Format an integer with thousands separators.
///
/// # Example
/// ```
/// use encpipe_lib::logging::format_count;
///
/// assert_eq!(format_count(1234567), "1,234,567");
/// assert_eq!(format_count(42), "42");
/// ```
#[must_use]
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a duration in human-readable form ("45s", "2m 15s", "1h 30m").
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let (m, s) = (secs / 60, secs % 60);
        if s == 0 { format!("{m}m") } else { format!("{m}m {s}s") }
    } else {
        let (h, m) = (secs / 3600, (secs % 3600) / 60);
        if m == 0 { format!("{h}h") } else { format!("{h}h {m}m") }
    }
}

/// Format a byte-throughput rate ("1.5 MiB/s", "820 B/s").
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_rate(bytes: u64, duration: Duration) -> String {
    let secs = duration.as_secs_f64().max(1e-9);
    let rate = bytes as f64 / secs;
    if rate >= 1024.0 * 1024.0 {
        format!("{:.1} MiB/s", rate / (1024.0 * 1024.0))
    } else if rate >= 1024.0 {
        format!("{:.1} KiB/s", rate / 1024.0)
    } else {
        format!("{rate:.0} B/s")
    }
}

/// Logs an operation's start on construction and its duration, byte count,
/// and rate on completion.
///
/// # Example
/// ```
/// use encpipe_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Encrypting");
/// // ... run the pipeline ...
/// timer.log_completion(4096);
/// ```
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    /// Start the timer and log the operation name.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start: Instant::now() }
    }

    /// Log completion with the number of bytes handled.
    pub fn log_completion(&self, bytes: u64) {
        let elapsed = self.start.elapsed();
        log::info!(
            "{} completed: {} bytes in {} ({})",
            self.operation,
            format_count(bytes),
            format_duration(elapsed),
            format_rate(bytes, elapsed)
        );
    }
}
