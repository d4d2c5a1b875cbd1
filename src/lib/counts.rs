//! Byte accounting for the counting stages.
//!
//! The two counter stages report every byte that passes through their queue
//! exactly once, before the removing stage takes it. [`TransferCounter`] is
//! the seam the stages call through; [`TransferCounts`] is the production
//! implementation, keeping per-stream totals and per-value histograms and
//! rendering them on demand.

use log::{debug, info};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::logging::format_count;

/// Sink for the pipeline's per-byte accounting.
///
/// `count_input` and `count_output` are invoked exactly once per byte, in
/// arrival order, by the respective counter stage. `log_counts` is invoked
/// once per completed reset drain and once at final shutdown.
pub trait TransferCounter: Send + Sync {
    /// Record a byte observed at the head of the input queue.
    fn count_input(&self, byte: u8);

    /// Record a byte observed at the head of the output queue.
    fn count_output(&self, byte: u8);

    /// Render the accumulated counts to the log.
    fn log_counts(&self);
}

/// Per-value tallies for one side of the pipeline.
struct Histogram {
    buckets: Mutex<[u64; 256]>,
}

impl Histogram {
    fn new() -> Self {
        Self { buckets: Mutex::new([0; 256]) }
    }

    fn record(&self, byte: u8) {
        self.buckets.lock()[byte as usize] += 1;
    }

    /// Nonzero `(value, count)` pairs in ascending value order.
    fn nonzero(&self) -> Vec<(u8, u64)> {
        let buckets = self.buckets.lock();
        buckets
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(value, count)| (value as u8, *count))
            .collect()
    }
}

/// Production [`TransferCounter`]: totals plus per-value histograms.
pub struct TransferCounts {
    input_total: AtomicU64,
    output_total: AtomicU64,
    input_hist: Histogram,
    output_hist: Histogram,
    log_invocations: AtomicU64,
}

impl Default for TransferCounts {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferCounts {
    /// Create an empty set of counts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            input_total: AtomicU64::new(0),
            output_total: AtomicU64::new(0),
            input_hist: Histogram::new(),
            output_hist: Histogram::new(),
            log_invocations: AtomicU64::new(0),
        }
    }

    /// Total bytes counted on the input side.
    #[must_use]
    pub fn input_total(&self) -> u64 {
        self.input_total.load(Ordering::Acquire)
    }

    /// Total bytes counted on the output side.
    #[must_use]
    pub fn output_total(&self) -> u64 {
        self.output_total.load(Ordering::Acquire)
    }

    /// Number of times `log_counts` has run (reset drains plus shutdown).
    #[must_use]
    pub fn log_invocations(&self) -> u64 {
        self.log_invocations.load(Ordering::Acquire)
    }

    /// Nonzero input-side `(value, count)` pairs in ascending value order.
    #[must_use]
    pub fn input_histogram(&self) -> Vec<(u8, u64)> {
        self.input_hist.nonzero()
    }

    /// Nonzero output-side `(value, count)` pairs in ascending value order.
    #[must_use]
    pub fn output_histogram(&self) -> Vec<(u8, u64)> {
        self.output_hist.nonzero()
    }
}

fn render_value(value: u8) -> String {
    if value.is_ascii_graphic() || value == b' ' {
        format!("'{}'", value as char)
    } else {
        format!("0x{value:02x}")
    }
}

impl TransferCounter for TransferCounts {
    fn count_input(&self, byte: u8) {
        self.input_hist.record(byte);
        self.input_total.fetch_add(1, Ordering::AcqRel);
    }

    fn count_output(&self, byte: u8) {
        self.output_hist.record(byte);
        self.output_total.fetch_add(1, Ordering::AcqRel);
    }

    fn log_counts(&self) {
        let input = self.input_hist.nonzero();
        let output = self.output_hist.nonzero();
        info!(
            "Counts: {} bytes in ({} distinct values), {} bytes out ({} distinct values)",
            format_count(self.input_total()),
            input.len(),
            format_count(self.output_total()),
            output.len()
        );
        for (value, count) in &input {
            debug!("  in  {} x {}", render_value(*value), format_count(*count));
        }
        for (value, count) in &output {
            debug!("  out {} x {}", render_value(*value), format_count(*count));
        }
        self.log_invocations.fetch_add(1, Ordering::AcqRel);
    }
}
