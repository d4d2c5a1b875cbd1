//! Shared fixtures for pipeline integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use encpipe_lib::counts::TransferCounter;
use encpipe_lib::errors::Result;
use encpipe_lib::io::{ByteSink, ByteSource};

/// [`TransferCounter`] that records every call in order, for asserting the
/// exactly-once and in-order counting contracts.
#[derive(Default)]
pub struct RecordingCounter {
    pub input_calls: Mutex<Vec<u8>>,
    pub output_calls: Mutex<Vec<u8>>,
    pub log_calls: AtomicU64,
}

impl RecordingCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl TransferCounter for RecordingCounter {
    fn count_input(&self, byte: u8) {
        self.input_calls.lock().push(byte);
    }

    fn count_output(&self, byte: u8) {
        self.output_calls.lock().push(byte);
    }

    fn log_counts(&self) {
        self.log_calls.fetch_add(1, Ordering::AcqRel);
    }
}

/// Source that counts how many bytes it has handed out, so tests can bound
/// how far the reader runs ahead of the writer.
pub struct MeteredSource {
    bytes: Vec<u8>,
    pos: usize,
    pub handed_out: Arc<AtomicU64>,
}

impl MeteredSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, pos: 0, handed_out: Arc::new(AtomicU64::new(0)) }
    }

    pub fn meter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.handed_out)
    }
}

impl ByteSource for MeteredSource {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.bytes.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
            self.handed_out.fetch_add(1, Ordering::AcqRel);
        }
        Ok(byte)
    }
}

/// Sink that sleeps per byte and watches how far the source has run ahead,
/// recording the worst case. With blocking backpressure the lead is bounded
/// by the queue capacities plus the few bytes stages hold in hand.
pub struct SlowMeteredSink {
    pub written: Arc<Mutex<Vec<u8>>>,
    delay: Duration,
    source_meter: Arc<AtomicU64>,
    pub max_lead: Arc<AtomicU64>,
}

impl SlowMeteredSink {
    pub fn new(delay: Duration, source_meter: Arc<AtomicU64>) -> Self {
        Self {
            written: Arc::new(Mutex::new(Vec::new())),
            delay,
            source_meter,
            max_lead: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn output(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.written)
    }

    pub fn lead(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.max_lead)
    }
}

impl ByteSink for SlowMeteredSink {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        std::thread::sleep(self.delay);
        let written = {
            let mut out = self.written.lock();
            out.push(byte);
            out.len() as u64
        };
        let lead = self.source_meter.load(Ordering::Acquire).saturating_sub(written);
        self.max_lead.fetch_max(lead, Ordering::AcqRel);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
