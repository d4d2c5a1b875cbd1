//! Concurrency tests for the five-stage pipeline.
//!
//! These verify order preservation, exactly-once counting, blocking
//! backpressure, and reset safety under real multi-threaded execution.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use encpipe_lib::cipher::ShiftCipher;
use encpipe_lib::counts::TransferCounts;
use encpipe_lib::io::{MemorySource, SharedMemorySink};
use encpipe_lib::pipeline::{Pipeline, PipelineConfig};
use encpipe_lib::reset::ResetPhase;

use crate::helpers::{MeteredSource, RecordingCounter, SlowMeteredSink};

// ============================================================================
// Concrete scenarios
// ============================================================================

/// N=4, M=4, source "AB", shift-by-1: the sink receives "BC", the input
/// counter sees 'A' then 'B', the output counter sees 'B' then 'C'.
#[test]
fn test_ab_scenario() {
    let counter = RecordingCounter::new();
    let pipeline = Pipeline::new(PipelineConfig::new(4, 4), counter.clone()).unwrap();
    let sink = SharedMemorySink::new();
    let out = sink.buffer();

    pipeline.run(MemorySource::new(b"AB".to_vec()), sink, ShiftCipher::new(1)).unwrap();

    assert_eq!(*out.lock(), b"BC");
    assert_eq!(*counter.input_calls.lock(), vec![b'A', b'B']);
    assert_eq!(*counter.output_calls.lock(), vec![b'B', b'C']);
    assert_eq!(counter.log_calls.load(Ordering::Acquire), 1);
}

/// N=2 with a slow sink: the reader must block on the full input queue
/// rather than run ahead. The source's lead over the sink stays bounded by
/// the queue capacities plus the bytes stages hold in hand.
#[test]
fn test_reader_blocks_on_slow_sink() {
    let counts = Arc::new(TransferCounts::new());
    let pipeline = Pipeline::new(PipelineConfig::new(2, 2), counts.clone()).unwrap();

    let input: Vec<u8> = (1..=50u8).collect();
    let source = MeteredSource::new(input.clone());
    let sink = SlowMeteredSink::new(Duration::from_millis(2), source.meter());
    let out = sink.output();
    let lead = sink.lead();

    pipeline.run(source, sink, ShiftCipher::new(1)).unwrap();

    let expected: Vec<u8> = input.iter().map(|b| b.wrapping_add(1)).collect();
    assert_eq!(*out.lock(), expected, "slow sink must not cause drops or overwrites");

    // Two queues of 2, plus one byte each in the reader's, transform's, and
    // writer's hands.
    let bound = 2 + 2 + 3;
    assert!(
        lead.load(Ordering::Acquire) <= bound,
        "reader ran {} bytes ahead; backpressure bound is {}",
        lead.load(Ordering::Acquire),
        bound
    );
    assert_eq!(counts.input_total(), 50);
    assert_eq!(counts.output_total(), 50);
}

/// Every byte is counted exactly once on each side, in arrival order, even
/// with constant contention on tiny queues.
#[test]
fn test_exactly_once_in_order_counting() {
    let counter = RecordingCounter::new();
    let pipeline = Pipeline::new(PipelineConfig::new(2, 3), counter.clone()).unwrap();

    let input: Vec<u8> = (0..=255u8).cycle().take(2000).collect();
    let sink = SharedMemorySink::new();
    pipeline.run(MemorySource::new(input.clone()), sink, ShiftCipher::new(11)).unwrap();

    let expected_out: Vec<u8> = input.iter().map(|b| b.wrapping_add(11)).collect();
    assert_eq!(*counter.input_calls.lock(), input, "input side: once each, in order");
    assert_eq!(*counter.output_calls.lock(), expected_out, "output side: once each, in order");
}

// ============================================================================
// Reset safety
// ============================================================================

/// Resets fired at arbitrary points must never lose or duplicate a byte,
/// and every drain logs the counts once.
#[test]
fn test_repeated_resets_under_load() {
    let counter = RecordingCounter::new();
    let pipeline = Pipeline::new(PipelineConfig::new(3, 3), counter.clone()).unwrap();
    let controller = pipeline.controller();

    let total = 3000usize;
    let input: Vec<u8> = (0..=255u8).cycle().take(total).collect();
    let sink = SharedMemorySink::new();
    let out = sink.buffer();

    let resets = 5;
    let resetter = std::thread::spawn(move || {
        for _ in 0..resets {
            std::thread::sleep(Duration::from_millis(3));
            controller.request_reset();
            assert_eq!(controller.phase(), ResetPhase::Paused);
            controller.resume_after_reset();
        }
    });

    pipeline.run(MemorySource::new(input.clone()), sink, ShiftCipher::new(1)).unwrap();
    resetter.join().unwrap();

    let expected: Vec<u8> = input.iter().map(|b| b.wrapping_add(1)).collect();
    assert_eq!(*out.lock(), expected, "no byte lost or duplicated across resets");
    // One log per completed drain plus the final shutdown log.
    assert_eq!(counter.log_calls.load(Ordering::Acquire), resets + 1);
}

/// A reset colliding with end-of-source must not deadlock: the end sentinel
/// propagates through the drain and the request completes.
#[test]
fn test_reset_at_end_of_source() {
    for delay_us in [0u64, 50, 200, 1000] {
        let counts = Arc::new(TransferCounts::new());
        let pipeline = Pipeline::new(PipelineConfig::new(2, 2), counts.clone()).unwrap();
        let controller = pipeline.controller();
        let sink = SharedMemorySink::new();
        let out = sink.buffer();

        let resetter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_micros(delay_us));
            controller.request_reset();
            controller.resume_after_reset();
        });

        pipeline.run(MemorySource::new(b"xyz".to_vec()), sink, ShiftCipher::new(1)).unwrap();
        resetter.join().unwrap();

        assert_eq!(*out.lock(), b"yz{", "delay {delay_us}us");
        assert_eq!(counts.log_invocations(), 2);
    }
}

/// An empty source still terminates all five stages and logs final counts.
#[test]
fn test_empty_source() {
    let counter = RecordingCounter::new();
    let pipeline = Pipeline::new(PipelineConfig::new(4, 4), counter.clone()).unwrap();
    let sink = SharedMemorySink::new();
    let out = sink.buffer();

    pipeline.run(MemorySource::new(Vec::new()), sink, ShiftCipher::new(1)).unwrap();

    assert!(out.lock().is_empty());
    assert!(counter.input_calls.lock().is_empty());
    assert_eq!(counter.log_calls.load(Ordering::Acquire), 1);
}
