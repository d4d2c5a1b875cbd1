//! Property-based tests for queue and pipeline correctness.

use std::sync::Arc;

use proptest::prelude::*;

use encpipe_lib::cipher::ShiftCipher;
use encpipe_lib::counts::TransferCounts;
use encpipe_lib::io::{MemorySource, SharedMemorySink};
use encpipe_lib::pipeline::{Pipeline, PipelineConfig};
use encpipe_lib::queue::{BoundedQueue, Token};

proptest! {
    /// Enqueue-then-dequeue of fewer bytes than capacity preserves order.
    #[test]
    fn prop_fifo_preserved(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let queue = BoundedQueue::new("input", 64);
        for b in &bytes {
            prop_assert!(queue.try_enqueue(Token::Byte(*b)));
        }
        let mut out = Vec::new();
        while !queue.is_empty() {
            queue.mark_head_processed();
            if let Token::Byte(b) = queue.dequeue_processed() {
                out.push(b);
            }
        }
        prop_assert_eq!(out, bytes);
    }

    /// Length never exceeds capacity, and `try_enqueue` fails exactly when
    /// the queue is at capacity, across arbitrary operation interleavings.
    #[test]
    fn prop_capacity_invariant(
        capacity in 2usize..16,
        ops in proptest::collection::vec(any::<bool>(), 0..200),
    ) {
        let queue = BoundedQueue::new("input", capacity);
        for (i, enqueue) in ops.into_iter().enumerate() {
            if enqueue {
                let was_full = queue.is_full();
                #[allow(clippy::cast_possible_truncation)]
                let accepted = queue.try_enqueue(Token::Byte(i as u8));
                prop_assert_eq!(accepted, !was_full);
            } else if !queue.is_empty() {
                queue.mark_head_processed();
                queue.dequeue_processed();
            }
            prop_assert!(queue.len() <= capacity);
        }
    }

    /// End-to-end: for any input and any valid capacities, the sink
    /// receives exactly the transformed input, in order.
    #[test]
    fn prop_pipeline_transforms_in_order(
        bytes in proptest::collection::vec(any::<u8>(), 0..512),
        n in 2usize..8,
        m in 2usize..8,
        shift in any::<u8>(),
    ) {
        let counts = Arc::new(TransferCounts::new());
        let pipeline = Pipeline::new(PipelineConfig::new(n, m), counts.clone()).unwrap();
        let sink = SharedMemorySink::new();
        let out = sink.buffer();

        pipeline
            .run(MemorySource::new(bytes.clone()), sink, ShiftCipher::new(shift))
            .unwrap();

        let expected: Vec<u8> = bytes.iter().map(|b| b.wrapping_add(shift)).collect();
        prop_assert_eq!(&*out.lock(), &expected);
        prop_assert_eq!(counts.input_total(), bytes.len() as u64);
        prop_assert_eq!(counts.output_total(), bytes.len() as u64);
    }
}
