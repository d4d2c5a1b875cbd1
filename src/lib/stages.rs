//! The five pipeline stage loops.
//!
//! Each loop runs on its own worker thread over the shared pipeline state:
//!
//! ```text
//! reader -> [input queue] -> transform -> [output queue] -> writer
//!              ^ input counter               ^ output counter
//! ```
//!
//! The counter stages never remove items; they inspect and mark the head of
//! their queue, which is what makes the head eligible for removal by the
//! stage downstream of them. Shutdown is cooperative: the end sentinel is
//! admitted by the reader at source exhaustion and handed stage to stage
//! until the writer consumes it.
//!
//! A stage that hits an I/O error records it on the shared state and still
//! propagates the sentinel (reader) or keeps consuming tokens (writer), so
//! no peer is left blocked on a queue that will never move again.

use log::debug;

use crate::cipher::ByteTransform;
use crate::counts::TransferCounter;
use crate::io::{ByteSink, ByteSource};
use crate::pipeline::PipelineShared;
use crate::progress::ProgressTracker;
use crate::queue::Token;

/// Reader stage: admit source bytes into the input queue.
///
/// The admission gate is checked before every byte, so a pending reset
/// holds the byte in the reader's hands - outside both queues - until
/// resume. End-of-source bypasses the gate: the sentinel must reach the
/// queue even while a reset is draining.
pub(crate) fn run_reader(shared: &PipelineShared, source: &mut dyn ByteSource) {
    loop {
        match source.next_byte() {
            Ok(Some(byte)) => {
                shared.gate.admit();
                shared.input.enqueue(Token::Byte(byte));
            }
            Ok(None) => {
                debug!("reader: end of source");
                shared.gate.admit_final();
                shared.input.enqueue(Token::End);
                break;
            }
            Err(e) => {
                shared.set_error(e);
                shared.gate.admit_final();
                shared.input.enqueue(Token::End);
                break;
            }
        }
    }
}

/// Input counter stage: report each input-queue head exactly once, then
/// mark it for removal. Exits after marking the end sentinel.
pub(crate) fn run_input_counter(shared: &PipelineShared, counts: &dyn TransferCounter) {
    loop {
        let token = shared.input.process_head(|t| {
            if let Token::Byte(byte) = t {
                counts.count_input(byte);
            }
        });
        if token.is_end() {
            break;
        }
    }
}

/// Transform stage: move marked heads from the input queue to the output
/// queue, applying the transform. Propagates the end sentinel and exits.
pub(crate) fn run_transform(shared: &PipelineShared, transform: &dyn ByteTransform) {
    loop {
        match shared.input.dequeue_processed() {
            Token::Byte(byte) => {
                shared.output.enqueue(Token::Byte(transform.apply(byte)));
            }
            Token::End => {
                shared.output.enqueue(Token::End);
                break;
            }
        }
    }
}

/// Output counter stage: mirror of the input counter over the output queue.
pub(crate) fn run_output_counter(shared: &PipelineShared, counts: &dyn TransferCounter) {
    loop {
        let token = shared.output.process_head(|t| {
            if let Token::Byte(byte) = t {
                counts.count_output(byte);
            }
        });
        if token.is_end() {
            break;
        }
    }
}

/// Writer stage: hand marked output-queue heads to the sink; completion is
/// recorded on the gate only after the write lands. Consumes the end
/// sentinel and exits.
///
/// After a sink error the stage stops writing but keeps consuming tokens,
/// so the upstream stages can still drain and terminate.
pub(crate) fn run_writer(
    shared: &PipelineShared,
    sink: &mut dyn ByteSink,
    progress: &ProgressTracker,
) {
    let mut sink_failed = false;
    loop {
        match shared.output.dequeue_processed() {
            Token::Byte(byte) => {
                if !sink_failed {
                    match sink.write_byte(byte) {
                        Ok(()) => progress.add(1),
                        Err(e) => {
                            shared.set_error(e);
                            sink_failed = true;
                        }
                    }
                }
                shared.gate.complete();
            }
            Token::End => {
                shared.gate.complete();
                break;
            }
        }
    }
    if !sink_failed {
        if let Err(e) = sink.flush() {
            shared.set_error(e);
        }
    }
    progress.log_final();
}
