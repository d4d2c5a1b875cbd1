#![deny(unsafe_code)]
// Clippy lint configuration:
// - cast_possible_truncation: histogram indices are provably in 0..256
// - missing_panics_doc: internal asserts document invariants, not API panics
#![allow(clippy::cast_possible_truncation, clippy::missing_panics_doc)]

//! # encpipe - concurrent byte-stream encryption pipeline
//!
//! This library implements a fixed five-stage pipeline that moves bytes
//! from a source to a sink through an encryption transform:
//!
//! ```text
//! reader -> [input queue] -> transform -> [output queue] -> writer
//!              ^ input counter               ^ output counter
//! ```
//!
//! The stages run as five parallel workers over two bounded blocking
//! queues. Each queue is shared three ways: a producer appends, a counter
//! inspects and marks the head, and a consumer removes marked heads - so
//! every byte is accounted exactly once, in order, before it moves on.
//! Backpressure is blocking end to end: a slow sink fills the output
//! queue, which stalls the transform, which fills the input queue, which
//! stalls the reader.
//!
//! ## Core modules
//!
//! - **[`queue`]** - the bounded blocking FIFO with the head-marker protocol
//! - **[`pipeline`]** - configuration, worker spawning and joining
//! - **[`reset`]** - the pause/drain/resume protocol and its admission gate
//!
//! ## Collaborators
//!
//! - **[`io`]** - byte source/sink traits, file and in-memory backends
//! - **[`cipher`]** - pure per-byte transforms and key loading
//! - **[`counts`]** - per-byte accounting and count logging
//!
//! ## Utilities
//!
//! - **[`validation`]** - parameter and file validation
//! - **[`progress`]** - interval-crossing progress logging
//! - **[`logging`]** - count/duration/rate formatting, operation timing
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use encpipe_lib::cipher::ShiftCipher;
//! use encpipe_lib::counts::TransferCounts;
//! use encpipe_lib::io::{MemorySource, SharedMemorySink};
//! use encpipe_lib::pipeline::{Pipeline, PipelineConfig};
//!
//! let counts = Arc::new(TransferCounts::new());
//! let pipeline = Pipeline::new(PipelineConfig::new(4, 4), counts.clone()).unwrap();
//! let sink = SharedMemorySink::new();
//! let out = sink.buffer();
//! pipeline
//!     .run(MemorySource::new(b"AB".to_vec()), sink, ShiftCipher::new(1))
//!     .unwrap();
//! assert_eq!(*out.lock(), b"BC");
//! ```

pub mod cipher;
pub mod counts;
pub mod errors;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod reset;
mod stages;
pub mod validation;

pub use cipher::{ByteTransform, ShiftCipher, XorCipher};
pub use counts::{TransferCounter, TransferCounts};
pub use errors::{EncpipeError, Result};
pub use io::{ByteSink, ByteSource, FileSink, FileSource};
pub use pipeline::{Pipeline, PipelineConfig};
pub use queue::{BoundedQueue, Token};
pub use reset::{ResetController, ResetPhase};
