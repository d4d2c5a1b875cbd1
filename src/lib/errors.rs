//! Custom error types for encpipe operations.

use thiserror::Error;

/// Result type alias for encpipe operations
pub type Result<T> = std::result::Result<T, EncpipeError>;

/// Error type for encpipe operations
#[derive(Error, Debug)]
pub enum EncpipeError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Setup of an external collaborator failed
    #[error("Failed to set up {component} '{path}': {reason}")]
    Setup {
        /// Which collaborator failed (e.g., "source", "sink", "key")
        component: String,
        /// Path to the offending file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// An enqueue was attempted against a full queue outside the blocking
    /// contract. This is an invariant violation, never expected in correct
    /// operation.
    #[error("Capacity violation on {queue} queue: enqueue attempted at capacity {capacity}")]
    CapacityViolation {
        /// Which queue was violated ("input" or "output")
        queue: String,
        /// The queue's fixed capacity
        capacity: usize,
    },

    /// A worker thread panicked; the payload message is preserved
    #[error("Worker thread '{worker}' panicked: {message}")]
    WorkerPanic {
        /// Name of the worker thread
        worker: String,
        /// Extracted panic message
        message: String,
    },

    /// I/O error from the external source or sink
    #[error("I/O error in {stage} stage: {source}")]
    Io {
        /// The stage in which the error occurred
        stage: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
