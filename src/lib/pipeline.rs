//! Pipeline configuration, shared state, and orchestration.
//!
//! [`Pipeline::run`] spawns the five stage workers on named OS threads,
//! joins them in pipeline order once the end sentinel has propagated, and
//! surfaces the first error any stage recorded. The two queues, the
//! admission gate, and the error slot live in one [`PipelineShared`]
//! reachable from every worker.

use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

use crate::cipher::ByteTransform;
use crate::counts::TransferCounter;
use crate::errors::{EncpipeError, Result};
use crate::io::{ByteSink, ByteSource};
use crate::progress::ProgressTracker;
use crate::queue::BoundedQueue;
use crate::reset::{PipelineGate, ResetController};
use crate::stages;
use crate::validation::validate_queue_capacity;

/// Default writer-progress logging interval, in bytes.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 65_536;

/// Capacities and tuning for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Input queue capacity (N). Must be greater than 1.
    pub input_capacity: usize,
    /// Output queue capacity (M). Must be greater than 1.
    pub output_capacity: usize,
    /// Writer progress is logged every this many bytes.
    pub progress_interval: u64,
}

impl PipelineConfig {
    /// Create a configuration with the given queue capacities.
    #[must_use]
    pub fn new(input_capacity: usize, output_capacity: usize) -> Self {
        Self { input_capacity, output_capacity, progress_interval: DEFAULT_PROGRESS_INTERVAL }
    }

    /// Override the writer progress interval.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Check that both capacities admit concurrent producer/consumer
    /// progress.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if either capacity is not greater than 1.
    pub fn validate(&self) -> Result<()> {
        validate_queue_capacity("input-queue", self.input_capacity)?;
        validate_queue_capacity("output-queue", self.output_capacity)?;
        Ok(())
    }
}

/// State shared by all five workers and the reset controller.
pub(crate) struct PipelineShared {
    pub(crate) input: BoundedQueue,
    pub(crate) output: BoundedQueue,
    pub(crate) gate: PipelineGate,
    error: Mutex<Option<EncpipeError>>,
}

impl PipelineShared {
    pub(crate) fn new(config: &PipelineConfig) -> Self {
        Self {
            input: BoundedQueue::new("input", config.input_capacity),
            output: BoundedQueue::new("output", config.output_capacity),
            gate: PipelineGate::new(),
            error: Mutex::new(None),
        }
    }

    /// Record a stage error. The first error wins; later ones are logged
    /// and dropped.
    pub(crate) fn set_error(&self, error: EncpipeError) {
        let mut slot = self.error.lock();
        if let Some(existing) = slot.as_ref() {
            debug!("suppressing subsequent stage error '{error}' after '{existing}'");
        } else {
            *slot = Some(error);
        }
    }

    fn take_error(&self) -> Option<EncpipeError> {
        self.error.lock().take()
    }
}

/// Extract a human-readable message from a panic payload.
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A configured five-stage pipeline, ready to run once.
pub struct Pipeline {
    config: PipelineConfig,
    shared: Arc<PipelineShared>,
    counts: Arc<dyn TransferCounter>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline over the given counter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the configuration is invalid; no
    /// worker is started in that case.
    pub fn new(config: PipelineConfig, counts: Arc<dyn TransferCounter>) -> Result<Self> {
        config.validate()?;
        let shared = Arc::new(PipelineShared::new(&config));
        Ok(Self { config, shared, counts })
    }

    /// Handle for requesting pause/drain/resume cycles. Valid before,
    /// during, and after [`run`](Self::run).
    #[must_use]
    pub fn controller(&self) -> ResetController {
        ResetController::new(Arc::clone(&self.shared), Arc::clone(&self.counts))
    }

    /// Run the pipeline to completion: spawn the five workers, wait for the
    /// end sentinel to propagate, join everything in pipeline order, and
    /// log the final counts.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error a stage recorded, or a `WorkerPanic` if
    /// a stage panicked without recording one.
    pub fn run<S, K, T>(self, source: S, sink: K, transform: T) -> Result<()>
    where
        S: ByteSource + 'static,
        K: ByteSink + 'static,
        T: ByteTransform + 'static,
    {
        debug!(
            "starting pipeline: input capacity {}, output capacity {}",
            self.config.input_capacity, self.config.output_capacity
        );
        let progress =
            ProgressTracker::new("bytes written").with_interval(self.config.progress_interval);

        let reader = spawn_worker("reader", {
            let shared = Arc::clone(&self.shared);
            let mut source = source;
            move || stages::run_reader(&shared, &mut source)
        })?;
        let input_counter = spawn_worker("input-counter", {
            let shared = Arc::clone(&self.shared);
            let counts = Arc::clone(&self.counts);
            move || stages::run_input_counter(&shared, counts.as_ref())
        })?;
        let transform_worker = spawn_worker("transform", {
            let shared = Arc::clone(&self.shared);
            move || stages::run_transform(&shared, &transform)
        })?;
        let output_counter = spawn_worker("output-counter", {
            let shared = Arc::clone(&self.shared);
            let counts = Arc::clone(&self.counts);
            move || stages::run_output_counter(&shared, counts.as_ref())
        })?;
        let writer = spawn_worker("writer", {
            let shared = Arc::clone(&self.shared);
            let mut sink = sink;
            move || stages::run_writer(&shared, &mut sink, &progress)
        })?;

        let mut first_panic = None;
        for handle in [reader, input_counter, transform_worker, output_counter, writer] {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            match handle.join() {
                Ok(()) => debug!("{name} joined"),
                Err(payload) => {
                    let message = panic_message(payload);
                    if first_panic.is_none() {
                        first_panic =
                            Some(EncpipeError::WorkerPanic { worker: name, message });
                    }
                }
            }
        }

        self.counts.log_counts();

        if let Some(error) = self.shared.take_error() {
            return Err(error);
        }
        if let Some(panic) = first_panic {
            return Err(panic);
        }
        Ok(())
    }
}

fn spawn_worker<F>(name: &str, body: F) -> Result<thread::JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|e| EncpipeError::Io { stage: name.to_string(), source: e })
}
