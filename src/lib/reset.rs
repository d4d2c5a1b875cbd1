//! Pause/drain/resume protocol.
//!
//! A reset pauses admission at the reader, lets every byte already admitted
//! flow through counting and writing, logs the accumulated counts, and then
//! holds the pipeline in `Paused` until resumed. Nothing in flight is
//! aborted; nothing is lost or duplicated.
//!
//! # Drain detection
//!
//! Queue lengths alone cannot detect a completed drain: a byte sits in the
//! transform's hands between its input-queue dequeue and its output-queue
//! enqueue, and in the writer's hands between dequeue and the sink write.
//! Both queues can momentarily read empty while such a byte exists. The
//! [`PipelineGate`] instead tallies admissions at the reader (before the
//! token enters the input queue) and completions at the writer (after the
//! sink write, or after the end sentinel is consumed). The tallies agree
//! exactly when no token exists anywhere between admission and completion,
//! which also implies both queues are empty.
//!
//! The reset phase and the tallies live under one mutex: an admission
//! either lands before `Draining` is claimed and is awaited by the drain,
//! or it blocks until resume. There is no window in which the reader can
//! slip a byte past a reset request, which a separately-checked flag
//! could not rule out.

use log::debug;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

use crate::counts::TransferCounter;
use crate::pipeline::PipelineShared;

/// Reset lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPhase {
    /// Pipeline running normally; reader admits freely.
    Normal,
    /// Reset requested; reader holds back while admitted bytes drain out.
    Draining,
    /// Drain complete and counts logged; reader parked until resume.
    Paused,
}

struct GateInner {
    phase: ResetPhase,
    admitted: u64,
    completed: u64,
}

/// Combined reset flag and admission/completion tallies.
pub(crate) struct PipelineGate {
    inner: Mutex<GateInner>,
    resumed: Condvar,
    settled: Condvar,
}

impl PipelineGate {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                phase: ResetPhase::Normal,
                admitted: 0,
                completed: 0,
            }),
            resumed: Condvar::new(),
            settled: Condvar::new(),
        }
    }

    /// Current phase.
    pub(crate) fn phase(&self) -> ResetPhase {
        self.inner.lock().phase
    }

    /// Reader-side admission of a payload byte: blocks while a reset is
    /// draining or paused, then records the admission - one critical
    /// section, so a reset claimed concurrently either sees the admission
    /// in its tally or keeps the byte out until resume.
    pub(crate) fn admit(&self) {
        let mut inner = self.inner.lock();
        while inner.phase != ResetPhase::Normal {
            self.resumed.wait(&mut inner);
        }
        inner.admitted += 1;
    }

    /// Admission of the end sentinel: never gated. A reset colliding with
    /// end-of-source must still let the sentinel propagate, so the reader
    /// enqueues it before honoring any pending pause.
    pub(crate) fn admit_final(&self) {
        self.inner.lock().admitted += 1;
    }

    /// Writer-side completion, recorded after the sink write (or after the
    /// end sentinel is consumed).
    pub(crate) fn complete(&self) {
        let mut inner = self.inner.lock();
        inner.completed += 1;
        debug_assert!(inner.completed <= inner.admitted);
        if inner.completed == inner.admitted {
            self.settled.notify_all();
        }
    }

    /// Tokens currently between admission and completion.
    pub(crate) fn in_transit(&self) -> u64 {
        let inner = self.inner.lock();
        inner.admitted - inner.completed
    }

    /// Claim the transition `Normal -> Draining`, waiting out any reset
    /// already in progress.
    pub(crate) fn begin_draining(&self) {
        let mut inner = self.inner.lock();
        while inner.phase != ResetPhase::Normal {
            self.resumed.wait(&mut inner);
        }
        inner.phase = ResetPhase::Draining;
    }

    /// Block until every admitted token has completed. Meaningful while
    /// admission is gated (or the source is exhausted): the tallies
    /// converge and stay converged.
    pub(crate) fn wait_settled(&self) {
        let mut inner = self.inner.lock();
        while inner.completed != inner.admitted {
            self.settled.wait(&mut inner);
        }
    }

    /// Transition `Draining -> Paused` once the drain has completed.
    pub(crate) fn mark_paused(&self) {
        let mut inner = self.inner.lock();
        debug_assert_eq!(inner.phase, ResetPhase::Draining);
        inner.phase = ResetPhase::Paused;
    }

    /// Transition back to `Normal` and wake the reader (and any queued
    /// reset requester).
    pub(crate) fn resume(&self) {
        let mut inner = self.inner.lock();
        inner.phase = ResetPhase::Normal;
        self.resumed.notify_all();
    }
}

/// Operator handle for the pause/drain/resume protocol.
///
/// Cloneable; reset requests may originate from any thread. Concurrent
/// requests serialize: a second `request_reset` waits until the first has
/// been resumed.
#[derive(Clone)]
pub struct ResetController {
    shared: Arc<PipelineShared>,
    counts: Arc<dyn TransferCounter>,
}

impl ResetController {
    pub(crate) fn new(shared: Arc<PipelineShared>, counts: Arc<dyn TransferCounter>) -> Self {
        Self { shared, counts }
    }

    /// Current reset phase.
    #[must_use]
    pub fn phase(&self) -> ResetPhase {
        self.shared.gate.phase()
    }

    /// Pause admission, block until the pipeline has fully drained, log the
    /// counts, and leave the pipeline `Paused`.
    ///
    /// A reset arriving at end-of-source still lets the end sentinel
    /// propagate: the sentinel is admitted ungated and counts toward the
    /// drain, so the wait completes once the writer has consumed it.
    pub fn request_reset(&self) {
        self.shared.gate.begin_draining();
        debug!("reset requested; draining {} in-transit tokens", self.shared.gate.in_transit());
        // The gate settling implies both queues are empty; the queue waits
        // are the formal barrier and return without blocking once settled.
        self.shared.gate.wait_settled();
        self.shared.input.wait_until_empty();
        self.shared.output.wait_until_empty();
        self.counts.log_counts();
        self.shared.gate.mark_paused();
        debug!("pipeline drained and paused");
    }

    /// Resume a paused pipeline: clear the flag and wake the reader.
    pub fn resume_after_reset(&self) {
        self.shared.gate.resume();
        debug!("pipeline resumed");
    }
}
