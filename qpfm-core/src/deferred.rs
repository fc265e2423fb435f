//! Background emergent detection for [`InsightDelivery::Deferred`](crate::InsightDelivery).
//!
//! One long-lived worker thread drains a bounded job queue. Queries only
//! push a job and return; when the queue is full the pass is skipped rather
//! than blocking the query. Finished insights collect in a capped buffer
//! that callers drain with [`DeferredDetector::drain`].

use crate::emergence::{EmergenceContext, EmergentBehaviorEngine};
use crate::error::{QpfmError, Result};
use crate::metrics::PerformanceTracker;
use crate::superposition::MemoryState;
use crate::types::EmergentInsight;
use crossbeam_queue::ArrayQueue;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, Thread};
use std::time::Duration;

/// Detection passes waiting for the worker before new ones are skipped.
pub const DETECTION_QUEUE_CAPACITY: usize = 64;

/// Deferred insights held before the oldest are dropped.
pub const DEFERRED_INSIGHT_CAPACITY: usize = 256;

/// Longest the worker sleeps between queue checks when it missed a wake-up.
const IDLE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug)]
struct DetectionJob {
    state: MemoryState,
    context: EmergenceContext,
}

#[derive(Debug)]
struct Shared {
    jobs: ArrayQueue<DetectionJob>,
    insights: Mutex<VecDeque<EmergentInsight>>,
    /// Jobs accepted but not yet finished
    pending: Mutex<usize>,
    settled: Condvar,
    shutdown: AtomicBool,
    emergence: Arc<EmergentBehaviorEngine>,
    metrics: Arc<PerformanceTracker>,
}

impl Shared {
    fn run(&self) {
        loop {
            if let Some(job) = self.jobs.pop() {
                self.process(job);
                continue;
            }
            if self.shutdown.load(Ordering::Acquire) {
                tracing::debug!("emergence worker shutting down");
                break;
            }
            std::thread::park_timeout(IDLE_POLL);
        }
    }

    fn process(&self, job: DetectionJob) {
        let report = self.emergence.detect(&job.state, &job.context, None);
        self.metrics.record_insights(report.insights.len());
        {
            let mut insights = self.insights.lock();
            insights.extend(report.insights);
            let overflow = insights.len().saturating_sub(DEFERRED_INSIGHT_CAPACITY);
            if overflow > 0 {
                insights.drain(..overflow);
                tracing::warn!(dropped = overflow, "deferred insight buffer full, dropped oldest");
            }
        }
        self.finish_one();
    }

    fn finish_one(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.settled.notify_all();
        }
    }
}

/// Handle to the background detection worker. Dropping it stops the worker
/// after the queued jobs are processed.
#[derive(Debug)]
pub struct DeferredDetector {
    shared: Arc<Shared>,
    thread: Thread,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DeferredDetector {
    /// Start the worker thread.
    pub fn start(
        emergence: Arc<EmergentBehaviorEngine>,
        metrics: Arc<PerformanceTracker>,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            jobs: ArrayQueue::new(DETECTION_QUEUE_CAPACITY),
            insights: Mutex::new(VecDeque::new()),
            pending: Mutex::new(0),
            settled: Condvar::new(),
            shutdown: AtomicBool::new(false),
            emergence,
            metrics,
        });
        let worker = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("qpfm-emergence".to_string())
            .spawn(move || worker.run())
            .map_err(|error| {
                QpfmError::configuration(format!("could not start the emergence worker: {error}"))
            })?;
        Ok(Self {
            shared,
            thread: handle.thread().clone(),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Queue a detection pass. Returns `false` when the queue is full and the pass was skipped.
    pub fn submit(&self, state: MemoryState, context: EmergenceContext) -> bool {
        *self.shared.pending.lock() += 1;
        if self.shared.jobs.push(DetectionJob { state, context }).is_err() {
            self.shared.finish_one();
            tracing::warn!(
                capacity = DETECTION_QUEUE_CAPACITY,
                "emergence queue full, skipping detection pass"
            );
            return false;
        }
        self.thread.unpark();
        true
    }

    /// Jobs accepted and not yet processed.
    #[must_use]
    pub fn pending(&self) -> usize {
        *self.shared.pending.lock()
    }

    /// Wait for every queued pass, then take the buffered insights.
    pub fn drain(&self) -> Vec<EmergentInsight> {
        {
            let mut pending = self.shared.pending.lock();
            while *pending > 0 {
                self.thread.unpark();
                self.shared.settled.wait_for(&mut pending, IDLE_POLL);
            }
        }
        self.shared.insights.lock().drain(..).collect()
    }
}

impl Drop for DeferredDetector {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.thread.unpark();
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                tracing::error!("emergence worker panicked");
            }
        }
    }
}
