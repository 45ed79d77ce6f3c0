//! Bounded worker pool
//!
//! A fixed number of worker tasks pull jobs from a shared queue, probe each one
//! and forward successes to the [`Aggregator`]. The queue is filled and closed
//! before the workers start, so a worker that sees end-of-queue can exit.

use super::aggregator::Aggregator;
use crate::network::ProbeOutcome;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};

/// One scan's worth of work
#[derive(Debug, Clone)]
pub struct ScanPlan<T> {
    pub targets: Vec<T>,
    pub concurrency: usize,
    pub timeout: Duration,
}

impl<T> ScanPlan<T> {
    pub fn new(targets: Vec<T>, concurrency: usize, timeout: Duration) -> Self {
        Self {
            targets,
            concurrency,
            timeout,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Fan-out/fan-in executor for probe jobs
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    result_buffer: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self { result_buffer: 10 }
    }
}

impl WorkerPool {
    /// `result_buffer` is the capacity of the worker -> aggregator channel
    pub fn new(result_buffer: usize) -> Self {
        Self {
            result_buffer: result_buffer.max(1),
        }
    }

    /// Probe every target of `plan` and collect the reachable results.
    ///
    /// Results come back deduplicated but unordered.
    pub async fn run<T, R, F, Fut>(&self, plan: ScanPlan<T>, probe: F) -> Vec<R>
    where
        T: Send + 'static,
        R: Eq + Hash + Clone + Send + 'static,
        F: Fn(T, Duration) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ProbeOutcome<R>> + Send + 'static,
    {
        let start_time = Instant::now();
        let job_count = plan.targets.len();
        let workers = plan.concurrency.max(1);
        let timeout = plan.timeout;

        // Pre-sized so filling it never waits on a worker
        let (job_tx, job_rx) = mpsc::channel::<T>(job_count.max(1));
        for target in plan.targets {
            if job_tx.send(target).await.is_err() {
                break;
            }
        }
        drop(job_tx);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let (result_tx, result_rx) = mpsc::channel::<R>(self.result_buffer);
        let aggregator = Aggregator::spawn(result_rx);

        let probe = Arc::new(probe);
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let probe = probe.clone();

            let handle = tokio::spawn(async move {
                loop {
                    // Lock is held only while taking the next job
                    let job = { jobs.lock().await.recv().await };
                    let Some(job) = job else {
                        break;
                    };

                    if let ProbeOutcome::Reachable(result) = probe(job, timeout).await {
                        if results.send(result).await.is_err() {
                            log::warn!("Worker {}: result channel closed early", worker_id);
                            break;
                        }
                    }
                }
            });

            handles.push(handle);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                log::error!("Scan worker failed: {}", e);
            }
        }

        // Last sender: the aggregator sees end-of-stream once this is gone
        drop(result_tx);
        let results = aggregator.finish().await;

        log::debug!(
            "Probed {} targets with {} workers in {:?}: {} reachable",
            job_count,
            workers,
            start_time.elapsed(),
            results.len()
        );

        results
    }
}
