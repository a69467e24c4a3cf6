//! Bounded worker pool
//!
//! A fixed number of tokio tasks drain one shared queue. Every item is
//! claimed by exactly one worker, probed once, and sent back over a single
//! result channel. `run` returns only after every worker has been joined.

use crate::{
    error::{AppError, Result},
    executor::Probe,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Bounded-concurrency executor
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
}

/// Items handed back by the pool plus what happened to them
#[derive(Debug)]
pub struct PoolOutcome<T> {
    /// Every input item, in completion order, unclaimed items last
    pub items: Vec<T>,
    pub stats: PoolStats,
}

/// Execution counters for one pool run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Worker tasks actually spawned
    pub workers: usize,
    /// Probe invocations started
    pub dispatched: usize,
    /// Probe invocations abandoned because of cancellation
    pub abandoned: usize,
    /// Items never claimed because of cancellation
    pub unclaimed: usize,
    /// Wall-clock time of the whole run
    pub elapsed: Duration,
}

impl PoolStats {
    /// Probe invocations that ran to completion
    pub fn completed(&self) -> usize {
        self.dispatched - self.abandoned
    }
}

impl WorkerPool {
    /// Create a pool with `workers` concurrent tasks (at least one)
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Configured worker count
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `probe` to every item and wait for all workers to finish.
    ///
    /// When `cancel` fires, workers stop claiming items and in-flight probes
    /// are dropped. Every input item is still returned.
    pub async fn run<T, P>(
        &self,
        items: Vec<T>,
        probe: Arc<P>,
        cancel: &CancellationToken,
    ) -> Result<PoolOutcome<T>>
    where
        T: Send + 'static,
        P: Probe<T> + ?Sized + 'static,
    {
        let start_time = Instant::now();
        let total = items.len();

        if total == 0 {
            return Ok(PoolOutcome {
                items,
                stats: PoolStats {
                    elapsed: start_time.elapsed(),
                    ..Default::default()
                },
            });
        }

        // Workers beyond the item count would only observe an empty queue
        let workers = self.workers.min(total);
        let queue = Arc::new(Mutex::new(VecDeque::from(items)));
        let dispatched = Arc::new(AtomicUsize::new(0));
        let abandoned = Arc::new(AtomicUsize::new(0));

        // Capacity equals the batch size, so sends never wait on the collector
        let (result_sender, mut result_receiver) = mpsc::channel::<T>(total);

        let mut tasks = Vec::with_capacity(workers);
        for _ in 0..workers {
            let queue = queue.clone();
            let probe = probe.clone();
            let cancel = cancel.clone();
            let sender = result_sender.clone();
            let dispatched = dispatched.clone();
            let abandoned = abandoned.clone();

            tasks.push(tokio::spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }

                    let next = queue.lock().await.pop_front();
                    let Some(mut item) = next else {
                        break;
                    };

                    dispatched.fetch_add(1, Ordering::Relaxed);
                    let finished = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => false,
                        _ = probe.probe(&mut item) => true,
                    };
                    if !finished {
                        abandoned.fetch_add(1, Ordering::Relaxed);
                    }

                    if sender.send(item).await.is_err() {
                        break;
                    }
                }
            }));
        }

        // Drop the original sender so the receiver ends with the last worker
        drop(result_sender);

        let mut collected = Vec::with_capacity(total);
        while let Some(item) = result_receiver.recv().await {
            collected.push(item);
        }

        // Completion barrier
        let mut panics = 0usize;
        for joined in join_all(tasks).await {
            if joined.is_err() {
                panics += 1;
            }
        }
        if panics > 0 {
            return Err(AppError::internal(format!(
                "{} of {} {} workers panicked",
                panics,
                workers,
                probe.name()
            )));
        }

        let leftover: Vec<T> = queue.lock().await.drain(..).collect();
        let unclaimed = leftover.len();
        collected.extend(leftover);

        debug_assert_eq!(collected.len(), total);

        Ok(PoolOutcome {
            items: collected,
            stats: PoolStats {
                workers,
                dispatched: dispatched.load(Ordering::Relaxed),
                abandoned: abandoned.load(Ordering::Relaxed),
                unclaimed,
                elapsed: start_time.elapsed(),
            },
        })
    }
}
