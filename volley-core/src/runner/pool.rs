use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::task::JoinHandle;

use super::queue::{WorkItem, WorkReceiver};
use super::stats::RunStats;
use crate::error::Result;
use crate::executor::{Outcome, RequestExecutor};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub workers_joined: usize,
    pub processed: u64,
    pub faults: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct WorkerReport {
    processed: u64,
    faults: u64,
}

/// Fixed set of workers draining one dispatch queue.
#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerReport>>,
}

impl WorkerPool {
    pub fn spawn<E: RequestExecutor>(
        size: usize,
        rx: WorkReceiver,
        stats: Arc<RunStats>,
        executor: Arc<E>,
        base_url: Arc<str>,
        timeout: Duration,
    ) -> Self {
        let handles = (0..size)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    rx.clone(),
                    stats.clone(),
                    executor.clone(),
                    base_url.clone(),
                    timeout,
                ))
            })
            .collect();

        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Waits for every worker to consume its stop token.
    pub async fn join(self) -> Result<PoolReport> {
        let mut report = PoolReport::default();
        for handle in self.handles {
            let worker = handle.await?;
            report.workers_joined += 1;
            report.processed += worker.processed;
            report.faults += worker.faults;
        }
        Ok(report)
    }
}

async fn worker_loop<E: RequestExecutor>(
    worker_id: usize,
    rx: WorkReceiver,
    stats: Arc<RunStats>,
    executor: Arc<E>,
    base_url: Arc<str>,
    timeout: Duration,
) -> WorkerReport {
    let mut report = WorkerReport::default();

    loop {
        let endpoint = match rx.recv().await {
            Some(WorkItem::Request(endpoint)) => endpoint,
            Some(WorkItem::Stop) | None => break,
        };

        let started = Instant::now();
        let outcome = match AssertUnwindSafe(executor.execute(&endpoint, &base_url, timeout))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                report.faults += 1;
                tracing::error!(
                    worker_id,
                    endpoint = %endpoint.key(),
                    error = %panic_message(panic.as_ref()),
                    "worker fault while processing request"
                );
                Outcome::worker_fault(started.elapsed())
            }
        };

        stats.record(&endpoint.key(), &outcome);
        report.processed += 1;
    }

    tracing::debug!(worker_id, processed = report.processed, "worker stopped");
    report
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
