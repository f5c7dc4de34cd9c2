use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::config::EndpointSpec;

#[derive(Debug, Clone)]
pub enum WorkItem {
    Request(Arc<EndpointSpec>),
    Stop,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    stops: AtomicU64,
}

/// Unbounded FIFO connecting the producer to the worker pool.
///
/// Every worker must receive exactly one [`WorkItem::Stop`]; a worker exits on
/// the first one it sees, so enqueueing one per worker after the last request
/// drains the queue before the pool shuts down.
pub fn dispatch_queue() -> (WorkSender, WorkReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let counters = Arc::new(Counters::default());
    (
        WorkSender {
            tx,
            counters: counters.clone(),
        },
        WorkReceiver {
            rx: Arc::new(Mutex::new(rx)),
            counters,
        },
    )
}

#[derive(Debug, Clone)]
pub struct WorkSender {
    tx: mpsc::UnboundedSender<WorkItem>,
    counters: Arc<Counters>,
}

impl WorkSender {
    /// Returns `false` once every receiver is gone.
    pub fn send(&self, endpoint: Arc<EndpointSpec>) -> bool {
        if self.tx.send(WorkItem::Request(endpoint)).is_err() {
            return false;
        }
        self.counters.requests.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Enqueues `n` stop tokens and returns how many were accepted.
    pub fn send_stop_tokens(&self, n: usize) -> u64 {
        let mut sent = 0u64;
        for _ in 0..n {
            if self.tx.send(WorkItem::Stop).is_err() {
                break;
            }
            sent += 1;
        }
        self.counters.stops.fetch_add(sent, Ordering::Relaxed);
        sent
    }

    pub fn requests_sent(&self) -> u64 {
        self.counters.requests.load(Ordering::Relaxed)
    }

    pub fn stop_tokens_sent(&self) -> u64 {
        self.counters.stops.load(Ordering::Relaxed)
    }
}

/// Shared consumer side. Clones hand out items from the same queue.
#[derive(Debug, Clone)]
pub struct WorkReceiver {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<WorkItem>>>,
    counters: Arc<Counters>,
}

impl WorkReceiver {
    /// Waits for the next item. `None` means the queue is closed and drained.
    pub async fn recv(&self) -> Option<WorkItem> {
        self.rx.lock().await.recv().await
    }

    pub fn stop_tokens_sent(&self) -> u64 {
        self.counters.stops.load(Ordering::Relaxed)
    }
}
