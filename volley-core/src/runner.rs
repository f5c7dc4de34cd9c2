mod controller;
mod pool;
mod queue;
mod run;
mod selector;
mod stats;

pub use controller::{ConfigUpdated, RunController, RunStarted, RunState, StatusSnapshot};
pub use pool::{PoolReport, WorkerPool};
pub use queue::{WorkItem, WorkReceiver, WorkSender, dispatch_queue};
pub use run::{JITTER_MAX, JITTER_MIN, run_load_test, run_load_test_with_rng};
pub use selector::Selector;
pub use stats::{EndpointStats, LatencySummary, RunResult, RunStats};
