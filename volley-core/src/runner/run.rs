use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::pool::WorkerPool;
use super::queue::dispatch_queue;
use super::selector::Selector;
use super::stats::{RunResult, RunStats};
use crate::config::RunConfig;
use crate::error::Result;
use crate::executor::RequestExecutor;

/// Bounds of the random pause between two enqueues.
pub const JITTER_MIN: Duration = Duration::from_millis(1);
pub const JITTER_MAX: Duration = Duration::from_millis(20);

pub async fn run_load_test<E: RequestExecutor>(
    cfg: Arc<RunConfig>,
    executor: Arc<E>,
) -> Result<RunResult> {
    run_load_test_with_rng(cfg, executor, StdRng::from_entropy()).await
}

/// Runs one load test to completion.
///
/// The producer enqueues selected endpoints until `duration` has elapsed, then
/// sends one stop token per worker and waits for the pool to drain the queue.
pub async fn run_load_test_with_rng<E, R>(
    cfg: Arc<RunConfig>,
    executor: Arc<E>,
    mut rng: R,
) -> Result<RunResult>
where
    E: RequestExecutor,
    R: Rng + Send,
{
    cfg.validate()?;
    let selector = Selector::new(&cfg.endpoints, cfg.use_weights)?;

    let stats = Arc::new(RunStats::default());
    let (tx, rx) = dispatch_queue();
    let base_url: Arc<str> = Arc::from(cfg.target_base_url.as_str());

    tracing::info!(
        api_url = %cfg.target_base_url,
        endpoints = selector.endpoint_count(),
        concurrency = cfg.concurrency,
        duration_secs = cfg.duration.as_secs_f64(),
        use_weights = cfg.use_weights,
        "load test started"
    );

    let pool = WorkerPool::spawn(
        cfg.concurrency,
        rx,
        stats.clone(),
        executor,
        base_url,
        cfg.per_request_timeout,
    );

    let started = Instant::now();
    loop {
        let elapsed = started.elapsed();
        if elapsed >= cfg.duration {
            break;
        }

        if !tx.send(selector.select(&mut rng).clone()) {
            break;
        }

        let remaining = cfg.duration.saturating_sub(started.elapsed());
        let jitter = rng.gen_range(JITTER_MIN..=JITTER_MAX).min(remaining);
        if !jitter.is_zero() {
            tokio::time::sleep(jitter).await;
        }
    }

    let stop_tokens = tx.send_stop_tokens(pool.size());
    let report = pool.join().await?;
    let elapsed = started.elapsed();

    let result = RunResult {
        workers: report.workers_joined,
        stop_tokens,
        ..stats.snapshot(elapsed)
    };

    tracing::info!(
        total = result.total,
        success = result.success,
        failed = result.failed,
        success_rate = result.success_rate,
        requests_per_second = result.requests_per_second,
        elapsed_secs = elapsed.as_secs_f64(),
        worker_faults = report.faults,
        "load test completed"
    );

    Ok(result)
}
