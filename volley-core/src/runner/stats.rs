use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use hdrhistogram::Histogram;
use serde::{Serialize, Serializer};

use crate::config::EndpointKey;
use crate::executor::Outcome;

#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    success: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn record(&self, success: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn load(&self) -> (u64, u64, u64) {
        (
            self.total.load(Ordering::Relaxed),
            self.success.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointStats {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

/// Outcome of one completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub total: u64,
    pub success: u64,
    pub failed: u64,

    #[serde(rename = "total_time", serialize_with = "serialize_elapsed")]
    pub elapsed: Duration,

    pub requests_per_second: f64,

    /// Percentage of requests answered with exactly `200`.
    pub success_rate: f64,

    pub endpoint_stats: BTreeMap<EndpointKey, EndpointStats>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencySummary>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, u64>,

    pub workers: usize,
    pub stop_tokens: u64,
}

fn serialize_elapsed<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round2(d.as_secs_f64()))
}

/// Run-scoped aggregator shared by every worker.
#[derive(Debug)]
pub struct RunStats {
    overall: Counters,
    by_endpoint: DashMap<EndpointKey, Counters>,
    errors: DashMap<String, AtomicU64>,
    latency_us: Mutex<Histogram<u64>>,
}

impl Default for RunStats {
    fn default() -> Self {
        // Up to one hour in microseconds, 3 significant figures.
        let latency_us = Histogram::<u64>::new_with_bounds(1, 3_600_000_000, 3)
            .unwrap_or_else(|err| panic!("failed to init histogram: {err}"));

        Self {
            overall: Counters::default(),
            by_endpoint: DashMap::new(),
            errors: DashMap::new(),
            latency_us: Mutex::new(latency_us),
        }
    }
}

impl RunStats {
    pub fn record(&self, key: &EndpointKey, outcome: &Outcome) {
        let success = outcome.is_success();
        self.overall.record(success);

        if let Some(counters) = self.by_endpoint.get(key) {
            counters.record(success);
        } else {
            self.by_endpoint
                .entry(key.clone())
                .or_default()
                .record(success);
        }

        if let Some(cause) = outcome.failure_cause() {
            if let Some(n) = self.errors.get(&cause) {
                n.fetch_add(1, Ordering::Relaxed);
            } else {
                self.errors
                    .entry(cause)
                    .or_default()
                    .fetch_add(1, Ordering::Relaxed);
            }
        }

        let us = u64::try_from(outcome.elapsed.as_micros()).unwrap_or(u64::MAX);
        let mut h = self
            .latency_us
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        h.saturating_record(us);
    }

    pub fn total(&self) -> u64 {
        self.overall.total.load(Ordering::Relaxed)
    }

    /// Freezes the counters into a [`RunResult`]. `workers` and `stop_tokens`
    /// are left at zero for the caller to fill in.
    pub fn snapshot(&self, elapsed: Duration) -> RunResult {
        let (total, success, failed) = self.overall.load();

        let endpoint_stats = self
            .by_endpoint
            .iter()
            .map(|entry| {
                let (total, success, failed) = entry.value().load();
                (
                    entry.key().clone(),
                    EndpointStats {
                        total,
                        success,
                        failed,
                        success_rate: percent(success, total),
                    },
                )
            })
            .collect();

        let errors = self
            .errors
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();

        let secs = elapsed.as_secs_f64();
        let requests_per_second = if secs > 0.0 {
            round2(total as f64 / secs)
        } else {
            0.0
        };

        RunResult {
            total,
            success,
            failed,
            elapsed,
            requests_per_second,
            success_rate: percent(success, total),
            endpoint_stats,
            latency: self.latency_summary(),
            errors,
            workers: 0,
            stop_tokens: 0,
        }
    }

    fn latency_summary(&self) -> Option<LatencySummary> {
        let h = self
            .latency_us
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        #[allow(clippy::len_zero)]
        if h.len() == 0 {
            return None;
        }

        let ms = |us: u64| round3(us as f64 / 1000.0);
        Some(LatencySummary {
            mean_ms: round3(h.mean() / 1000.0),
            p50_ms: ms(h.value_at_quantile(0.50)),
            p90_ms: ms(h.value_at_quantile(0.90)),
            p95_ms: ms(h.value_at_quantile(0.95)),
            p99_ms: ms(h.value_at_quantile(0.99)),
            max_ms: ms(h.max()),
        })
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 * 100.0 / whole as f64)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
