use std::fmt::Write as _;
use std::time::Duration;

use volley_core::{LatencySummary, RunConfig, RunResult};

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput;

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, config: &RunConfig) {
        print!("{}", render_header(config));
    }

    fn print_summary(&self, result: &RunResult) -> anyhow::Result<()> {
        print!("{}", render_summary(result));
        Ok(())
    }
}

fn render_header(config: &RunConfig) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "running {} against {} with {} workers (timeout {}, {} selection)",
        humantime::format_duration(config.duration),
        config.target_base_url,
        config.concurrency,
        humantime::format_duration(config.per_request_timeout),
        if config.use_weights { "weighted" } else { "uniform" },
    )
    .ok();
    for ep in &config.endpoints {
        if config.use_weights {
            writeln!(out, "  {} (weight {})", ep.key(), ep.weight).ok();
        } else {
            writeln!(out, "  {}", ep.key()).ok();
        }
    }
    out.push('\n');
    out
}

fn render_summary(result: &RunResult) -> String {
    let mut out = String::new();

    out.push_str("summary\n");
    writeln!(
        out,
        "  requests: {} (success {}, failed {})",
        result.total, result.success, result.failed
    )
    .ok();
    writeln!(out, "  success_rate: {:.2}%", result.success_rate).ok();
    writeln!(out, "  duration: {}", format_elapsed(result.elapsed)).ok();
    writeln!(out, "  req/s: {:.2}", result.requests_per_second).ok();
    writeln!(
        out,
        "  workers: {} (stop tokens {})",
        result.workers, result.stop_tokens
    )
    .ok();

    match &result.latency {
        Some(l) => render_latency(l, &mut out),
        None => out.push_str("  latency: n/a\n"),
    }

    if !result.endpoint_stats.is_empty() {
        out.push_str("\nendpoints\n");
        let width = result
            .endpoint_stats
            .keys()
            .map(|k| k.to_string().len())
            .max()
            .unwrap_or(0);
        for (key, s) in &result.endpoint_stats {
            writeln!(
                out,
                "  {:<width$}  total={} success={} failed={} success_rate={:.2}%",
                key.to_string(),
                s.total,
                s.success,
                s.failed,
                s.success_rate,
            )
            .ok();
        }
    }

    if !result.errors.is_empty() {
        out.push_str("\nerrors\n");
        let mut errors: Vec<_> = result.errors.iter().collect();
        errors.sort_by(|(a_name, a_count), (b_name, b_count)| {
            b_count.cmp(a_count).then_with(|| a_name.cmp(b_name))
        });
        for (name, count) in errors {
            writeln!(out, "  {name}: {count}").ok();
        }
    }

    out
}

fn render_latency(l: &LatencySummary, out: &mut String) {
    writeln!(
        out,
        "  latency = p50={} p90={} p95={} p99={} mean={} max={}",
        format_ms(l.p50_ms),
        format_ms(l.p90_ms),
        format_ms(l.p95_ms),
        format_ms(l.p99_ms),
        format_ms(l.mean_ms),
        format_ms(l.max_ms),
    )
    .ok();
}

fn format_ms(ms: f64) -> String {
    if !ms.is_finite() {
        return "n/a".to_string();
    }
    if ms >= 1000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else {
        format!("{ms:.2}ms")
    }
}

fn format_elapsed(d: Duration) -> String {
    let ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
    humantime::format_duration(Duration::from_millis(ms)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use volley_core::{EndpointKey, EndpointStats, HttpMethod};

    fn result() -> RunResult {
        let mut endpoint_stats = BTreeMap::new();
        endpoint_stats.insert(
            EndpointKey::new(HttpMethod::Get, "/"),
            EndpointStats {
                total: 8,
                success: 8,
                failed: 0,
                success_rate: 100.0,
            },
        );
        endpoint_stats.insert(
            EndpointKey::new(HttpMethod::Post, "/submit"),
            EndpointStats {
                total: 2,
                success: 0,
                failed: 2,
                success_rate: 0.0,
            },
        );

        let mut errors = BTreeMap::new();
        errors.insert("http_status:201".to_string(), 2);

        RunResult {
            total: 10,
            success: 8,
            failed: 2,
            elapsed: Duration::from_millis(2_004),
            requests_per_second: 4.99,
            success_rate: 80.0,
            endpoint_stats,
            latency: Some(LatencySummary {
                mean_ms: 3.5,
                p50_ms: 3.0,
                p90_ms: 5.0,
                p95_ms: 6.0,
                p99_ms: 9.0,
                max_ms: 1500.0,
            }),
            errors,
            workers: 4,
            stop_tokens: 4,
        }
    }

    #[test]
    fn summary_lists_totals_endpoints_and_errors() {
        let text = render_summary(&result());
        assert!(text.contains("requests: 10 (success 8, failed 2)"), "{text}");
        assert!(text.contains("success_rate: 80.00%"), "{text}");
        assert!(text.contains("duration: 2s 4ms"), "{text}");
        assert!(text.contains("max=1.50s"), "{text}");
        assert!(text.contains("POST:/submit  total=2 success=0 failed=2"), "{text}");
        assert!(text.contains("http_status:201: 2"), "{text}");
    }

    #[test]
    fn header_shows_weights_only_when_weighting() {
        let cfg = RunConfig::default();
        let weighted = render_header(&cfg);
        assert!(weighted.contains("GET:/status (weight 5)"), "{weighted}");

        let uniform = render_header(&RunConfig {
            use_weights: false,
            ..cfg
        });
        assert!(uniform.contains("uniform selection"), "{uniform}");
        assert!(!uniform.contains("weight 5"), "{uniform}");
    }
}
