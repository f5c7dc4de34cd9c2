use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    let d = match unit_str.trim() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Duration::from_secs(value),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => Duration::from_millis(value),
        "m" | "min" | "mins" | "minute" | "minutes" => Duration::from_secs(
            value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?,
        ),
        "h" | "hr" | "hrs" | "hour" | "hours" => Duration::from_secs(
            value
                .checked_mul(60 * 60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?,
        ),
        _ => {
            return Err(format!(
                "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
            ));
        }
    };

    if d.is_zero() {
        return Err(format!("duration '{s}' must be greater than zero"));
    }
    Ok(d)
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    HumanReadable,
    /// Emit the run result as one JSON line on stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "volley",
    author,
    version,
    about = "HTTP load generator with a JSON control plane",
    long_about = "volley fires weighted or uniform traffic at an HTTP service for a fixed duration and reports success rates per endpoint.\n\nOnly an exact `200 OK` counts as a success.\n\n`volley serve` exposes the engine over HTTP (/config, /start-test, /run-test, /status, /health); `volley run` performs a single test from the command line.",
    after_help = "Examples:\n  volley serve --bind 0.0.0.0:8080 --api-url http://target-api:5000\n  volley run --api-url http://127.0.0.1:5000 --concurrency 20 --duration 10s\n  volley run --config volley.yaml --output json"
)]
pub struct Cli {
    /// Log filter directive (e.g. info, debug, volley_core=trace). Falls back to RUST_LOG, then `info`.
    #[arg(long, global = true, env = "VOLLEY_LOG")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP control plane
    #[command(
        long_about = "Start the HTTP control plane.\n\nPrints `CONTROL_URL=<url>` to stdout once listening and shuts down on Ctrl-C."
    )]
    Serve(ServeArgs),

    /// Run a single load test and print the result
    Run(RunArgs),
}

/// Settings shared by every subcommand that builds a run config.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// YAML or JSON file with run settings (`api_url`, `endpoints`, `concurrent_requests`, ...)
    #[arg(long, env = "VOLLEY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the service under test
    #[arg(long, env = "VOLLEY_API_URL")]
    pub api_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address the control plane listens on
    #[arg(long, env = "VOLLEY_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Number of concurrent workers
    #[arg(long, env = "VOLLEY_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Test duration (e.g. 10s, 250ms, 1m)
    #[arg(long, env = "VOLLEY_DURATION", value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Per-request timeout (e.g. 5s, 500ms)
    #[arg(long, env = "VOLLEY_TIMEOUT", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Pick endpoints uniformly instead of by weight
    #[arg(long)]
    pub uniform: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}
