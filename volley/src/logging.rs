use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. Events go to stderr so stdout
/// stays machine-readable (`CONTROL_URL=...`, JSON results).
///
/// An explicit `level` wins over `RUST_LOG`; with neither, `info` is used.
pub fn init(level: Option<&str>) -> anyhow::Result<()> {
    let filter = match level {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter `{directive}`"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install log subscriber: {err}"))
}
