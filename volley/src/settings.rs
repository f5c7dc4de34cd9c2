use std::path::Path;

use anyhow::Context as _;
use volley_core::RunConfig;

use crate::cli::{ConfigArgs, RunArgs};

/// Built-in defaults, then the config file, then CLI flags / env vars.
pub async fn resolve(args: &ConfigArgs) -> anyhow::Result<RunConfig> {
    let mut cfg = match &args.config {
        Some(path) => load_file(path).await?,
        None => RunConfig::default(),
    };

    if let Some(url) = &args.api_url {
        cfg.target_base_url = url.clone();
    }

    Ok(cfg)
}

pub async fn resolve_run(args: &RunArgs) -> anyhow::Result<RunConfig> {
    let mut cfg = resolve(&args.config).await?;

    if let Some(n) = args.concurrency {
        cfg.concurrency = n;
    }
    if let Some(d) = args.duration {
        cfg.duration = d;
    }
    if let Some(d) = args.timeout {
        cfg.per_request_timeout = d;
    }
    if args.uniform {
        cfg.use_weights = false;
    }

    Ok(cfg)
}

async fn load_file(path: &Path) -> anyhow::Result<RunConfig> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    parse(path, &raw)
}

fn parse(path: &Path, raw: &str) -> anyhow::Result<RunConfig> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(raw)
            .with_context(|| format!("invalid YAML config: {}", path.display())),
        "json" => serde_json::from_str(raw)
            .with_context(|| format!("invalid JSON config: {}", path.display())),
        other => anyhow::bail!(
            "unsupported config extension `{other}` (expected .yaml, .yml or .json): {}",
            path.display()
        ),
    }
}
