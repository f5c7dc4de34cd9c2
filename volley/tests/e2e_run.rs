use std::process::Command;

use anyhow::Context as _;
use volley_testserver::TestServer;

#[tokio::test]
async fn e2e_run_prints_json_result_with_default_endpoints() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let base_url = server.base_url().to_string();
    let exe = env!("CARGO_BIN_EXE_volley");

    let output = tokio::task::spawn_blocking(move || {
        Command::new(exe)
            .arg("run")
            .arg("--api-url")
            .arg(&base_url)
            .arg("--concurrency")
            .arg("4")
            .arg("--duration")
            .arg("1s")
            .arg("--output")
            .arg("json")
            .env("RUST_LOG", "error")
            .output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run volley binary")?;

    let server_seen = server.stats().requests_total();
    let submit_seen = server.stats().submit();
    server.shutdown().await;

    anyhow::ensure!(
        output.status.success(),
        "volley exited with {}\nstderr:\n{}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).context("stdout is not utf-8")?;
    let line = stdout
        .lines()
        .rfind(|l| l.trim_start().starts_with('{'))
        .context("no JSON line on stdout")?;
    let v: serde_json::Value = serde_json::from_str(line).context("parse result json")?;

    let total = v["total"].as_u64().context("missing total")?;
    anyhow::ensure!(total > 0, "expected requests, got {v}");
    anyhow::ensure!(total == server_seen, "engine counted {total}, server saw {server_seen}");
    anyhow::ensure!(v["workers"] == 4 && v["stop_tokens"] == 4);

    // `/submit` answers 201, which never counts as a success.
    let submit = &v["endpoint_stats"]["POST:/submit"];
    anyhow::ensure!(submit["total"].as_u64() == Some(submit_seen));
    anyhow::ensure!(submit["success"] == 0);
    anyhow::ensure!(v["endpoint_stats"]["GET:/"]["failed"] == 0);
    anyhow::ensure!(v["endpoint_stats"]["GET:/status"]["failed"] == 0);

    Ok(())
}

#[tokio::test]
async fn e2e_run_human_readable_summary() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let base_url = server.base_url().to_string();
    let exe = env!("CARGO_BIN_EXE_volley");

    let tmp = tempfile::tempdir().context("create tempdir")?;
    let cfg_path = tmp.path().join("volley.yaml");
    tokio::fs::write(
        &cfg_path,
        format!("api_url: {base_url}\nendpoints:\n  - path: /status\n    weight: 2\n"),
    )
    .await
    .context("write config")?;

    let output = tokio::task::spawn_blocking(move || {
        Command::new(exe)
            .arg("run")
            .arg("--config")
            .arg(&cfg_path)
            .arg("--concurrency")
            .arg("2")
            .arg("--duration")
            .arg("500ms")
            .env("RUST_LOG", "error")
            .output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run volley binary")?;

    server.shutdown().await;

    anyhow::ensure!(output.status.success(), "volley exited with {}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::ensure!(stdout.contains("success_rate: 100.00%"), "stdout:\n{stdout}");
    anyhow::ensure!(stdout.contains("GET:/status"), "stdout:\n{stdout}");
    anyhow::ensure!(!stdout.contains("POST:/submit"), "stdout:\n{stdout}");

    Ok(())
}
