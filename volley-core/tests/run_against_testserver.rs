use std::time::Duration;

use anyhow::Context as _;
use volley_core::{EndpointSpec, HttpExecutor, RunConfig, RunController, RunState};
use volley_http::HttpClient;
use volley_testserver::TestServer;

fn config(base_url: &str, endpoints: Vec<EndpointSpec>) -> RunConfig {
    RunConfig {
        target_base_url: base_url.to_string(),
        endpoints,
        concurrency: 5,
        duration: Duration::from_secs(1),
        per_request_timeout: Duration::from_secs(1),
        use_weights: true,
    }
}

#[tokio::test]
async fn always_200_endpoint_reaches_full_success_rate() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let controller = RunController::new(
        config(server.base_url(), vec![EndpointSpec::get("/").with_weight(10)]),
        HttpExecutor::default(),
    );

    controller.start(None).context("start run")?;
    let result = controller
        .wait_for_completion()
        .await
        .context("run produced no result")?;

    let server_seen = server.stats().index();
    server.shutdown().await;

    anyhow::ensure!(controller.state() == RunState::Completed);
    anyhow::ensure!(result.total > 0, "expected requests, got {result:?}");
    anyhow::ensure!(result.failed == 0, "unexpected failures: {:?}", result.errors);
    anyhow::ensure!(result.success_rate == 100.0);
    anyhow::ensure!(result.workers == 5 && result.stop_tokens == 5);
    anyhow::ensure!(
        server_seen == result.total,
        "server saw {server_seen}, engine counted {}",
        result.total
    );

    Ok(())
}

#[tokio::test]
async fn unreachable_target_fails_every_request() -> anyhow::Result<()> {
    // Reserved TEST-NET address; nothing answers there.
    let mut cfg = config("http://192.0.2.1:81", vec![EndpointSpec::get("/")]);
    cfg.duration = Duration::from_millis(300);
    cfg.per_request_timeout = Duration::from_millis(200);

    let executor = HttpExecutor::new(HttpClient::new(Some(Duration::from_millis(100))));
    let controller = RunController::new(cfg, executor);

    controller.start(None).context("start run")?;
    let result = controller
        .wait_for_completion()
        .await
        .context("run produced no result")?;

    anyhow::ensure!(result.total > 0);
    anyhow::ensure!(result.success == 0);
    anyhow::ensure!(result.failed == result.total);
    anyhow::ensure!(result.success_rate == 0.0);
    anyhow::ensure!(
        result.errors.keys().all(|k| k.starts_with("http_error:")),
        "unexpected error buckets: {:?}",
        result.errors
    );

    Ok(())
}

#[tokio::test]
async fn created_status_is_counted_as_failure() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let mut cfg = config(
        server.base_url(),
        vec![
            EndpointSpec::get("/status").with_weight(1),
            EndpointSpec::post(
                "/submit",
                Some(serde_json::json!({ "name": "John Doe", "email": "john@example.com" })),
            )
            .with_weight(1),
        ],
    );
    cfg.duration = Duration::from_millis(500);

    let controller = RunController::new(cfg, HttpExecutor::default());
    controller.start(None).context("start run")?;
    let result = controller
        .wait_for_completion()
        .await
        .context("run produced no result")?;

    let json_bodies = server.stats().submit_json_bodies();
    server.shutdown().await;

    let submit = result
        .endpoint_stats
        .iter()
        .find(|(k, _)| k.to_string() == "POST:/submit")
        .map(|(_, s)| s.clone())
        .context("no stats for POST:/submit")?;
    let status = result
        .endpoint_stats
        .iter()
        .find(|(k, _)| k.to_string() == "GET:/status")
        .map(|(_, s)| s.clone())
        .context("no stats for GET:/status")?;

    anyhow::ensure!(submit.total > 0 && submit.success == 0 && submit.failed == submit.total);
    anyhow::ensure!(status.failed == 0 && status.success == status.total);
    anyhow::ensure!(json_bodies == submit.total, "POST bodies were not JSON");
    anyhow::ensure!(result.errors.get("http_status:201") == Some(&submit.total));

    let total: u64 = result.endpoint_stats.values().map(|s| s.total).sum();
    anyhow::ensure!(total == result.total);

    Ok(())
}

#[tokio::test]
async fn failing_and_slow_endpoints_are_bucketed() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let mut cfg = config(
        server.base_url(),
        vec![EndpointSpec::get("/fail"), EndpointSpec::get("/slow")],
    );
    cfg.duration = Duration::from_millis(400);
    cfg.per_request_timeout = Duration::from_millis(100);
    cfg.use_weights = false;

    let controller = RunController::new(cfg, HttpExecutor::default());
    controller.start(None).context("start run")?;
    let result = controller
        .wait_for_completion()
        .await
        .context("run produced no result")?;
    server.shutdown().await;

    anyhow::ensure!(result.success == 0);
    anyhow::ensure!(result.errors.contains_key("http_status:503"), "{:?}", result.errors);
    anyhow::ensure!(result.errors.contains_key("http_error:timeout"), "{:?}", result.errors);

    Ok(())
}
