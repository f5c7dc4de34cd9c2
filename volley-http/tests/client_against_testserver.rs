use std::time::Duration;

use anyhow::Context as _;
use bytes::Bytes;
use volley_http::{HttpClient, HttpRequest, HttpTransportErrorKind};
use volley_testserver::{SLOW_DELAY, TestServer};

#[tokio::test]
async fn statuses_and_bodies_come_back_verbatim() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let urls = server.urls().clone();
    let client = HttpClient::default();

    let res = client.get(&urls.base_url).await.context("GET /")?;
    anyhow::ensure!(res.status == 200);
    anyhow::ensure!(res.body_utf8() == Some("Hello, World!"));

    let res = client.get(&urls.status).await.context("GET /status")?;
    let v: serde_json::Value = serde_json::from_slice(&res.body).context("parse /status")?;
    anyhow::ensure!(res.status == 200 && v["status"] == "OK");

    let res = client.get(&urls.fail).await.context("GET /fail")?;
    anyhow::ensure!(res.status == 503);

    let metrics = client.get(&urls.metrics).await.context("GET /metrics")?;
    let text = metrics.body_utf8().unwrap_or_default();
    anyhow::ensure!(
        text.contains(r#"http_requests_total{method="GET",endpoint="/fail"} 1"#),
        "{text}"
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn json_post_reaches_the_server_as_json() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let client = HttpClient::default();

    let res = client
        .request(HttpRequest::post_json(
            server.urls().submit.clone(),
            Bytes::from_static(br#"{"name":"John Doe"}"#),
        ))
        .await
        .context("POST /submit")?;
    anyhow::ensure!(res.status == 201);
    let v: serde_json::Value = serde_json::from_slice(&res.body).context("parse /submit")?;
    anyhow::ensure!(v["data"]["name"] == "John Doe");

    // A JSON array is accepted but is not counted as an object body.
    let res = client
        .request(
            HttpRequest::post(&server.urls().submit, Bytes::from_static(b"[1, 2]"))
                .with_header("content-type", "text/plain"),
        )
        .await
        .context("POST /submit as text")?;
    anyhow::ensure!(res.status == 201);

    anyhow::ensure!(server.stats().submit() == 2);
    anyhow::ensure!(server.stats().submit_json_bodies() == 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn request_timeout_cuts_slow_responses() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let client = HttpClient::default();

    let req = HttpRequest::get(&server.urls().slow).with_timeout(SLOW_DELAY / 5);
    let err = client.request(req).await.err().context("expected a timeout")?;
    anyhow::ensure!(err.transport_error_kind() == HttpTransportErrorKind::Timeout);

    let req = HttpRequest::get(&server.urls().slow).with_timeout(SLOW_DELAY + Duration::from_secs(2));
    let res = client.request(req).await.context("GET /slow")?;
    anyhow::ensure!(res.status == 200);
    anyhow::ensure!(server.stats().slow() >= 1);

    server.shutdown().await;
    Ok(())
}
