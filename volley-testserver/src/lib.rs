use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_INDEX: &str = "/";
pub const PATH_STATUS: &str = "/status";
pub const PATH_SUBMIT: &str = "/submit";
pub const PATH_METRICS: &str = "/metrics";
pub const PATH_SLOW: &str = "/slow";
pub const PATH_FAIL: &str = "/fail";

/// How long `/slow` sleeps before answering.
pub const SLOW_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    index: Arc<AtomicU64>,
    status: Arc<AtomicU64>,
    submit: Arc<AtomicU64>,
    slow: Arc<AtomicU64>,
    fail: Arc<AtomicU64>,
    submit_json_bodies: Arc<AtomicU64>,
}

impl TestServerStats {
    pub fn requests_total(&self) -> u64 {
        self.index() + self.status() + self.submit() + self.slow() + self.fail()
    }

    pub fn index(&self) -> u64 {
        self.index.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> u64 {
        self.status.load(Ordering::Relaxed)
    }

    pub fn submit(&self) -> u64 {
        self.submit.load(Ordering::Relaxed)
    }

    pub fn slow(&self) -> u64 {
        self.slow.load(Ordering::Relaxed)
    }

    pub fn fail(&self) -> u64 {
        self.fail.load(Ordering::Relaxed)
    }

    /// `/submit` calls whose body parsed as a JSON object.
    pub fn submit_json_bodies(&self) -> u64 {
        self.submit_json_bodies.load(Ordering::Relaxed)
    }

    fn render_prometheus(&self) -> String {
        let series = [
            ("GET", PATH_INDEX, self.index()),
            ("GET", PATH_STATUS, self.status()),
            ("POST", PATH_SUBMIT, self.submit()),
            ("GET", PATH_SLOW, self.slow()),
            ("GET", PATH_FAIL, self.fail()),
        ];

        let mut out = String::new();
        out.push_str("# HELP http_requests_total Total requests served.\n");
        out.push_str("# TYPE http_requests_total counter\n");
        for (method, endpoint, value) in series {
            let _ = writeln!(
                out,
                "http_requests_total{{method=\"{method}\",endpoint=\"{endpoint}\"}} {value}"
            );
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct TestServerUrls {
    pub base_url: String,
    pub status: String,
    pub submit: String,
    pub metrics: String,
    pub slow: String,
    pub fail: String,
}

impl TestServerUrls {
    pub fn new(base_url: String) -> Self {
        Self {
            status: format!("{base_url}{PATH_STATUS}"),
            submit: format!("{base_url}{PATH_SUBMIT}"),
            metrics: format!("{base_url}{PATH_METRICS}"),
            slow: format!("{base_url}{PATH_SLOW}"),
            fail: format!("{base_url}{PATH_FAIL}"),
            base_url,
        }
    }
}

async fn handle_index(State(stats): State<TestServerStats>) -> &'static str {
    stats.index.fetch_add(1, Ordering::Relaxed);
    "Hello, World!"
}

async fn handle_status(State(stats): State<TestServerStats>) -> impl IntoResponse {
    stats.status.fetch_add(1, Ordering::Relaxed);
    (
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"status":"OK","message":"service running"}"#,
    )
}

async fn handle_submit(State(stats): State<TestServerStats>, body: Bytes) -> impl IntoResponse {
    stats.submit.fetch_add(1, Ordering::Relaxed);

    let data: serde_json::Value = if body.is_empty() {
        serde_json::Value::Null
    } else {
        match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(_) => return (StatusCode::BAD_REQUEST, "bad json".to_string()),
        }
    };
    if data.is_object() {
        stats.submit_json_bodies.fetch_add(1, Ordering::Relaxed);
    }

    let res = serde_json::json!({ "message": "data received", "data": data });
    (StatusCode::CREATED, res.to_string())
}

async fn handle_metrics(State(stats): State<TestServerStats>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        stats.render_prometheus(),
    )
}

async fn handle_slow(State(stats): State<TestServerStats>) -> &'static str {
    stats.slow.fetch_add(1, Ordering::Relaxed);
    sleep(SLOW_DELAY).await;
    "slow"
}

async fn handle_fail(State(stats): State<TestServerStats>) -> StatusCode {
    stats.fail.fetch_add(1, Ordering::Relaxed);
    StatusCode::SERVICE_UNAVAILABLE
}

pub fn router(stats: TestServerStats) -> Router {
    Router::new()
        .route(PATH_INDEX, get(handle_index))
        .route(PATH_STATUS, get(handle_status))
        .route(PATH_SUBMIT, post(handle_submit))
        .route(PATH_METRICS, get(handle_metrics))
        .route(PATH_SLOW, get(handle_slow))
        .route(PATH_FAIL, get(handle_fail))
        .with_state(stats)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    urls: TestServerUrls,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();

        let app = router(stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        let base_url = format!("http://{addr}");
        let urls = TestServerUrls::new(base_url.clone());

        Ok(Self {
            addr,
            base_url,
            urls,
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn urls(&self) -> &TestServerUrls {
        &self.urls
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
