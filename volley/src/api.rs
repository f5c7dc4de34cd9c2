use std::net::SocketAddr;

use anyhow::Context as _;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use volley_core::{ConfigPatch, RequestExecutor, RunController, RunOverrides, RunStarted};

/// JSON error body: `{"status": "error", "message": ...}`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<volley_core::Error> for ApiError {
    fn from(err: volley_core::Error) -> Self {
        let status = if err.is_conflict() {
            StatusCode::CONFLICT
        } else if err.is_invalid_config() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, message = %self.message, "request failed");
        } else {
            tracing::warn!(status = %self.status, message = %self.message, "request rejected");
        }
        (
            self.status,
            Json(json!({ "status": "error", "message": self.message })),
        )
            .into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

pub fn router<E: RequestExecutor>(controller: RunController<E>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/config", get(get_config::<E>).post(update_config::<E>))
        .route("/start-test", post(start_test::<E>))
        .route("/run-test", post(run_test::<E>))
        .route("/status", get(status::<E>))
        .route("/health", get(health))
        .with_state(controller)
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "service": "volley load test service",
        "status": "running",
        "endpoints": {
            "/config": "GET/POST - View or update test configuration",
            "/start-test": "POST - Start a load test with current configuration",
            "/run-test": "POST - Run a test with specified duration and concurrency",
            "/status": "GET - Check test status and results",
            "/health": "GET - Liveness probe",
        }
    }))
}

async fn health() -> &'static str {
    "OK"
}

async fn get_config<E: RequestExecutor>(State(controller): State<RunController<E>>) -> Response {
    Json(controller.config()).into_response()
}

async fn update_config<E: RequestExecutor>(
    State(controller): State<RunController<E>>,
    body: Bytes,
) -> ApiResult {
    let map = match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(serde_json::Value::Object(map)) if !map.is_empty() => map,
        Ok(_) => return Err(ApiError::bad_request("Invalid JSON data")),
        Err(err) => return Err(ApiError::bad_request(format!("Invalid JSON data: {err}"))),
    };

    let updated = controller.update_config(ConfigPatch::from_json(map)?)?;
    if !updated.ignored.is_empty() {
        tracing::info!(ignored = ?updated.ignored, "ignored unknown config keys");
    }
    tracing::info!("config updated");

    Ok(Json(json!({
        "status": "success",
        "config": updated.config,
        "ignored": updated.ignored,
    }))
    .into_response())
}

async fn start_test<E: RequestExecutor>(State(controller): State<RunController<E>>) -> ApiResult {
    let started = controller.start(None)?;
    Ok(started_response(started))
}

async fn run_test<E: RequestExecutor>(
    State(controller): State<RunController<E>>,
    body: Bytes,
) -> ApiResult {
    let overrides = if body.iter().all(u8::is_ascii_whitespace) {
        RunOverrides::default()
    } else {
        match serde_json::from_slice::<serde_json::Value>(&body) {
            Ok(serde_json::Value::Null) => RunOverrides::default(),
            Ok(value) => serde_json::from_value::<RunOverrides>(value)
                .map_err(|err| ApiError::bad_request(format!("Invalid JSON data: {err}")))?,
            Err(err) => return Err(ApiError::bad_request(format!("Invalid JSON data: {err}"))),
        }
    };

    let started = controller.start(Some(ConfigPatch::from(overrides)))?;
    Ok(started_response(started))
}

fn started_response(started: RunStarted) -> Response {
    Json(json!({
        "status": "success",
        "message": "Test started",
        "run_id": started.run_id,
        "config": started.config,
    }))
    .into_response()
}

async fn status<E: RequestExecutor>(State(controller): State<RunController<E>>) -> Response {
    Json(controller.status()).into_response()
}

/// The control plane bound to a local address, served on a background task.
#[derive(Debug)]
pub struct ControlServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

impl ControlServer {
    pub async fn start<E: RequestExecutor>(
        bind_addr: SocketAddr,
        controller: RunController<E>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("failed to bind control plane: {bind_addr}"))?;
        let addr = listener
            .local_addr()
            .context("failed to resolve control plane address")?;

        let app = router(controller);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = serve.await {
                tracing::error!(error = %err, "control plane stopped");
            }
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        let _ = self.task.await;
    }
}
