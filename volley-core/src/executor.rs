use std::future::Future;
use std::time::{Duration, Instant};

use bytes::Bytes;
use volley_http::{HttpClient, HttpRequest, HttpTransportErrorKind};

use crate::config::{EndpointSpec, HttpMethod};

/// Why a request produced no status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeError {
    Transport(HttpTransportErrorKind),
    /// The worker caught a fault while processing the item.
    WorkerFault,
}

/// Result of one dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub status: Option<u16>,
    pub elapsed: Duration,
    pub error: Option<OutcomeError>,
}

impl Outcome {
    pub fn status(status: u16, elapsed: Duration) -> Self {
        Self {
            status: Some(status),
            elapsed,
            error: None,
        }
    }

    pub fn transport_error(kind: HttpTransportErrorKind, elapsed: Duration) -> Self {
        Self {
            status: None,
            elapsed,
            error: Some(OutcomeError::Transport(kind)),
        }
    }

    pub fn worker_fault(elapsed: Duration) -> Self {
        Self {
            status: None,
            elapsed,
            error: Some(OutcomeError::WorkerFault),
        }
    }

    /// Only an exact `200` counts; every other status, 2xx included, is a failure.
    pub fn is_success(&self) -> bool {
        self.status == Some(200)
    }

    /// Error bucket for failed outcomes, e.g. `http_status:503` or `http_error:timeout`.
    pub fn failure_cause(&self) -> Option<String> {
        if self.is_success() {
            return None;
        }
        Some(match (self.status, self.error) {
            (Some(status), _) => format!("http_status:{status}"),
            (None, Some(OutcomeError::Transport(kind))) => format!("http_error:{kind}"),
            (None, Some(OutcomeError::WorkerFault)) => "worker_fault".to_string(),
            (None, None) => "http_error:unknown".to_string(),
        })
    }
}

/// Issues one request for a dispatched endpoint.
///
/// Implementations must not fail: every problem is folded into the returned
/// [`Outcome`].
pub trait RequestExecutor: Send + Sync + 'static {
    fn execute(
        &self,
        endpoint: &EndpointSpec,
        base_url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Outcome> + Send;
}

#[derive(Debug, Clone, Default)]
pub struct HttpExecutor {
    client: HttpClient,
}

impl HttpExecutor {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

impl RequestExecutor for HttpExecutor {
    fn execute(
        &self,
        endpoint: &EndpointSpec,
        base_url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Outcome> + Send {
        let url = format!("{base_url}{}", endpoint.path);
        let method = endpoint.method;
        let req = match method {
            HttpMethod::Get => HttpRequest::get_owned(url.clone()),
            HttpMethod::Post => match &endpoint.body {
                Some(body) => {
                    let bytes = serde_json::to_vec(body).map(Bytes::from).unwrap_or_default();
                    HttpRequest::post_json(url.clone(), bytes)
                }
                None => HttpRequest::post_owned(url.clone(), Bytes::new()),
            },
        }
        .with_timeout(timeout);

        async move {
            let started = Instant::now();
            match self.client.request(req).await {
                Ok(res) => {
                    let elapsed = started.elapsed();
                    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
                    if res.status == 200 {
                        tracing::debug!(%method, %url, status = res.status, elapsed_ms, "request succeeded");
                    } else {
                        tracing::warn!(%method, %url, status = res.status, elapsed_ms, "request failed");
                    }
                    Outcome::status(res.status, elapsed)
                }
                Err(err) => {
                    let elapsed = started.elapsed();
                    tracing::warn!(
                        %method,
                        %url,
                        error = %err,
                        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                        "request error"
                    );
                    Outcome::transport_error(err.transport_error_kind(), elapsed)
                }
            }
        }
    }
}
