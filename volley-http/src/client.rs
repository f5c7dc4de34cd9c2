use bytes::Bytes;
use http_body_util::{BodyExt as _, Full};
use hyper::Request;
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use super::{Error, HttpRequest, HttpResponse, Result};

#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl Default for HttpClient {
    fn default() -> Self {
        // The OS-level TCP connect timeout can be very long (tens of seconds), which can cause
        // short runs to appear “hung” when the target host is unreachable.
        Self::new(Some(Duration::from_secs(3)))
    }
}

impl HttpClient {
    #[must_use]
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false);
        http_connector.set_connect_timeout(connect_timeout);
        http_connector.set_nodelay(true);

        let https_connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let inner = Client::builder(TokioExecutor::new()).build(https_connector);

        Self { inner }
    }

    pub async fn request(&self, req: HttpRequest) -> Result<HttpResponse> {
        match req.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.send(req)).await {
                Ok(res) => res,
                Err(_) => Err(Error::Timeout(timeout)),
            },
            None => self.send(req).await,
        }
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request(HttpRequest::get(url)).await
    }

    async fn send(&self, req: HttpRequest) -> Result<HttpResponse> {
        let parsed = url::Url::parse(&req.url).map_err(|_| Error::InvalidUrl(req.url.clone()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::UnsupportedScheme(req.url));
        }

        let uri: hyper::Uri = req
            .url
            .parse()
            .map_err(|_| Error::InvalidUrl(req.url.clone()))?;

        let mut builder = Request::builder().method(req.method).uri(uri);
        for (k, v) in req.headers {
            let name = http::header::HeaderName::from_bytes(k.as_bytes())?;
            let value = http::header::HeaderValue::from_str(&v)?;
            builder = builder.header(name, value);
        }

        let req: Request<Full<Bytes>> = builder.body(Full::new(req.body))?;
        let res: hyper::Response<Incoming> = self.inner.request(req).await?;

        let (parts, body) = res.into_parts();
        let status = parts.status.as_u16();

        // Drain the body so the connection can go back to the pool.
        let body = body.collect().await?.to_bytes();

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::HttpTransportErrorKind;
    use std::time::Instant;

    #[tokio::test]
    async fn unreachable_host_fails_fast_with_connect_timeout() {
        let client = HttpClient::new(Some(Duration::from_millis(200)));
        let req = HttpRequest::get("http://192.0.2.1:81/");

        let started = Instant::now();
        let _err = client.request(req).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(
            elapsed < Duration::from_secs(2),
            "expected fast failure, elapsed={elapsed:?}"
        );
    }

    #[tokio::test]
    async fn request_timeout_bounds_the_whole_exchange() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let silent = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let client = HttpClient::new(Some(Duration::from_secs(30)));
        let req = HttpRequest::get_owned(format!("http://{addr}/"))
            .with_timeout(Duration::from_millis(150));

        let started = Instant::now();
        let err = client.request(req).await.unwrap_err();

        assert_eq!(err.transport_error_kind(), HttpTransportErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(2));
        silent.abort();
    }

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let client = HttpClient::default();

        let err = client.get("ftp://example.com/").await.unwrap_err();
        assert_eq!(
            err.transport_error_kind(),
            HttpTransportErrorKind::UnsupportedScheme
        );

        let err = client.get("not a url").await.unwrap_err();
        assert_eq!(err.transport_error_kind(), HttpTransportErrorKind::InvalidUrl);
    }
}
