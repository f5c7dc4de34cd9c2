use std::time::Duration;

use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn body_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: http::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Upper bound for the whole exchange: connect, response head and body.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: &str) -> Self {
        Self::get_owned(url.to_string())
    }

    pub fn get_owned(url: String) -> Self {
        Self {
            method: http::Method::GET,
            url,
            headers: Vec::new(),
            body: Bytes::new(),
            timeout: None,
        }
    }

    pub fn post(url: &str, body: Bytes) -> Self {
        Self::post_owned(url.to_string(), body)
    }

    pub fn post_owned(url: String, body: Bytes) -> Self {
        Self {
            method: http::Method::POST,
            url,
            headers: Vec::new(),
            body,
            timeout: None,
        }
    }

    /// POST with `content-type: application/json`.
    pub fn post_json(url: String, body: Bytes) -> Self {
        Self::post_owned(url, body).with_header("content-type", "application/json")
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
