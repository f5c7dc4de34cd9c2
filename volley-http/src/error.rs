use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum HttpTransportErrorKind {
    InvalidUrl,
    UnsupportedScheme,
    RequestBuild,
    HeaderName,
    HeaderValue,
    Connect,
    Request,
    Timeout,
    BodyRead,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("only http:// and https:// URLs are supported: {0}")]
    UnsupportedScheme(String),

    #[error("http request build failed: {0}")]
    RequestBuild(#[from] http::Error),

    #[error("invalid http header name: {0}")]
    HeaderName(#[from] http::header::InvalidHeaderName),

    #[error("invalid http header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("connection failed: {0}")]
    Connect(hyper_util::client::legacy::Error),

    #[error("http request failed: {0}")]
    Request(hyper_util::client::legacy::Error),

    #[error("http request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read response body: {0}")]
    BodyRead(#[from] hyper::Error),
}

impl From<hyper_util::client::legacy::Error> for Error {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        if err.is_connect() {
            Self::Connect(err)
        } else {
            Self::Request(err)
        }
    }
}

impl Error {
    #[must_use]
    pub fn transport_error_kind(&self) -> HttpTransportErrorKind {
        match self {
            Self::InvalidUrl(_) => HttpTransportErrorKind::InvalidUrl,
            Self::UnsupportedScheme(_) => HttpTransportErrorKind::UnsupportedScheme,
            Self::RequestBuild(_) => HttpTransportErrorKind::RequestBuild,
            Self::HeaderName(_) => HttpTransportErrorKind::HeaderName,
            Self::HeaderValue(_) => HttpTransportErrorKind::HeaderValue,
            Self::Connect(_) => HttpTransportErrorKind::Connect,
            Self::Request(_) => HttpTransportErrorKind::Request,
            Self::Timeout(_) => HttpTransportErrorKind::Timeout,
            Self::BodyRead(_) => HttpTransportErrorKind::BodyRead,
        }
    }
}
