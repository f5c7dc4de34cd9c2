pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("a test is already running")]
    AlreadyRunning,

    #[error("cannot update config while a test is running")]
    ConfigLocked,

    #[error("`endpoints` must be a non-empty array of {{ path, method, weight }}")]
    NoEndpoints,

    #[error("`concurrent_requests` must be a positive integer")]
    InvalidConcurrency,

    #[error("`test_duration` must be a positive number of seconds")]
    InvalidDuration,

    #[error("`request_timeout` must be a positive number of seconds")]
    InvalidTimeout,

    #[error("endpoint `{0}` has weight 0 (weights must be >= 1 when `use_weights` is set)")]
    InvalidWeight(String),

    #[error("invalid `api_url` (expected an absolute http:// or https:// URL): `{0}`")]
    InvalidBaseUrl(String),

    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("no async runtime available to run the test")]
    NoRuntime,

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// The request collided with an active run rather than carrying bad input.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::ConfigLocked)
    }

    /// The request carried a configuration that violates a run invariant.
    #[must_use]
    pub fn is_invalid_config(&self) -> bool {
        matches!(
            self,
            Self::NoEndpoints
                | Self::InvalidConcurrency
                | Self::InvalidDuration
                | Self::InvalidTimeout
                | Self::InvalidWeight(_)
                | Self::InvalidBaseUrl(_)
                | Self::InvalidField { .. }
        )
    }
}
