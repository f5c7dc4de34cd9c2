use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "http://target-api:5000";
pub const DEFAULT_CONCURRENCY: usize = 50;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|_| {
            serde::de::Error::custom(format!(
                "unsupported method `{raw}` (expected `GET` or `POST`)"
            ))
        })
    }
}

/// One target endpoint. Requests are aggregated by [`EndpointKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub path: String,

    #[serde(default)]
    pub method: HttpMethod,

    /// JSON payload sent with POST requests.
    #[serde(
        default,
        rename = "data",
        alias = "body",
        skip_serializing_if = "Option::is_none"
    )]
    pub body: Option<serde_json::Value>,

    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl EndpointSpec {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: HttpMethod::Get,
            body: None,
            weight: default_weight(),
        }
    }

    pub fn post(path: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self {
            path: path.into(),
            method: HttpMethod::Post,
            body,
            weight: default_weight(),
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn key(&self) -> EndpointKey {
        EndpointKey {
            method: self.method,
            path: self.path.clone(),
        }
    }
}

/// Aggregation identity of an endpoint: `(method, path)`, rendered as `GET:/path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub method: HttpMethod,
    pub path: String,
}

impl EndpointKey {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.method, self.path)
    }
}

impl Serialize for EndpointKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub fn default_endpoints() -> Vec<EndpointSpec> {
    vec![
        EndpointSpec::get("/").with_weight(10),
        EndpointSpec::get("/status").with_weight(5),
        EndpointSpec::post(
            "/submit",
            Some(serde_json::json!({ "name": "John Doe", "email": "john@example.com" })),
        )
        .with_weight(8),
    ]
}

/// Everything one run needs. Copied once when a run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    #[serde(rename = "api_url")]
    pub target_base_url: String,

    pub endpoints: Vec<EndpointSpec>,

    /// Number of workers draining the dispatch queue.
    #[serde(rename = "concurrent_requests")]
    pub concurrency: usize,

    #[serde(rename = "test_duration", with = "secs")]
    pub duration: Duration,

    #[serde(rename = "request_timeout", with = "secs")]
    pub per_request_timeout: Duration,

    pub use_weights: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target_base_url: DEFAULT_BASE_URL.to_string(),
            endpoints: default_endpoints(),
            concurrency: DEFAULT_CONCURRENCY,
            duration: DEFAULT_DURATION,
            per_request_timeout: DEFAULT_REQUEST_TIMEOUT,
            use_weights: true,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }
        if self.concurrency == 0 {
            return Err(Error::InvalidConcurrency);
        }
        if self.duration.is_zero() {
            return Err(Error::InvalidDuration);
        }
        if self.per_request_timeout.is_zero() {
            return Err(Error::InvalidTimeout);
        }

        match url::Url::parse(&self.target_base_url) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            _ => return Err(Error::InvalidBaseUrl(self.target_base_url.clone())),
        }

        if self.use_weights
            && let Some(ep) = self.endpoints.iter().find(|ep| ep.weight == 0)
        {
            return Err(Error::InvalidWeight(ep.key().to_string()));
        }

        Ok(())
    }
}

/// Durations on the wire are seconds; whole values stay integers.
pub(crate) mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn from_f64(v: f64) -> Option<Duration> {
        if !v.is_finite() || v < 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(v).ok()
    }

    pub(crate) fn from_json(v: &serde_json::Value) -> Result<Duration, String> {
        v.as_f64()
            .and_then(from_f64)
            .ok_or_else(|| format!("expected a non-negative number of seconds, got `{v}`"))
    }

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if d.subsec_nanos() == 0 {
            serializer.serialize_u64(d.as_secs())
        } else {
            serializer.serialize_f64(d.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let v = f64::deserialize(deserializer)?;
        from_f64(v).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "expected a non-negative number of seconds, got `{v}`"
            ))
        })
    }

    pub(crate) mod option {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            match Option::<f64>::deserialize(deserializer)? {
                None => Ok(None),
                Some(v) => super::from_f64(v).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "expected a non-negative number of seconds, got `{v}`"
                    ))
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RunConfig {
        RunConfig {
            target_base_url: "http://127.0.0.1:5000".to_string(),
            ..RunConfig::default()
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(RunConfig::default().validate().is_ok());
        assert_eq!(RunConfig::default().endpoints.len(), 3);
    }

    #[test]
    fn validate_rejects_invariant_violations() {
        let cfg = RunConfig {
            endpoints: vec![],
            ..valid()
        };
        assert!(matches!(cfg.validate(), Err(Error::NoEndpoints)));

        let cfg = RunConfig {
            concurrency: 0,
            ..valid()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConcurrency)));

        let cfg = RunConfig {
            duration: Duration::ZERO,
            ..valid()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidDuration)));

        let cfg = RunConfig {
            per_request_timeout: Duration::ZERO,
            ..valid()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidTimeout)));

        let cfg = RunConfig {
            target_base_url: "target-api:5000".to_string(),
            ..valid()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidBaseUrl(_))));
    }

    #[test]
    fn zero_weight_is_only_rejected_when_weighting() {
        let endpoints = vec![
            EndpointSpec::get("/").with_weight(0),
            EndpointSpec::get("/status").with_weight(0),
        ];

        let weighted = RunConfig {
            endpoints: endpoints.clone(),
            use_weights: true,
            ..valid()
        };
        match weighted.validate() {
            Err(Error::InvalidWeight(key)) => assert_eq!(key, "GET:/"),
            other => panic!("expected InvalidWeight, got {other:?}"),
        }

        let uniform = RunConfig {
            endpoints,
            use_weights: false,
            ..valid()
        };
        assert!(uniform.validate().is_ok());
    }

    #[test]
    fn wire_format_uses_service_keys() {
        let cfg = RunConfig {
            duration: Duration::from_millis(1500),
            ..valid()
        };
        let v = match serde_json::to_value(&cfg) {
            Ok(v) => v,
            Err(err) => panic!("serialize config: {err}"),
        };

        assert_eq!(v["api_url"], "http://127.0.0.1:5000");
        assert_eq!(v["concurrent_requests"], 50);
        assert_eq!(v["test_duration"], 1.5);
        assert_eq!(v["request_timeout"], 5);
        assert_eq!(v["use_weights"], true);
        assert_eq!(v["endpoints"][2]["method"], "POST");
        assert_eq!(v["endpoints"][2]["data"]["name"], "John Doe");
        assert!(v["endpoints"][0].get("data").is_none());
    }

    #[test]
    fn endpoint_parsing_applies_defaults_and_aliases() {
        let raw = r#"[
            {"path": "/a"},
            {"path": "/b", "method": "post", "body": {"k": 1}, "weight": 3}
        ]"#;
        let eps: Vec<EndpointSpec> = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(err) => panic!("parse endpoints: {err}"),
        };

        assert_eq!(eps[0], EndpointSpec::get("/a"));
        assert_eq!(eps[1].method, HttpMethod::Post);
        assert_eq!(eps[1].weight, 3);
        assert_eq!(eps[1].body, Some(serde_json::json!({"k": 1})));
        assert_eq!(eps[1].key().to_string(), "POST:/b");
    }

    #[test]
    fn endpoint_parsing_rejects_unsupported_methods() {
        let raw = r#"{"path": "/", "method": "DELETE"}"#;
        let err = serde_json::from_str::<EndpointSpec>(raw).err();
        match err {
            Some(err) => assert!(err.to_string().contains("unsupported method")),
            None => panic!("expected DELETE to be rejected"),
        }
    }

    #[test]
    fn negative_durations_are_rejected() {
        let raw = r#"{"test_duration": -1}"#;
        assert!(serde_json::from_str::<RunConfig>(raw).is_err());
    }
}
