use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::{EndpointSpec, RunConfig, default_endpoints, secs};
use crate::error::{Error, Result};

/// A partial update of [`RunConfig`].
///
/// Only keys the config knows about are applied; anything else is collected in
/// `ignored` so callers can report it back instead of silently dropping it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
    pub target_base_url: Option<String>,
    pub endpoints: Option<Vec<EndpointSpec>>,
    pub concurrency: Option<usize>,
    pub duration: Option<Duration>,
    pub per_request_timeout: Option<Duration>,
    pub use_weights: Option<bool>,
    pub ignored: Vec<String>,
}

impl ConfigPatch {
    /// Builds a patch from a JSON object using the config wire keys.
    ///
    /// Unknown keys are ignored. A recognized key with a value of the wrong
    /// shape is an error.
    pub fn from_json(map: serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut patch = Self::default();

        for (key, value) in map {
            match key.as_str() {
                "api_url" => patch.target_base_url = Some(field(&key, value)?),
                "endpoints" => patch.endpoints = Some(field(&key, value)?),
                "concurrent_requests" => patch.concurrency = Some(field(&key, value)?),
                "test_duration" => patch.duration = Some(duration_field(&key, &value)?),
                "request_timeout" => {
                    patch.per_request_timeout = Some(duration_field(&key, &value)?)
                }
                "use_weights" => patch.use_weights = Some(field(&key, value)?),
                _ => patch.ignored.push(key),
            }
        }

        patch.ignored.sort();
        Ok(patch)
    }

    pub fn apply(&self, cfg: &mut RunConfig) {
        if let Some(v) = &self.target_base_url {
            cfg.target_base_url = v.clone();
        }
        if let Some(v) = &self.endpoints {
            cfg.endpoints = v.clone();
        }
        if let Some(v) = self.concurrency {
            cfg.concurrency = v;
        }
        if let Some(v) = self.duration {
            cfg.duration = v;
        }
        if let Some(v) = self.per_request_timeout {
            cfg.per_request_timeout = v;
        }
        if let Some(v) = self.use_weights {
            cfg.use_weights = v;
        }
    }
}

fn field<T: DeserializeOwned>(key: &str, value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|err| Error::InvalidField {
        field: key.to_string(),
        reason: err.to_string(),
    })
}

fn duration_field(key: &str, value: &serde_json::Value) -> Result<Duration> {
    secs::from_json(value).map_err(|reason| Error::InvalidField {
        field: key.to_string(),
        reason,
    })
}

/// Body of a "run with these settings" request.
///
/// `endpoints` wins over `endpoint` (a single GET path), which wins over
/// `reset_endpoints` (restore the built-in endpoint set).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunOverrides {
    pub api_url: Option<String>,
    pub endpoint: Option<String>,
    pub endpoints: Option<Vec<EndpointSpec>>,
    #[serde(deserialize_with = "secs::option::deserialize")]
    pub seconds: Option<Duration>,
    pub requests: Option<usize>,
    #[serde(deserialize_with = "secs::option::deserialize")]
    pub timeout: Option<Duration>,
    pub use_weights: Option<bool>,
    pub reset_endpoints: bool,
}

impl From<RunOverrides> for ConfigPatch {
    fn from(o: RunOverrides) -> Self {
        let endpoints = match (o.endpoints, o.endpoint) {
            (Some(eps), _) => Some(eps),
            (None, Some(path)) => Some(vec![EndpointSpec::get(path)]),
            (None, None) if o.reset_endpoints => Some(default_endpoints()),
            (None, None) => None,
        };

        Self {
            target_base_url: o.api_url,
            endpoints,
            concurrency: o.requests,
            duration: o.seconds,
            per_request_timeout: o.timeout,
            use_weights: o.use_weights,
            ignored: Vec::new(),
        }
    }
}
