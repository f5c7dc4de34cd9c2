mod config;
mod error;
mod executor;
mod patch;

pub mod runner;

pub use config::{EndpointKey, EndpointSpec, HttpMethod, RunConfig, default_endpoints};
pub use error::{Error, Result};
pub use executor::{HttpExecutor, Outcome, OutcomeError, RequestExecutor};
pub use patch::{ConfigPatch, RunOverrides};
pub use runner::{
    ConfigUpdated, EndpointStats, LatencySummary, RunController, RunResult, RunStarted, RunState,
    StatusSnapshot,
};
pub use volley_http::HttpTransportErrorKind;
