use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;

use super::run::run_load_test;
use super::stats::RunResult;
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::executor::RequestExecutor;
use crate::patch::ConfigPatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
}

/// What `status()` reports. The last result is hidden while a run is active.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    #[serde(rename = "status")]
    pub state: RunState,
    pub config: Arc<RunConfig>,
    #[serde(rename = "results", skip_serializing_if = "Option::is_none")]
    pub last_result: Option<Arc<RunResult>>,
}

#[derive(Debug, Clone)]
pub struct RunStarted {
    pub run_id: u64,
    pub config: Arc<RunConfig>,
}

#[derive(Debug, Clone)]
pub struct ConfigUpdated {
    pub config: Arc<RunConfig>,
    pub ignored: Vec<String>,
}

#[derive(Debug)]
struct Inner {
    config: Arc<RunConfig>,
    state: RunState,
    last_result: Option<Arc<RunResult>>,
    runs_started: u64,
}

/// Owns the stored config and the single active run.
///
/// Cloning yields another handle to the same controller.
pub struct RunController<E> {
    inner: Arc<Mutex<Inner>>,
    state_tx: Arc<watch::Sender<RunState>>,
    executor: Arc<E>,
}

impl<E> Clone for RunController<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            state_tx: self.state_tx.clone(),
            executor: self.executor.clone(),
        }
    }
}

impl<E: RequestExecutor> RunController<E> {
    pub fn new(config: RunConfig, executor: E) -> Self {
        let (state_tx, _) = watch::channel(RunState::Idle);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                config: Arc::new(config),
                state: RunState::Idle,
                last_result: None,
                runs_started: 0,
            })),
            state_tx: Arc::new(state_tx),
            executor: Arc::new(executor),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts a run with the stored config, optionally patched first.
    ///
    /// A rejected call (active run, invalid config) leaves the controller
    /// untouched. The patched config is stored only when the run starts.
    pub fn start(&self, patch: Option<ConfigPatch>) -> Result<RunStarted> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let (run_id, config) = {
            let mut inner = self.lock();
            if inner.state == RunState::Running {
                return Err(Error::AlreadyRunning);
            }

            let mut next = (*inner.config).clone();
            if let Some(patch) = &patch {
                patch.apply(&mut next);
            }
            next.validate()?;

            let config = Arc::new(next);
            inner.config = config.clone();
            inner.state = RunState::Running;
            inner.runs_started += 1;
            self.state_tx.send_replace(RunState::Running);
            (inner.runs_started, config)
        };

        tracing::info!(run_id, "test run accepted");

        let this = self.clone();
        let run_cfg = config.clone();
        runtime.spawn(async move {
            let executor = this.executor.clone();
            let outcome = match tokio::spawn(run_load_test(run_cfg, executor)).await {
                Ok(res) => res,
                Err(err) => Err(Error::from(err)),
            };
            this.finish(run_id, outcome);
        });

        Ok(RunStarted { run_id, config })
    }

    fn finish(&self, run_id: u64, outcome: Result<RunResult>) {
        let mut inner = self.lock();
        match outcome {
            Ok(result) => inner.last_result = Some(Arc::new(result)),
            Err(err) => tracing::error!(run_id, error = %err, "test run failed"),
        }

        inner.state = if inner.last_result.is_some() {
            RunState::Completed
        } else {
            RunState::Idle
        };
        self.state_tx.send_replace(inner.state);
    }

    pub fn update_config(&self, patch: ConfigPatch) -> Result<ConfigUpdated> {
        let mut inner = self.lock();
        if inner.state == RunState::Running {
            return Err(Error::ConfigLocked);
        }

        let mut next = (*inner.config).clone();
        patch.apply(&mut next);
        next.validate()?;

        let config = Arc::new(next);
        inner.config = config.clone();
        Ok(ConfigUpdated {
            config,
            ignored: patch.ignored,
        })
    }

    pub fn status(&self) -> StatusSnapshot {
        let inner = self.lock();
        let last_result = match inner.state {
            RunState::Running => None,
            RunState::Idle | RunState::Completed => inner.last_result.clone(),
        };
        StatusSnapshot {
            state: inner.state,
            config: inner.config.clone(),
            last_result,
        }
    }

    pub fn config(&self) -> Arc<RunConfig> {
        self.lock().config.clone()
    }

    pub fn state(&self) -> RunState {
        self.lock().state
    }

    pub fn last_result(&self) -> Option<Arc<RunResult>> {
        self.lock().last_result.clone()
    }

    /// Resolves once no run is active and returns the latest result.
    pub async fn wait_for_completion(&self) -> Option<Arc<RunResult>> {
        let mut rx = self.state_tx.subscribe();
        // The sender lives as long as `self`, so this only errors if it is gone.
        let _ = rx.wait_for(|state| *state != RunState::Running).await;
        self.last_result()
    }
}
