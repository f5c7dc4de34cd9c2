use anyhow::Context as _;
use volley_core::{HttpExecutor, RunController};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;
use crate::settings;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let cfg = settings::resolve_run(&args)
        .await
        .map_err(RunError::InvalidInput)?;

    let controller = RunController::new(cfg, HttpExecutor::default());
    let started = controller.start(None)?;
    out.print_header(&started.config);

    let result = controller
        .wait_for_completion()
        .await
        .context("test run finished without a result")
        .map_err(RunError::RuntimeError)?;

    out.print_summary(&result).map_err(RunError::RuntimeError)?;
    Ok(ExitCode::Success)
}
