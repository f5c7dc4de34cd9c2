use volley_core::{HttpExecutor, RunController};

use crate::api::ControlServer;
use crate::cli::ServeArgs;
use crate::exit_codes::ExitCode;
use crate::run_error::RunError;
use crate::settings;

pub async fn serve(args: ServeArgs) -> Result<ExitCode, RunError> {
    let cfg = settings::resolve(&args.config)
        .await
        .map_err(RunError::InvalidInput)?;
    cfg.validate()?;

    let controller = RunController::new(cfg, HttpExecutor::default());
    let server = ControlServer::start(args.bind, controller)
        .await
        .map_err(RunError::RuntimeError)?;

    println!("CONTROL_URL={}", server.url());
    tracing::info!(url = %server.url(), "control plane listening");

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
    }

    tracing::info!("shutting down");
    server.shutdown().await;
    Ok(ExitCode::Success)
}
