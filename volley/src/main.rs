mod api;
mod cli;
mod exit_codes;
mod logging;
mod output;
mod run;
mod run_error;
mod serve;
mod settings;

use clap::Parser;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    let cli = match cli::Cli::try_parse() {
        Ok(v) => v,
        Err(err) => {
            use clap::error::ErrorKind;
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    exit_codes::ExitCode::Success.as_i32()
                }
                _ => exit_codes::ExitCode::InvalidInput.as_i32(),
            };
            std::process::exit(code);
        }
    };

    if let Err(err) = logging::init(cli.log_level.as_deref()) {
        eprintln!("{err:#}");
        std::process::exit(exit_codes::ExitCode::InvalidInput.as_i32());
    }

    let outcome = match cli.command {
        cli::Command::Serve(args) => serve::serve(args).await,
        cli::Command::Run(args) => run::run(args).await,
    };

    let code = match outcome {
        Ok(code) => code.as_i32(),
        Err(err) => {
            eprintln!("{err}");
            err.exit_code().as_i32()
        }
    };

    std::process::exit(code);
}
