mod commands;

use clap::Parser;
use subagent_core::api::{load_default, load_from, LoggingConfig, OrchestratorError};
use tracing_subscriber::EnvFilter;

use commands::cli::Args;

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e:#}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> anyhow::Result<i32> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_from(path)?,
        None => load_default()?,
    };
    init_tracing(&config.logging);

    commands::dispatch(args.command, config, &args.profile, args.progress).await
}

fn init_tracing(logging: &LoggingConfig) {
    if !logging.enabled {
        return;
    }

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_code_for_error(e: &anyhow::Error) -> i32 {
    // 0: success
    // 1: batch finished with non-completed tasks
    // 11: config / profile error
    // 50: internal/uncategorized
    match e.downcast_ref::<OrchestratorError>() {
        Some(OrchestratorError::InvalidProfile { .. }) | Some(OrchestratorError::Config(_)) => 11,
        Some(_) => 50,
        None => {
            if e.downcast_ref::<std::io::Error>().is_some() {
                11
            } else {
                50
            }
        }
    }
}
