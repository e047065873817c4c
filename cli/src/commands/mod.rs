pub mod cli;
mod data;
mod info;
mod registry;
mod run;

use subagent_core::api::{OrchestratorConfig, TaskResult};

use cli::Command;

/// Dispatch a parsed command. Returns the process exit code.
pub async fn dispatch(
    command: Command,
    config: OrchestratorConfig,
    profile: &str,
    progress: bool,
) -> anyhow::Result<i32> {
    match command {
        Command::Run { file, report } => run::run(config, profile, progress, &file, report).await,
        Command::Upsert { target, data, ttl } => {
            data::upsert(config, profile, target, data, ttl).await
        }
        Command::Downsert { targets, pattern } => {
            data::downsert(config, profile, targets, pattern).await
        }
        Command::Search { patterns } => data::search(config, profile, patterns).await,
        Command::Validate {
            files,
            validation_profile,
        } => data::validate(config, profile, files, &validation_profile).await,
        Command::Registry { action, images } => {
            registry::sync(config, profile, action.into(), images).await
        }
        Command::GpuCheck { model, batch_size } => {
            registry::gpu_check(config, profile, model, batch_size).await
        }
        Command::Images => info::images(&config),
        Command::Config => info::config(&config),
    }
}

/// Print one task result as pretty JSON and map its status to an exit code.
pub(crate) fn emit_result(result: &TaskResult) -> anyhow::Result<i32> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(if result.succeeded() { 0 } else { 1 })
}
