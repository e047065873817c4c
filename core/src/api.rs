//! Stable re-exports and one-shot helpers for consumers (`cli` and external
//! crates).
//!
//! Prefer importing from `subagent_core::api` instead of reaching into
//! internal modules. The `run_*` helpers wrap the common single-task flows:
//! build an orchestrator, register the right executor, run one task, return
//! its result.

use std::sync::Arc;

use uuid::Uuid;

pub use crate::config::{
    load_default, load_from, ExecutionProfile, GpuConfig, LoggingConfig, OrchestratorConfig,
    RegistryConfig, DEFAULT_CONFIG_FILE,
};
pub use crate::error::{ExecutorError, OrchestratorError};
pub use crate::executor::{
    DockerRunExecutor, DownsertBackend, DownsertExecutor, FileReport, FsBackend,
    GpuInferenceExecutor, ParallelSearchExecutor, RegistrySyncExecutor, SearchFn, StoreBackend,
    TaskExecutor, UpsertBackend, UpsertExecutor, ValidationExecutor, ValidatorFn,
};
pub use crate::orchestrator::{Orchestrator, ProgressMonitor, RunReport};
pub use crate::runner::{CommandOutput, CommandRunner, SystemRunner};
pub use crate::store::{KeyedStore, MemoryStore};
pub use crate::task::{
    DockerRunPayload, DownsertPayload, GpuInferencePayload, RegistryAction, RegistrySyncPayload,
    SearchPayload, Task, TaskKind, TaskPayload, TaskResult, TaskStatus, UpsertItem, UpsertPayload,
    ValidationPayload,
};

fn generated_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Orchestrator with every built-in executor registered.
pub fn full_orchestrator(
    config: OrchestratorConfig,
    profile_name: &str,
) -> Result<Orchestrator, OrchestratorError> {
    let mut orch = Orchestrator::new(config, profile_name)?;
    let config = orch.config().clone();
    let profile = orch.profile().clone();

    orch.register_executor(TaskKind::DockerRun, Arc::new(DockerRunExecutor::new(&config)));
    orch.register_executor(
        TaskKind::GpuInference,
        Arc::new(GpuInferenceExecutor::new(&config)),
    );
    orch.register_executor(
        TaskKind::RegistrySync,
        Arc::new(RegistrySyncExecutor::new(&config)),
    );
    orch.register_executor(TaskKind::Upsert, Arc::new(UpsertExecutor::new(&profile)));
    orch.register_executor(TaskKind::Downsert, Arc::new(DownsertExecutor::new(&profile)));
    orch.register_executor(
        TaskKind::ParallelSearch,
        Arc::new(ParallelSearchExecutor::new(&profile)),
    );
    orch.register_executor(
        TaskKind::Validation,
        Arc::new(ValidationExecutor::new(&profile)),
    );
    Ok(orch)
}

async fn run_one(orch: &mut Orchestrator, task: Task) -> Result<TaskResult, OrchestratorError> {
    let mut results = orch.execute_batch(vec![task]).await?;
    Ok(results.remove(0))
}

/// Run a single container task.
pub async fn run_docker_task(
    config: OrchestratorConfig,
    profile: &str,
    payload: DockerRunPayload,
) -> Result<TaskResult, OrchestratorError> {
    let mut orch = full_orchestrator(config, profile)?;
    let task = Task::new(
        generated_id("docker"),
        TaskKind::DockerRun,
        TaskPayload::DockerRun(payload),
    );
    run_one(&mut orch, task).await
}

/// Probe GPU inference readiness for one model type.
pub async fn run_gpu_inference(
    config: OrchestratorConfig,
    profile: &str,
    payload: GpuInferencePayload,
) -> Result<TaskResult, OrchestratorError> {
    let mut orch = full_orchestrator(config, profile)?;
    let task = Task::new(
        generated_id("gpu"),
        TaskKind::GpuInference,
        TaskPayload::GpuInference(payload),
    );
    run_one(&mut orch, task).await
}

/// Synchronize images with the configured registry.
pub async fn sync_registry(
    config: OrchestratorConfig,
    profile: &str,
    payload: RegistrySyncPayload,
) -> Result<TaskResult, OrchestratorError> {
    let mut orch = full_orchestrator(config, profile)?;
    let task = Task::new(
        generated_id("registry"),
        TaskKind::RegistrySync,
        TaskPayload::RegistrySync(payload),
    );
    run_one(&mut orch, task).await
}

/// Create-or-update a batch of targets.
pub async fn batch_upsert(
    config: OrchestratorConfig,
    profile: &str,
    items: Vec<UpsertItem>,
) -> Result<TaskResult, OrchestratorError> {
    let mut orch = full_orchestrator(config, profile)?;
    let task = Task::new(
        generated_id("upsert"),
        TaskKind::Upsert,
        TaskPayload::Upsert(UpsertPayload { items }),
    );
    run_one(&mut orch, task).await
}

/// Delete-if-exists a batch of targets, optionally expanded from a pattern.
pub async fn batch_downsert(
    config: OrchestratorConfig,
    profile: &str,
    targets: Vec<String>,
    pattern: Option<String>,
) -> Result<TaskResult, OrchestratorError> {
    let mut orch = full_orchestrator(config, profile)?;
    let task = Task::new(
        generated_id("downsert"),
        TaskKind::Downsert,
        TaskPayload::Downsert(DownsertPayload { targets, pattern }),
    );
    run_one(&mut orch, task).await
}

/// Fan out a set of search patterns and flatten the matches.
pub async fn parallel_search(
    config: OrchestratorConfig,
    profile: &str,
    patterns: Vec<String>,
) -> Result<TaskResult, OrchestratorError> {
    let mut orch = full_orchestrator(config, profile)?;
    let task = Task::new(
        generated_id("search"),
        TaskKind::ParallelSearch,
        TaskPayload::ParallelSearch(SearchPayload { patterns }),
    );
    run_one(&mut orch, task).await
}

/// Validate a set of files under the named validation profile.
pub async fn parallel_validation(
    config: OrchestratorConfig,
    profile: &str,
    files: Vec<String>,
    validation_profile: &str,
) -> Result<TaskResult, OrchestratorError> {
    let mut orch = full_orchestrator(config, profile)?;
    let task = Task::new(
        generated_id("validation"),
        TaskKind::Validation,
        TaskPayload::Validation(ValidationPayload {
            files,
            profile: validation_profile.to_string(),
        }),
    );
    run_one(&mut orch, task).await
}
