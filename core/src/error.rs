use thiserror::Error;

use crate::task::TaskKind;

/// Errors that make an orchestrator instance unusable or a batch submission
/// invalid. These propagate to the caller; per-task failures never do - they
/// are captured inside the task's `TaskResult`.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Duplicate task ID in batch: {0}")]
    DuplicateTaskId(String),

    #[error("Invalid execution profile '{profile}': {reason}")]
    InvalidProfile { profile: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),
}

/// Errors an executor may return from `execute`.
///
/// Operational failures (nonzero exit, missing file, unreachable backend) are
/// NOT errors here - executors fold those into a `Failed` result. This type is
/// reserved for programming and infrastructure faults: a payload variant that
/// does not match the task kind despite validation, or a worker that panicked.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Payload does not match task kind {0}")]
    PayloadMismatch(TaskKind),

    #[error("Worker task failed: {0}")]
    Join(String),

    #[error("Executor error: {0}")]
    Internal(String),
}
