use async_trait::async_trait;

use crate::error::ExecutorError;
use crate::task::{Task, TaskResult};

/// Polymorphic task handler: one implementation per task kind.
///
/// `validate` is a pure structural check of the payload and must return false
/// rather than fail for malformed input; the orchestrator treats false as a
/// hard rejection before any execution attempt.
///
/// `execute` performs the work. Ordinary operational failures (nonzero exit,
/// missing file, unreachable backend) are folded into a `Failed` result;
/// `Err` is reserved for programming and infrastructure faults and is turned
/// into a `Failed` result by the dispatcher.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    fn validate(&self, task: &Task) -> bool;

    async fn execute(&self, task: &Task) -> Result<TaskResult, ExecutorError>;
}
