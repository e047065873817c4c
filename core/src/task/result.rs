use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Task, TaskKind};

/// Task execution status.
///
/// `Pending -> Running -> {Completed | Failed | TimedOut}`; `Cancelled` is
/// reachable only from `Pending`, when dependency gating decides the task may
/// never run. No transition re-enters an earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

/// Single terminal outcome record for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,

    pub kind: TaskKind,

    pub status: TaskStatus,

    /// Executor-specific success payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Present iff status is Failed, TimedOut or Cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock time spent inside the executor call, excluding queueing
    /// and dependency waiting.
    #[serde(default)]
    pub duration_ms: u64,

    /// Number of independent sub-operations the executor fanned out to.
    #[serde(default)]
    pub fan_out_count: usize,

    /// Free-form diagnostics (image used, GPU config snapshot, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl TaskResult {
    pub fn completed(task: &Task, value: Value) -> Self {
        Self::terminal(task, TaskStatus::Completed, Some(value), None)
    }

    pub fn failed(task: &Task, error: impl Into<String>) -> Self {
        Self::terminal(task, TaskStatus::Failed, None, Some(error.into()))
    }

    pub fn timed_out(task: &Task, error: impl Into<String>) -> Self {
        Self::terminal(task, TaskStatus::TimedOut, None, Some(error.into()))
    }

    pub fn cancelled(task: &Task, error: impl Into<String>) -> Self {
        Self::terminal(task, TaskStatus::Cancelled, None, Some(error.into()))
    }

    fn terminal(
        task: &Task,
        status: TaskStatus,
        value: Option<Value>,
        error: Option<String>,
    ) -> Self {
        Self {
            task_id: task.id.clone(),
            kind: task.kind,
            status,
            value,
            error,
            duration_ms: 0,
            fan_out_count: 0,
            metadata: Map::new(),
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_fan_out(mut self, fan_out_count: usize) -> Self {
        self.fan_out_count = fan_out_count;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn succeeded(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{SearchPayload, TaskPayload};

    fn sample_task() -> Task {
        Task::new(
            "s1",
            TaskKind::ParallelSearch,
            TaskPayload::ParallelSearch(SearchPayload { patterns: vec![] }),
        )
    }

    #[test]
    fn terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn failure_carries_error_only() {
        let task = sample_task();
        let res = TaskResult::failed(&task, "boom").with_duration_ms(12);
        assert_eq!(res.status, TaskStatus::Failed);
        assert_eq!(res.error.as_deref(), Some("boom"));
        assert!(res.value.is_none());
        assert_eq!(res.duration_ms, 12);
        assert!(!res.succeeded());
    }
}
