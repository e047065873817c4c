//! Batch run reports.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ExecutionProfile;
use crate::task::{TaskResult, TaskStatus};

/// Aggregate summary and per-task breakdown for one completed batch.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub profile: String,
    pub max_parallel_agents: usize,
    pub timeout_seconds: f64,
    pub summary: RunSummary,
    pub tasks: Vec<TaskRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_tasks: usize,
    pub completed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
    /// completed / total, 0.0 for an empty batch.
    pub success_rate: f64,
    /// Sum of per-task wall-clock durations, not batch elapsed time.
    pub total_execution_time_ms: u64,
    pub total_fan_out_calls: usize,
    /// fan-out calls per task; > 1.0 means tasks multiplied work internally.
    pub parallel_efficiency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRow {
    pub task_id: String,
    pub kind: String,
    pub status: TaskStatus,
    pub duration_ms: u64,
    pub fan_out_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn from_results(
        results: &[TaskResult],
        profile_name: &str,
        profile: &ExecutionProfile,
    ) -> Self {
        let total = results.len();
        let count = |status: TaskStatus| results.iter().filter(|r| r.status == status).count();
        let completed = count(TaskStatus::Completed);
        let total_fan_out: usize = results.iter().map(|r| r.fan_out_count).sum();

        let divide = |num: f64| if total == 0 { 0.0 } else { num / total as f64 };

        Self {
            generated_at: Utc::now(),
            profile: profile_name.to_string(),
            max_parallel_agents: profile.max_parallel_agents,
            timeout_seconds: profile.timeout_seconds,
            summary: RunSummary {
                total_tasks: total,
                completed,
                failed: count(TaskStatus::Failed),
                timed_out: count(TaskStatus::TimedOut),
                cancelled: count(TaskStatus::Cancelled),
                success_rate: divide(completed as f64),
                total_execution_time_ms: results.iter().map(|r| r.duration_ms).sum(),
                total_fan_out_calls: total_fan_out,
                parallel_efficiency: divide(total_fan_out as f64),
            },
            tasks: results
                .iter()
                .map(|r| TaskRow {
                    task_id: r.task_id.clone(),
                    kind: r.kind.to_string(),
                    status: r.status,
                    duration_ms: r.duration_ms,
                    fan_out_count: r.fan_out_count,
                    error: r.error.clone(),
                })
                .collect(),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.summary.completed == self.summary.total_tasks
    }
}
