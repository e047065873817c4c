//! Batch orchestration engine.
//!
//! Independent tasks run first, in waves bounded by the profile's
//! `max_parallel_agents`. Dependent tasks then run sequentially, each gated
//! on every dependency having reached `Completed`; an unsatisfied gate yields
//! `Cancelled` without invoking the executor. Results come back in the order
//! tasks were submitted.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::{ExecutionProfile, OrchestratorConfig};
use crate::error::OrchestratorError;
use crate::executor::TaskExecutor;
use crate::task::{Task, TaskKind, TaskResult, TaskStatus};

use super::progress::ProgressMonitor;
use super::report::RunReport;

pub struct Orchestrator {
    config: OrchestratorConfig,
    profile_name: String,
    profile: ExecutionProfile,
    executors: HashMap<TaskKind, Arc<dyn TaskExecutor>>,
    results: HashMap<String, TaskResult>,
    progress: bool,
}

impl Orchestrator {
    /// Build an orchestrator against a named execution profile. Unknown
    /// profile names fall back to defaults; invalid limits are rejected.
    pub fn new(config: OrchestratorConfig, profile_name: &str) -> Result<Self, OrchestratorError> {
        let profile = config.profile(profile_name).validated(profile_name)?;

        Ok(Self {
            config,
            profile_name: profile_name.to_string(),
            profile,
            executors: HashMap::new(),
            results: HashMap::new(),
            progress: false,
        })
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn profile(&self) -> &ExecutionProfile {
        &self.profile
    }

    /// Register an executor for a task kind. Registering the same kind twice
    /// replaces the earlier executor.
    pub fn register_executor(&mut self, kind: TaskKind, executor: Arc<dyn TaskExecutor>) {
        if self.executors.insert(kind, executor).is_some() {
            warn!(kind = %kind, "replacing previously registered executor");
        }
    }

    /// Result of a task from any batch run so far, by id.
    pub fn result(&self, task_id: &str) -> Option<&TaskResult> {
        self.results.get(task_id)
    }

    /// Execute a batch of tasks and return their results in submission order.
    ///
    /// Fails fast on duplicate task ids; everything else is reported through
    /// per-task statuses rather than an error.
    pub async fn execute_batch(
        &mut self,
        tasks: Vec<Task>,
    ) -> Result<Vec<TaskResult>, OrchestratorError> {
        let mut seen = HashSet::new();
        for task in &tasks {
            if !seen.insert(task.id.clone()) {
                return Err(OrchestratorError::DuplicateTaskId(task.id.clone()));
            }
        }

        let total = tasks.len();
        info!(
            total,
            profile = %self.profile_name,
            max_parallel = self.profile.max_parallel_agents,
            "starting batch"
        );

        let mut independent: Vec<(usize, Task)> = Vec::new();
        let mut dependent: Vec<(usize, Task)> = Vec::new();
        for (idx, task) in tasks.into_iter().enumerate() {
            if task.is_independent() {
                independent.push((idx, task));
            } else {
                dependent.push((idx, task));
            }
        }

        let mut monitor = ProgressMonitor::new(total, self.progress);
        let mut indexed: Vec<(usize, TaskResult)> = Vec::with_capacity(total);

        let width = self.profile.max_parallel_agents.max(1);
        let total_waves = independent.len().div_ceil(width);
        for (wave, chunk) in independent.chunks(width).enumerate() {
            monitor.update_wave(wave, total_waves);
            for (_, task) in chunk {
                monitor.add_task(&task.id);
            }

            let settled = join_all(chunk.iter().map(|(_, task)| self.dispatch(task))).await;
            for ((idx, _), result) in chunk.iter().zip(settled) {
                monitor.complete_task(&result.task_id, result.succeeded(), result.duration_ms);
                self.results.insert(result.task_id.clone(), result.clone());
                indexed.push((*idx, result));
            }
        }

        // Dependents run one at a time, in submission order, so a dependent
        // earlier in the batch can gate one later in it.
        for (idx, task) in dependent {
            monitor.add_task(&task.id);
            let unsatisfied: Vec<&String> = task
                .dependencies
                .iter()
                .filter(|dep| {
                    self.results
                        .get(dep.as_str())
                        .map_or(true, |r| r.status != TaskStatus::Completed)
                })
                .collect();

            let result = if unsatisfied.is_empty() {
                self.dispatch(&task).await
            } else {
                debug!(task_id = %task.id, ?unsatisfied, "dependency gate not satisfied");
                TaskResult::cancelled(
                    &task,
                    format!(
                        "Dependencies not satisfied: {}",
                        unsatisfied
                            .iter()
                            .map(|s| s.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )
            };

            monitor.complete_task(&result.task_id, result.succeeded(), result.duration_ms);
            self.results.insert(result.task_id.clone(), result.clone());
            indexed.push((idx, result));
        }

        indexed.sort_by_key(|(idx, _)| *idx);
        let results: Vec<TaskResult> = indexed.into_iter().map(|(_, r)| r).collect();

        let completed = results.iter().filter(|r| r.succeeded()).count();
        monitor.finish(completed == total);
        info!(total, completed, "batch finished");

        Ok(results)
    }

    /// Run one task to a terminal result. Executor errors and deadline
    /// overruns fold into `Failed`/`TimedOut` results; this never panics the
    /// batch.
    async fn dispatch(&self, task: &Task) -> TaskResult {
        let Some(executor) = self.executors.get(&task.kind) else {
            return TaskResult::failed(
                task,
                format!("No executor registered for task kind '{}'", task.kind),
            );
        };

        if !executor.validate(task) {
            return TaskResult::failed(task, format!("Invalid payload for task '{}'", task.id));
        }

        debug!(task_id = %task.id, kind = %task.kind, timeout = ?task.timeout, "dispatching");
        let start = Instant::now();
        match tokio::time::timeout(task.timeout, executor.execute(task)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => TaskResult::failed(task, e.to_string())
                .with_duration_ms(start.elapsed().as_millis() as u64),
            Err(_) => {
                warn!(task_id = %task.id, timeout = ?task.timeout, "task deadline exceeded");
                TaskResult::timed_out(
                    task,
                    format!(
                        "Task timed out after {:.1}s",
                        task.timeout.as_secs_f64()
                    ),
                )
                .with_duration_ms(start.elapsed().as_millis() as u64)
            }
        }
    }

    /// Summarize every result recorded so far, across batches.
    ///
    /// Rows are ordered by task id so repeated calls produce the same report.
    pub fn generate_report(&self) -> RunReport {
        let mut results: Vec<TaskResult> = self.results.values().cloned().collect();
        results.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        RunReport::from_results(&results, &self.profile_name, &self.profile)
    }
}
