//! Fan-out search and validation executors.
//!
//! Both take their per-item work as an injected callback so callers can plug
//! in domain-specific matchers. The defaults work against the filesystem:
//! glob matching for search, existence plus JSON well-formedness for
//! validation.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::ExecutionProfile;
use crate::error::ExecutorError;
use crate::task::{Task, TaskPayload, TaskResult};

use super::pool::{fan_out, run_blocking};
use super::traits::TaskExecutor;

/// Resolves one search pattern to its matches.
pub type SearchFn = Arc<dyn Fn(&str) -> Result<Vec<Value>, String> + Send + Sync>;

/// Validates one file under a named profile.
pub type ValidatorFn = Arc<dyn Fn(&str, &str) -> Result<FileReport, String> + Send + Sync>;

/// Findings for a single validated file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl FileReport {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

fn glob_search(pattern: &str) -> Result<Vec<Value>, String> {
    let paths = glob::glob(pattern).map_err(|e| e.to_string())?;
    let mut matches = Vec::new();
    for path in paths {
        let path = path.map_err(|e| e.to_string())?;
        matches.push(Value::String(path.to_string_lossy().into_owned()));
    }
    Ok(matches)
}

fn fs_validate(file: &str, _profile: &str) -> Result<FileReport, String> {
    let path = Path::new(file);
    let mut report = FileReport::default();

    if !path.exists() {
        report.errors.push(format!("{file}: not found"));
        return Ok(report);
    }
    if path.extension().is_some_and(|ext| ext == "json") {
        let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        if let Err(e) = serde_json::from_str::<Value>(&content) {
            report.errors.push(format!("{file}: invalid JSON: {e}"));
        }
    } else if std::fs::metadata(path).map(|m| m.len()).unwrap_or(0) == 0 {
        report.warnings.push(format!("{file}: empty file"));
    }
    Ok(report)
}

/// Runs every search pattern concurrently and flattens the matches.
pub struct ParallelSearchExecutor {
    search: SearchFn,
    max_workers: usize,
}

impl ParallelSearchExecutor {
    pub fn new(profile: &ExecutionProfile) -> Self {
        Self::with_search(profile, Arc::new(glob_search))
    }

    pub fn with_search(profile: &ExecutionProfile, search: SearchFn) -> Self {
        Self {
            search,
            max_workers: profile.max_parallel_agents.max(1),
        }
    }
}

#[async_trait]
impl TaskExecutor for ParallelSearchExecutor {
    fn validate(&self, task: &Task) -> bool {
        matches!(&task.payload, TaskPayload::ParallelSearch(p) if !p.patterns.is_empty())
    }

    async fn execute(&self, task: &Task) -> Result<TaskResult, ExecutorError> {
        let TaskPayload::ParallelSearch(payload) = &task.payload else {
            return Err(ExecutorError::PayloadMismatch(task.kind));
        };

        let start = Instant::now();
        let total = payload.patterns.len();
        let search = self.search.clone();
        let items: Vec<(usize, String)> =
            payload.patterns.iter().cloned().enumerate().collect();

        let outcome = fan_out(
            items,
            self.max_workers,
            task.timeout,
            move |(idx, pattern): (usize, String)| {
                let search = search.clone();
                async move {
                    run_blocking(move || {
                        search(&pattern)
                            .map(|matches| (idx, pattern.clone(), matches))
                            .map_err(|e| format!("Search '{pattern}' failed: {e}"))
                    })
                    .await
                }
            },
        )
        .await;

        // Settle order is completion order; re-sort by pattern position so
        // flattened matches are deterministic.
        let mut settled = outcome.settled;
        settled.sort_by_key(|(idx, _, _)| *idx);

        let matched: usize = settled.iter().map(|(_, _, m)| m.len()).sum();
        let per_pattern: Vec<Value> = settled
            .iter()
            .map(|(_, pattern, matches)| json!({"pattern": pattern, "matches": matches}))
            .collect();
        let flattened: Vec<Value> = settled
            .into_iter()
            .flat_map(|(_, _, matches)| matches)
            .collect();
        let value = json!({
            "matches": flattened,
            "by_pattern": per_pattern,
            "summary": {
                "patterns": total,
                "matched": matched,
                "failed": outcome.errors.len(),
            },
        });

        let mut result = if outcome.timed_out {
            TaskResult::timed_out(
                task,
                format!(
                    "Search timed out after {:.1}s with {} patterns unsettled",
                    task.timeout.as_secs_f64(),
                    outcome.abandoned
                ),
            )
        } else if outcome.errors.is_empty() {
            TaskResult::completed(task, Value::Null)
        } else {
            TaskResult::failed(task, outcome.errors.join("; "))
        };
        result.value = Some(value);

        Ok(result
            .with_duration_ms(start.elapsed().as_millis() as u64)
            .with_fan_out(total))
    }
}

/// Validates a batch of files concurrently.
///
/// Validator findings are data, not task failures: a file with errors turns
/// `summary.passed` off but the task still completes. `Failed` is reserved
/// for validator invocations that themselves error.
pub struct ValidationExecutor {
    validator: ValidatorFn,
    max_workers: usize,
}

impl ValidationExecutor {
    pub fn new(profile: &ExecutionProfile) -> Self {
        Self::with_validator(profile, Arc::new(fs_validate))
    }

    pub fn with_validator(profile: &ExecutionProfile, validator: ValidatorFn) -> Self {
        Self {
            validator,
            max_workers: profile.max_parallel_agents.max(1),
        }
    }
}

#[async_trait]
impl TaskExecutor for ValidationExecutor {
    fn validate(&self, task: &Task) -> bool {
        matches!(&task.payload, TaskPayload::Validation(p) if !p.files.is_empty())
    }

    async fn execute(&self, task: &Task) -> Result<TaskResult, ExecutorError> {
        let TaskPayload::Validation(payload) = &task.payload else {
            return Err(ExecutorError::PayloadMismatch(task.kind));
        };

        let start = Instant::now();
        let total = payload.files.len();
        let validator = self.validator.clone();
        let profile = payload.profile.clone();

        let outcome = fan_out(
            payload.files.clone(),
            self.max_workers,
            task.timeout,
            move |file: String| {
                let validator = validator.clone();
                let profile = profile.clone();
                async move {
                    run_blocking(move || {
                        validator(&file, &profile)
                            .map(|report| (file.clone(), report))
                            .map_err(|e| format!("Validation '{file}' failed: {e}"))
                    })
                    .await
                }
            },
        )
        .await;

        let mut files = serde_json::Map::new();
        let mut error_count = 0;
        let mut warning_count = 0;
        for (file, report) in &outcome.settled {
            error_count += report.errors.len();
            warning_count += report.warnings.len();
            files.insert(
                file.clone(),
                json!({
                    "errors": report.errors,
                    "warnings": report.warnings,
                    "passed": report.passed(),
                }),
            );
        }
        let passed = error_count == 0 && outcome.errors.is_empty() && !outcome.timed_out;
        let value = json!({
            "files": files,
            "summary": {
                "profile": payload.profile,
                "total_files": total,
                "validated": outcome.settled.len(),
                "errors": error_count,
                "warnings": warning_count,
                "passed": passed,
            },
        });

        let mut result = if outcome.timed_out {
            TaskResult::timed_out(
                task,
                format!(
                    "Validation timed out after {:.1}s with {} files unsettled",
                    task.timeout.as_secs_f64(),
                    outcome.abandoned
                ),
            )
        } else if !outcome.errors.is_empty() {
            TaskResult::failed(task, outcome.errors.join("; "))
        } else {
            TaskResult::completed(task, Value::Null)
        };
        result.value = Some(value);

        Ok(result
            .with_duration_ms(start.elapsed().as_millis() as u64)
            .with_fan_out(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{SearchPayload, TaskKind, TaskStatus, ValidationPayload};

    fn search_task(patterns: Vec<&str>) -> Task {
        Task::new(
            "search",
            TaskKind::ParallelSearch,
            TaskPayload::ParallelSearch(SearchPayload {
                patterns: patterns.into_iter().map(String::from).collect(),
            }),
        )
    }

    fn validation_task(files: Vec<String>, profile: &str) -> Task {
        Task::new(
            "validate",
            TaskKind::Validation,
            TaskPayload::Validation(ValidationPayload {
                files,
                profile: profile.to_string(),
            }),
        )
    }

    #[tokio::test]
    async fn search_flattens_matches_in_pattern_order() {
        let profile = ExecutionProfile::default();
        let exec = ParallelSearchExecutor::with_search(
            &profile,
            Arc::new(|pattern: &str| -> Result<Vec<Value>, String> {
                Ok(vec![
                    Value::String(format!("{pattern}/1")),
                    Value::String(format!("{pattern}/2")),
                ])
            }),
        );

        let res = exec.execute(&search_task(vec!["a", "b"])).await.unwrap();
        assert!(res.succeeded());
        assert_eq!(res.fan_out_count, 2);
        let value = res.value.unwrap();
        assert_eq!(value["summary"]["matched"], 4);
        assert_eq!(value["matches"][0], "a/1");
        assert_eq!(value["matches"][2], "b/1");
    }

    #[tokio::test]
    async fn search_failure_lists_the_failing_pattern() {
        let profile = ExecutionProfile::default();
        let exec = ParallelSearchExecutor::with_search(
            &profile,
            Arc::new(|pattern: &str| -> Result<Vec<Value>, String> {
                if pattern == "bad" {
                    Err("index unavailable".to_string())
                } else {
                    Ok(vec![])
                }
            }),
        );

        let res = exec.execute(&search_task(vec!["ok", "bad"])).await.unwrap();
        assert_eq!(res.status, TaskStatus::Failed);
        assert!(res.error.unwrap().contains("Search 'bad' failed"));
    }

    #[tokio::test]
    async fn default_search_globs_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.log"), "").unwrap();
        std::fs::write(dir.path().join("y.log"), "").unwrap();
        let pattern = dir.path().join("*.log").to_string_lossy().into_owned();

        let exec = ParallelSearchExecutor::new(&ExecutionProfile::default());
        let res = exec
            .execute(&search_task(vec![pattern.as_str()]))
            .await
            .unwrap();
        assert_eq!(res.value.unwrap()["summary"]["matched"], 2);
    }

    #[tokio::test]
    async fn validation_passes_clean_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("ok.json");
        std::fs::write(&good, r#"{"valid": true}"#).unwrap();

        let exec = ValidationExecutor::new(&ExecutionProfile::default());
        let res = exec
            .execute(&validation_task(
                vec![good.to_string_lossy().into_owned()],
                "development",
            ))
            .await
            .unwrap();

        assert!(res.succeeded());
        let value = res.value.unwrap();
        assert_eq!(value["summary"]["passed"], true);
        assert_eq!(value["summary"]["errors"], 0);
    }

    #[tokio::test]
    async fn validation_findings_complete_with_passed_false() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("broken.json");
        std::fs::write(&bad, "{not json").unwrap();
        let bad = bad.to_string_lossy().into_owned();

        let exec = ValidationExecutor::new(&ExecutionProfile::default());
        let res = exec
            .execute(&validation_task(vec![bad.clone()], "production"))
            .await
            .unwrap();

        assert_eq!(res.status, TaskStatus::Completed);
        assert!(res.error.is_none());
        let value = res.value.unwrap();
        assert_eq!(value["summary"]["passed"], false);
        assert_eq!(value["summary"]["errors"], 1);
        assert_eq!(value["files"][&bad]["passed"], false);
    }

    #[tokio::test]
    async fn validation_reports_missing_files() {
        let exec = ValidationExecutor::new(&ExecutionProfile::default());
        let res = exec
            .execute(&validation_task(
                vec!["/no/such/file.json".to_string()],
                "development",
            ))
            .await
            .unwrap();

        assert_eq!(res.status, TaskStatus::Completed);
        let value = res.value.unwrap();
        assert_eq!(value["summary"]["errors"], 1);
        assert_eq!(value["summary"]["passed"], false);
    }

    #[tokio::test]
    async fn validator_errors_fail_the_task() {
        let exec = ValidationExecutor::with_validator(
            &ExecutionProfile::default(),
            Arc::new(|file: &str, _profile: &str| -> Result<FileReport, String> {
                Err(format!("cannot open {file}"))
            }),
        );
        let res = exec
            .execute(&validation_task(vec!["a.json".to_string()], "development"))
            .await
            .unwrap();

        assert_eq!(res.status, TaskStatus::Failed);
        assert!(res.error.unwrap().contains("Validation 'a.json' failed"));
    }

    #[test]
    fn empty_inputs_are_rejected_up_front() {
        let profile = ExecutionProfile::default();
        assert!(!ParallelSearchExecutor::new(&profile).validate(&search_task(vec![])));
        assert!(!ValidationExecutor::new(&profile)
            .validate(&validation_task(vec![], "development")));
    }
}
