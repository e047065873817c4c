//! Upsert (create-or-update) and downsert (delete-if-exists) executors.
//!
//! The control flow is backend-agnostic: items fan out through the worker
//! pool and each one is applied via an injected backend. The default backend
//! targets the filesystem; [`StoreBackend`] targets any [`KeyedStore`].

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::ExecutionProfile;
use crate::error::ExecutorError;
use crate::store::KeyedStore;
use crate::task::{Task, TaskPayload, TaskResult, UpsertItem};

use super::pool::{fan_out, run_blocking};
use super::traits::TaskExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpsertRecord {
    pub target: String,
    pub action: UpsertAction,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownsertAction {
    Deleted,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownsertRecord {
    pub target: String,
    pub action: DownsertAction,
    pub existed: bool,
    pub bytes_freed: u64,
}

/// Backing store seam for upserts. Implementations are synchronous; the
/// executor runs them on the blocking pool.
pub trait UpsertBackend: Send + Sync {
    fn upsert(&self, target: &str, data: &Value, ttl: Option<Duration>)
        -> anyhow::Result<UpsertRecord>;
}

/// Backing store seam for downserts, including pattern resolution.
pub trait DownsertBackend: Send + Sync {
    fn downsert(&self, target: &str) -> anyhow::Result<DownsertRecord>;

    /// Resolve a glob/match expression to concrete targets.
    fn expand_pattern(&self, pattern: &str) -> anyhow::Result<Vec<String>>;
}

/// Render upsert data: structured values serialized, strings written
/// verbatim, everything else stringified.
fn render_data(data: &Value) -> String {
    match data {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
        }
        other => other.to_string(),
    }
}

/// Default filesystem backend: targets are paths, parent directories are
/// created as needed, directory downserts are recursive. TTLs are ignored.
#[derive(Debug, Default)]
pub struct FsBackend;

impl UpsertBackend for FsBackend {
    fn upsert(
        &self,
        target: &str,
        data: &Value,
        _ttl: Option<Duration>,
    ) -> anyhow::Result<UpsertRecord> {
        let path = Path::new(target);
        let existed = path.exists();
        let content = render_data(data);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, &content)?;

        Ok(UpsertRecord {
            target: target.to_string(),
            action: if existed {
                UpsertAction::Updated
            } else {
                UpsertAction::Created
            },
            size_bytes: content.len(),
        })
    }
}

impl DownsertBackend for FsBackend {
    fn downsert(&self, target: &str) -> anyhow::Result<DownsertRecord> {
        let path = Path::new(target);
        let existed = path.exists();
        let mut bytes_freed = 0;

        if existed {
            if path.is_dir() {
                std::fs::remove_dir_all(path)?;
            } else {
                bytes_freed = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                std::fs::remove_file(path)?;
            }
        }

        Ok(DownsertRecord {
            target: target.to_string(),
            action: if existed {
                DownsertAction::Deleted
            } else {
                DownsertAction::Skipped
            },
            existed,
            bytes_freed,
        })
    }

    fn expand_pattern(&self, pattern: &str) -> anyhow::Result<Vec<String>> {
        let paths = glob::glob(pattern)?;
        let mut targets = Vec::new();
        for path in paths {
            targets.push(path?.to_string_lossy().into_owned());
        }
        Ok(targets)
    }
}

/// Keyed-store backend: targets are keys, patterns resolve through `scan`,
/// and TTLs map to set-with-expiry.
pub struct StoreBackend {
    store: Arc<dyn KeyedStore>,
    default_ttl: Option<Duration>,
}

impl StoreBackend {
    pub fn new(store: Arc<dyn KeyedStore>) -> Self {
        Self {
            store,
            default_ttl: None,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }
}

impl UpsertBackend for StoreBackend {
    fn upsert(
        &self,
        target: &str,
        data: &Value,
        ttl: Option<Duration>,
    ) -> anyhow::Result<UpsertRecord> {
        let existed = self.store.exists(target);
        let content = render_data(data);
        let size_bytes = content.len();

        match ttl.or(self.default_ttl) {
            Some(ttl) => self.store.set_ex(target, content, ttl),
            None => self.store.set(target, content),
        }

        Ok(UpsertRecord {
            target: target.to_string(),
            action: if existed {
                UpsertAction::Updated
            } else {
                UpsertAction::Created
            },
            size_bytes,
        })
    }
}

impl DownsertBackend for StoreBackend {
    fn downsert(&self, target: &str) -> anyhow::Result<DownsertRecord> {
        let bytes_freed = self.store.get(target).map(|v| v.len() as u64).unwrap_or(0);
        let existed = self.store.delete(target);

        Ok(DownsertRecord {
            target: target.to_string(),
            action: if existed {
                DownsertAction::Deleted
            } else {
                DownsertAction::Skipped
            },
            existed,
            bytes_freed: if existed { bytes_freed } else { 0 },
        })
    }

    fn expand_pattern(&self, pattern: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.store.scan(pattern))
    }
}

/// Executor for batch create-or-update operations.
pub struct UpsertExecutor {
    backend: Arc<dyn UpsertBackend>,
    max_workers: usize,
}

impl UpsertExecutor {
    pub fn new(profile: &ExecutionProfile) -> Self {
        Self::with_backend(profile, Arc::new(FsBackend))
    }

    pub fn with_backend(profile: &ExecutionProfile, backend: Arc<dyn UpsertBackend>) -> Self {
        Self {
            backend,
            max_workers: profile.max_parallel_agents.max(1),
        }
    }
}

#[async_trait]
impl TaskExecutor for UpsertExecutor {
    fn validate(&self, task: &Task) -> bool {
        match &task.payload {
            TaskPayload::Upsert(p) => p.items.iter().all(|item| !item.target.is_empty()),
            _ => false,
        }
    }

    async fn execute(&self, task: &Task) -> Result<TaskResult, ExecutorError> {
        let TaskPayload::Upsert(payload) = &task.payload else {
            return Err(ExecutorError::PayloadMismatch(task.kind));
        };

        let start = Instant::now();
        let total = payload.items.len();
        let backend = self.backend.clone();

        let outcome = fan_out(
            payload.items.clone(),
            self.max_workers,
            task.timeout,
            move |item: UpsertItem| {
                let backend = backend.clone();
                async move {
                    run_blocking(move || {
                        backend
                            .upsert(&item.target, &item.data, item.ttl())
                            .map_err(|e| format!("Upsert '{}' failed: {e}", item.target))
                    })
                    .await
                }
            },
        )
        .await;

        let created = outcome
            .settled
            .iter()
            .filter(|r| r.action == UpsertAction::Created)
            .count();
        let updated = outcome.settled.len() - created;
        let value = json!({
            "items": outcome.settled,
            "summary": {
                "total": total,
                "succeeded": outcome.settled.len(),
                "failed": outcome.errors.len(),
                "created": created,
                "updated": updated,
            },
        });

        let mut result = if outcome.timed_out {
            TaskResult::timed_out(
                task,
                format!(
                    "Upsert timed out after {:.1}s with {} items unsettled",
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

/// Executor for batch delete-if-exists operations.
pub struct DownsertExecutor {
    backend: Arc<dyn DownsertBackend>,
    max_workers: usize,
}

impl DownsertExecutor {
    pub fn new(profile: &ExecutionProfile) -> Self {
        Self::with_backend(profile, Arc::new(FsBackend))
    }

    pub fn with_backend(profile: &ExecutionProfile, backend: Arc<dyn DownsertBackend>) -> Self {
        Self {
            backend,
            max_workers: profile.max_parallel_agents.max(1),
        }
    }
}

#[async_trait]
impl TaskExecutor for DownsertExecutor {
    fn validate(&self, task: &Task) -> bool {
        match &task.payload {
            TaskPayload::Downsert(p) => !p.targets.is_empty() || p.pattern.is_some(),
            _ => false,
        }
    }

    async fn execute(&self, task: &Task) -> Result<TaskResult, ExecutorError> {
        let TaskPayload::Downsert(payload) = &task.payload else {
            return Err(ExecutorError::PayloadMismatch(task.kind));
        };

        let start = Instant::now();
        let mut targets = payload.targets.clone();
        if let Some(pattern) = payload.pattern.clone() {
            // Pattern expansion walks the backend, so it runs off the
            // async thread like every other backend call.
            let backend = self.backend.clone();
            let expanded = {
                let pattern = pattern.clone();
                run_blocking(move || {
                    backend
                        .expand_pattern(&pattern)
                        .map_err(|e| format!("Pattern '{pattern}' failed: {e}"))
                })
                .await
            };
            match expanded {
                Ok(matched) => targets.extend(matched),
                Err(e) => {
                    return Ok(TaskResult::failed(task, e)
                        .with_duration_ms(start.elapsed().as_millis() as u64));
                }
            }
        }

        let total = targets.len();
        let backend = self.backend.clone();

        let outcome = fan_out(
            targets,
            self.max_workers,
            task.timeout,
            move |target: String| {
                let backend = backend.clone();
                async move {
                    run_blocking(move || {
                        backend
                            .downsert(&target)
                            .map_err(|e| format!("Downsert '{target}' failed: {e}"))
                    })
                    .await
                }
            },
        )
        .await;

        let deleted = outcome
            .settled
            .iter()
            .filter(|r| r.action == DownsertAction::Deleted)
            .count();
        let bytes_freed: u64 = outcome.settled.iter().map(|r| r.bytes_freed).sum();
        let value = json!({
            "items": outcome.settled,
            "summary": {
                "total": total,
                "succeeded": outcome.settled.len(),
                "failed": outcome.errors.len(),
                "deleted": deleted,
                "skipped": outcome.settled.len() - deleted,
                "bytes_freed": bytes_freed,
                "pattern": payload.pattern,
            },
        });

        let mut result = if outcome.timed_out {
            TaskResult::timed_out(
                task,
                format!(
                    "Downsert timed out after {:.1}s with {} targets unsettled",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::task::{DownsertPayload, TaskKind, TaskStatus, UpsertPayload};

    fn upsert_task(items: Vec<UpsertItem>) -> Task {
        Task::new(
            "up",
            TaskKind::Upsert,
            TaskPayload::Upsert(UpsertPayload { items }),
        )
    }

    fn downsert_task(targets: Vec<String>, pattern: Option<String>) -> Task {
        Task::new(
            "down",
            TaskKind::Downsert,
            TaskPayload::Downsert(DownsertPayload { targets, pattern }),
        )
    }

    #[tokio::test]
    async fn fs_upsert_reports_created_then_updated() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out.json").to_string_lossy().into_owned();
        let exec = UpsertExecutor::new(&ExecutionProfile::default());

        let res = exec
            .execute(&upsert_task(vec![UpsertItem::new(
                &target,
                json!({"a": 1}),
            )]))
            .await
            .unwrap();
        assert!(res.succeeded());
        let value = res.value.clone().unwrap();
        assert_eq!(value["items"][0]["action"], "created");
        assert_eq!(value["summary"]["created"], 1);

        let res = exec
            .execute(&upsert_task(vec![UpsertItem::new(
                &target,
                json!({"a": 2}),
            )]))
            .await
            .unwrap();
        let value = res.value.unwrap();
        assert_eq!(value["items"][0]["action"], "updated");

        // Round-trip: the target reflects the latest data.
        let content = std::fs::read_to_string(&target).unwrap();
        let parsed: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["a"], 2);
    }

    #[tokio::test]
    async fn fs_upsert_writes_strings_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("note.txt").to_string_lossy().into_owned();
        let exec = UpsertExecutor::new(&ExecutionProfile::default());

        exec.execute(&upsert_task(vec![UpsertItem::new(
            &target,
            Value::String("plain text".into()),
        )]))
        .await
        .unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "plain text");
    }

    #[tokio::test]
    async fn upsert_aggregates_partial_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut items = Vec::new();
        for i in 0..7 {
            let target = dir.path().join(format!("ok-{i}")).to_string_lossy().into_owned();
            items.push(UpsertItem::new(target, json!(i)));
        }
        // Directory targets make the write fail.
        for i in 0..3 {
            let bad = dir.path().join(format!("bad-{i}"));
            std::fs::create_dir(&bad).unwrap();
            items.push(UpsertItem::new(
                bad.to_string_lossy().into_owned(),
                json!(i),
            ));
        }

        let exec = UpsertExecutor::new(&ExecutionProfile::default());
        let res = exec.execute(&upsert_task(items)).await.unwrap();

        assert_eq!(res.status, TaskStatus::Failed);
        assert_eq!(res.fan_out_count, 10);
        let value = res.value.unwrap();
        assert_eq!(value["summary"]["succeeded"], 7);
        assert_eq!(value["summary"]["failed"], 3);
        let error = res.error.unwrap();
        for i in 0..3 {
            assert!(error.contains(&format!("bad-{i}")), "missing bad-{i}: {error}");
        }
    }

    #[tokio::test]
    async fn fs_downsert_skips_missing_targets() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing").to_string_lossy().into_owned();
        let exec = DownsertExecutor::new(&ExecutionProfile::default());

        let res = exec.execute(&downsert_task(vec![missing], None)).await.unwrap();
        assert!(res.succeeded());
        let value = res.value.unwrap();
        assert_eq!(value["items"][0]["action"], "skipped");
        assert_eq!(value["items"][0]["existed"], false);
    }

    #[tokio::test]
    async fn fs_downsert_deletes_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "12345").unwrap();
        let sub = dir.path().join("subdir");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("inner"), "x").unwrap();

        let exec = DownsertExecutor::new(&ExecutionProfile::default());
        let res = exec
            .execute(&downsert_task(
                vec![
                    file.to_string_lossy().into_owned(),
                    sub.to_string_lossy().into_owned(),
                ],
                None,
            ))
            .await
            .unwrap();

        assert!(res.succeeded());
        let value = res.value.unwrap();
        assert_eq!(value["summary"]["deleted"], 2);
        assert_eq!(value["summary"]["bytes_freed"], 5);
        assert!(!file.exists());
        assert!(!sub.exists());
    }

    #[tokio::test]
    async fn fs_downsert_resolves_glob_patterns() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.tmp", "b.tmp", "keep.txt"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        let pattern = dir.path().join("*.tmp").to_string_lossy().into_owned();

        let exec = DownsertExecutor::new(&ExecutionProfile::default());
        let res = exec.execute(&downsert_task(vec![], Some(pattern))).await.unwrap();

        assert!(res.succeeded());
        assert_eq!(res.value.unwrap()["summary"]["deleted"], 2);
        assert!(dir.path().join("keep.txt").exists());
    }

    #[tokio::test]
    async fn unparseable_pattern_fails_the_downsert() {
        let exec = DownsertExecutor::new(&ExecutionProfile::default());
        let res = exec
            .execute(&downsert_task(vec![], Some("[".into())))
            .await
            .unwrap();

        assert_eq!(res.status, TaskStatus::Failed);
        assert!(res.error.unwrap().contains("Pattern '['"));
    }

    #[tokio::test]
    async fn store_backend_honors_ttl_and_patterns() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(StoreBackend::new(store.clone()));
        let profile = ExecutionProfile::default();

        let upsert = UpsertExecutor::with_backend(&profile, backend.clone());
        let mut item = UpsertItem::new("cache/session", json!({"user": 1}));
        item.ttl_seconds = Some(3600);
        let res = upsert
            .execute(&upsert_task(vec![
                item,
                UpsertItem::new("cache/other", Value::String("v".into())),
                UpsertItem::new("data/keep", Value::String("k".into())),
            ]))
            .await
            .unwrap();
        assert!(res.succeeded());
        assert!(store.exists("cache/session"));

        let downsert = DownsertExecutor::with_backend(&profile, backend);
        let res = downsert
            .execute(&downsert_task(vec![], Some("cache/*".into())))
            .await
            .unwrap();
        assert!(res.succeeded());
        let value = res.value.unwrap();
        assert_eq!(value["summary"]["deleted"], 2);
        assert!(value["summary"]["bytes_freed"].as_u64().unwrap() > 0);
        assert!(!store.exists("cache/session"));
        assert!(store.exists("data/keep"));
    }

    #[test]
    fn downsert_requires_targets_or_pattern() {
        let exec = DownsertExecutor::new(&ExecutionProfile::default());
        assert!(!exec.validate(&downsert_task(vec![], None)));
        assert!(exec.validate(&downsert_task(vec!["x".into()], None)));
        assert!(exec.validate(&downsert_task(vec![], Some("*".into()))));
    }
}
