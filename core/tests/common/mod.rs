//! Shared test doubles for the integration suite.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use subagent_core::api::{
    CommandOutput, CommandRunner, ExecutorError, Task, TaskExecutor, TaskKind, TaskPayload,
    TaskResult,
};

/// Executor that completes (or fails) after an optional delay and records
/// how many invocations were in flight at once.
pub struct ScriptedExecutor {
    pub fail: bool,
    pub delay: Duration,
    pub calls: AtomicUsize,
    active: AtomicUsize,
    pub peak: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn completing() -> Arc<Self> {
        Self::new(Duration::ZERO, false)
    }

    pub fn failing() -> Arc<Self> {
        Self::new(Duration::ZERO, true)
    }

    pub fn new(delay: Duration, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            fail,
            delay,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    fn validate(&self, _task: &Task) -> bool {
        true
    }

    async fn execute(&self, task: &Task) -> Result<TaskResult, ExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            Ok(TaskResult::failed(task, "scripted failure"))
        } else {
            Ok(TaskResult::completed(task, json!({"ok": true})).with_duration_ms(1))
        }
    }
}

/// Command runner that replays queued outputs and records every argv.
#[derive(Default)]
pub struct ReplayRunner {
    outputs: Mutex<Vec<std::io::Result<CommandOutput>>>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl ReplayRunner {
    pub fn with_outputs(outputs: Vec<std::io::Result<CommandOutput>>) -> Arc<Self> {
        Arc::new(Self {
            outputs: Mutex::new(outputs),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn succeeding(stdout: &str) -> Arc<Self> {
        Self::with_outputs(vec![Ok(CommandOutput {
            stdout: stdout.to_string(),
            ..Default::default()
        })])
    }
}

#[async_trait]
impl CommandRunner for ReplayRunner {
    async fn run(&self, argv: &[String], _timeout: Duration) -> std::io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(argv.to_vec());
        let mut outputs = self.outputs.lock().unwrap();
        if outputs.is_empty() {
            Ok(CommandOutput::default())
        } else {
            outputs.remove(0)
        }
    }
}

pub fn raw_task(id: &str, kind: TaskKind) -> Task {
    Task::new(id, kind, TaskPayload::Raw(serde_json::Value::Null))
}
