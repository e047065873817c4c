//! Task and result model.
//!
//! A [`Task`] is an immutable unit-of-work descriptor handed to the
//! orchestrator once; a [`TaskResult`] is the single terminal outcome record
//! produced for it. Payloads are a closed sum type ([`TaskPayload`]) so each
//! kind carries its own strongly-typed fields instead of an untyped map.

mod payload;
mod result;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use payload::{
    DockerRunPayload, DownsertPayload, GpuInferencePayload, RegistryAction, RegistrySyncPayload,
    SearchPayload, TaskPayload, UpsertItem, UpsertPayload, ValidationPayload,
};
pub use result::{TaskResult, TaskStatus};

/// Closed enumeration of subagent task kinds.
///
/// Only the first seven have concrete executors; the remaining kinds are
/// reserved extension points and can be registered by embedding callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    DockerRun,
    GpuInference,
    Upsert,
    Downsert,
    RegistrySync,
    ParallelSearch,
    Validation,
    FileSearch,
    BatchEdit,
    Research,
    Diagnostics,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DockerRun => "docker_run",
            Self::GpuInference => "gpu_inference",
            Self::Upsert => "upsert",
            Self::Downsert => "downsert",
            Self::RegistrySync => "registry_sync",
            Self::ParallelSearch => "parallel_search",
            Self::Validation => "validation",
            Self::FileSearch => "file_search",
            Self::BatchEdit => "batch_edit",
            Self::Research => "research",
            Self::Diagnostics => "diagnostics",
        };
        f.write_str(name)
    }
}

/// Immutable task descriptor.
///
/// Constructed by the caller, submitted to the orchestrator once, never
/// mutated afterwards. `max_retries` and `priority` are declared but not
/// consumed by the engine itself: retries are a caller/executor concern and
/// priority is reserved for future scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,

    pub kind: TaskKind,

    pub payload: TaskPayload,

    /// Upper bound on a single execution, including any internal fan-out.
    #[serde(
        rename = "timeout_seconds",
        default = "default_timeout",
        with = "duration_secs"
    )]
    pub timeout: Duration,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub priority: i32,

    /// IDs of tasks that must reach `Completed` before this one may start.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_retries() -> u32 {
    3
}

impl Task {
    pub fn new(id: impl Into<String>, kind: TaskKind, payload: TaskPayload) -> Self {
        Self {
            id: id.into(),
            kind,
            payload,
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            priority: 0,
            dependencies: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// True when the task has no declared dependencies and may run in the
    /// independent waves.
    pub fn is_independent(&self) -> bool {
        self.dependencies.is_empty()
    }
}

/// Serialize `Duration` as fractional seconds, matching the configuration
/// surface (`timeout_seconds`).
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(serde::de::Error::custom(format!(
                "timeout_seconds must be a positive number, got {secs}"
            )));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}
