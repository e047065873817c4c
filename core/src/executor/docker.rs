//! Container executors: plain docker runs, GPU inference probes and registry
//! synchronization.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{GpuConfig, OrchestratorConfig, RegistryConfig};
use crate::error::ExecutorError;
use crate::runner::{CommandRunner, SystemRunner};
use crate::task::{
    DockerRunPayload, GpuInferencePayload, RegistryAction, RegistrySyncPayload, Task, TaskKind,
    TaskPayload, TaskResult,
};

use super::traits::TaskExecutor;

const PULL_TIMEOUT: Duration = Duration::from_secs(120);
const PUSH_TIMEOUT: Duration = Duration::from_secs(300);
const LIST_TIMEOUT: Duration = Duration::from_secs(30);

/// Executor for container run tasks with optional GPU passthrough.
pub struct DockerRunExecutor {
    runner: Arc<dyn CommandRunner>,
    registry: RegistryConfig,
    gpu: GpuConfig,
}

impl DockerRunExecutor {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    pub fn with_runner(config: &OrchestratorConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            registry: config.registry.clone(),
            gpu: config.gpu.clone(),
        }
    }

    fn build_argv(&self, payload: &DockerRunPayload, image: &str) -> Vec<String> {
        let mut argv: Vec<String> = ["docker", "run", "--rm"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if payload.gpu {
            argv.extend(["--gpus".into(), "all".into()]);
            argv.extend(["--runtime".into(), self.gpu.nvidia_runtime.clone()]);
            for (key, value) in self.gpu.container_env() {
                argv.extend(["-e".into(), format!("{key}={value}")]);
            }
        }

        for (host, container) in &payload.volumes {
            argv.extend(["-v".into(), format!("{host}:{container}")]);
        }

        for (key, value) in &payload.env {
            argv.extend(["-e".into(), format!("{key}={value}")]);
        }

        if let Some(workdir) = &payload.workdir {
            argv.extend(["-w".into(), workdir.clone()]);
        }

        argv.push(image.to_string());
        argv.extend(payload.command.iter().cloned());
        argv
    }
}

#[async_trait]
impl TaskExecutor for DockerRunExecutor {
    fn validate(&self, task: &Task) -> bool {
        match &task.payload {
            TaskPayload::DockerRun(p) => !p.image.is_empty(),
            _ => false,
        }
    }

    async fn execute(&self, task: &Task) -> Result<TaskResult, ExecutorError> {
        let TaskPayload::DockerRun(payload) = &task.payload else {
            return Err(ExecutorError::PayloadMismatch(task.kind));
        };

        let image = self.registry.resolve(&payload.image);
        let argv = self.build_argv(payload, &image);
        tracing::debug!(task_id = %task.id, image = %image, gpu = payload.gpu, "docker run");

        let start = Instant::now();
        let result = match self.runner.run(&argv, task.timeout).await {
            Ok(out) if out.timed_out => TaskResult::timed_out(
                task,
                format!("Container timed out after {:.1}s", task.timeout.as_secs_f64()),
            ),
            Ok(out) => {
                let value = json!({
                    "stdout": out.stdout,
                    "stderr": out.stderr,
                    "returncode": out.exit_code,
                });
                if out.exit_code == 0 {
                    TaskResult::completed(task, value)
                } else {
                    let mut res = TaskResult::failed(task, out.stderr.clone());
                    res.value = Some(value);
                    res
                }
            }
            Err(e) => TaskResult::failed(task, e.to_string()),
        };

        Ok(result
            .with_duration_ms(start.elapsed().as_millis() as u64)
            .with_metadata("image", Value::String(image))
            .with_metadata("gpu", Value::Bool(payload.gpu)))
    }
}

/// Executor for GPU-accelerated inference probes, delegating the container
/// run to [`DockerRunExecutor`].
pub struct GpuInferenceExecutor {
    docker: DockerRunExecutor,
    registry: RegistryConfig,
    gpu: GpuConfig,
}

impl GpuInferenceExecutor {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    pub fn with_runner(config: &OrchestratorConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            docker: DockerRunExecutor::with_runner(config, runner),
            registry: config.registry.clone(),
            gpu: config.gpu.clone(),
        }
    }

    fn image_for_model(&self, model_type: &str) -> String {
        let alias = match model_type {
            "arcface" => "face-matcher",
            "vector" => "vector",
            _ => "embeddings",
        };
        self.registry.resolve(alias)
    }

    /// Probe script run inside the inference container: reports ONNX Runtime
    /// provider availability as a single JSON line on stdout.
    fn probe_command(&self, payload: &GpuInferencePayload) -> Vec<String> {
        let script = format!(
            r#"
import json
try:
    import onnxruntime as ort
    providers = ort.get_available_providers()
    print(json.dumps({{
        'cuda_available': 'CUDAExecutionProvider' in providers,
        'tensorrt_available': 'TensorrtExecutionProvider' in providers,
        'providers': providers,
        'batch_size': {batch_size},
        'model_type': '{model_type}',
        'status': 'ready',
    }}))
except Exception as e:
    print(json.dumps({{'error': str(e), 'status': 'failed'}}))
"#,
            batch_size = payload.batch_size,
            model_type = payload.model_type,
        );
        vec!["python".into(), "-c".into(), script]
    }
}

#[async_trait]
impl TaskExecutor for GpuInferenceExecutor {
    fn validate(&self, task: &Task) -> bool {
        match &task.payload {
            // model_type is interpolated into the probe script, so it must
            // stay within identifier characters.
            TaskPayload::GpuInference(p) => {
                !p.model_type.is_empty()
                    && p.batch_size >= 1
                    && p.model_type
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            }
            _ => false,
        }
    }

    async fn execute(&self, task: &Task) -> Result<TaskResult, ExecutorError> {
        let TaskPayload::GpuInference(payload) = &task.payload else {
            return Err(ExecutorError::PayloadMismatch(task.kind));
        };

        let start = Instant::now();
        let docker_task = Task::new(
            format!("{}-docker", task.id),
            TaskKind::DockerRun,
            TaskPayload::DockerRun(DockerRunPayload {
                image: self.image_for_model(&payload.model_type),
                command: self.probe_command(payload),
                gpu: true,
                env: [
                    (
                        "CUDA_MEMORY_FRACTION".to_string(),
                        self.gpu.memory_fraction.to_string(),
                    ),
                    (
                        "ENABLE_TENSORRT".to_string(),
                        self.gpu.tensorrt_enabled.to_string(),
                    ),
                    (
                        "ENABLE_FLASH_ATTENTION".to_string(),
                        self.gpu.flash_attention.to_string(),
                    ),
                ]
                .into_iter()
                .collect(),
                ..Default::default()
            }),
        )
        .with_timeout(task.timeout);

        let docker_result = self.docker.execute(&docker_task).await?;

        // Parse the probe's stdout as JSON, falling back to raw capture.
        let stdout = docker_result
            .value
            .as_ref()
            .and_then(|v| v.get("stdout"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let inference = match serde_json::from_str::<Value>(stdout.trim()) {
            Ok(parsed) => parsed,
            Err(_) => json!({ "raw_output": stdout }),
        };

        let mut result = TaskResult {
            task_id: task.id.clone(),
            kind: task.kind,
            status: docker_result.status,
            value: Some(inference),
            error: docker_result.error,
            duration_ms: start.elapsed().as_millis() as u64,
            fan_out_count: 0,
            metadata: serde_json::Map::new(),
        };
        result = result
            .with_metadata("model_type", Value::String(payload.model_type.clone()))
            .with_metadata("batch_size", json!(payload.batch_size))
            .with_metadata("gpu_config", serde_json::to_value(&self.gpu).unwrap_or(Value::Null));
        Ok(result)
    }
}

/// Executor for registry synchronization: list locally available project
/// images, or pull/push a set of images with per-image outcomes.
pub struct RegistrySyncExecutor {
    runner: Arc<dyn CommandRunner>,
    registry: RegistryConfig,
}

impl RegistrySyncExecutor {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    pub fn with_runner(config: &OrchestratorConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            registry: config.registry.clone(),
        }
    }

    async fn list_images(&self, task: &Task) -> Result<TaskResult, ExecutorError> {
        let argv: Vec<String> = ["docker", "images", "--format", "{{.Repository}}:{{.Tag}}"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        match self.runner.run(&argv, LIST_TIMEOUT.min(task.timeout)).await {
            Ok(out) => {
                let images: Vec<&str> = out
                    .stdout
                    .lines()
                    .filter(|line| {
                        line.contains(&self.registry.url)
                            || line.contains(&self.registry.project_filter)
                    })
                    .collect();
                Ok(TaskResult::completed(
                    task,
                    json!({ "action": "list", "images": images }),
                ))
            }
            Err(e) => Ok(TaskResult::failed(task, e.to_string())),
        }
    }

    async fn transfer_images(
        &self,
        task: &Task,
        payload: &RegistrySyncPayload,
    ) -> Result<TaskResult, ExecutorError> {
        let (verb, per_image_timeout, done) = match payload.action {
            RegistryAction::Pull => ("pull", PULL_TIMEOUT, "pulled"),
            RegistryAction::Push => ("push", PUSH_TIMEOUT, "pushed"),
            RegistryAction::List => unreachable!("list handled separately"),
        };

        let mut entries = Vec::with_capacity(payload.images.len());
        for image in &payload.images {
            let full_image = match payload.action {
                RegistryAction::Pull => self.registry.qualify(image),
                _ => image.clone(),
            };
            let argv = vec!["docker".to_string(), verb.to_string(), full_image.clone()];

            // Each image succeeds or fails independently; only a spawn
            // failure fails the whole task.
            match self
                .runner
                .run(&argv, per_image_timeout.min(task.timeout))
                .await
            {
                Ok(out) if out.success() => {
                    entries.push(json!({ "image": full_image, "status": done }));
                }
                Ok(_) => {
                    entries.push(json!({ "image": full_image, "status": "failed" }));
                }
                Err(e) => return Ok(TaskResult::failed(task, e.to_string())),
            }
        }

        Ok(TaskResult::completed(
            task,
            json!({ "action": verb, "images": entries }),
        ))
    }
}

#[async_trait]
impl TaskExecutor for RegistrySyncExecutor {
    fn validate(&self, task: &Task) -> bool {
        matches!(task.payload, TaskPayload::RegistrySync(_))
    }

    async fn execute(&self, task: &Task) -> Result<TaskResult, ExecutorError> {
        let TaskPayload::RegistrySync(payload) = &task.payload else {
            return Err(ExecutorError::PayloadMismatch(task.kind));
        };

        let start = Instant::now();
        let result = match payload.action {
            RegistryAction::List => self.list_images(task).await?,
            RegistryAction::Pull | RegistryAction::Push => {
                self.transfer_images(task, payload).await?
            }
        };

        Ok(result
            .with_duration_ms(start.elapsed().as_millis() as u64)
            .with_metadata("registry", Value::String(self.registry.url.clone())))
    }
}
