use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

/// Top-level orchestrator configuration.
///
/// Loaded once at construction time and passed by reference into every
/// component that needs it. There is no process-wide cached singleton.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Named execution profiles. A profile name that is not present here
    /// resolves to [`ExecutionProfile::default`].
    #[serde(default)]
    pub profiles: BTreeMap<String, ExecutionProfile>,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub gpu: GpuConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl OrchestratorConfig {
    /// Resolve a named profile, falling back to the built-in defaults when
    /// the name is unknown.
    pub fn profile(&self, name: &str) -> ExecutionProfile {
        self.profiles.get(name).cloned().unwrap_or_default()
    }
}

/// Execution profile: the knobs that drive wave sizing and default timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionProfile {
    #[serde(default = "default_max_parallel")]
    pub max_parallel_agents: usize,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,
}

fn default_max_parallel() -> usize {
    8
}

fn default_timeout_seconds() -> f64 {
    30.0
}

impl Default for ExecutionProfile {
    fn default() -> Self {
        Self {
            max_parallel_agents: default_max_parallel(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ExecutionProfile {
    /// Fail fast on a malformed profile at orchestrator construction time.
    pub fn validated(self, name: &str) -> Result<Self, OrchestratorError> {
        if self.max_parallel_agents < 1 {
            return Err(OrchestratorError::InvalidProfile {
                profile: name.to_string(),
                reason: "max_parallel_agents must be >= 1".to_string(),
            });
        }
        if !self.timeout_seconds.is_finite() || self.timeout_seconds <= 0.0 {
            return Err(OrchestratorError::InvalidProfile {
                profile: name.to_string(),
                reason: "timeout_seconds must be > 0".to_string(),
            });
        }
        Ok(self)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }
}

/// Container registry configuration: where precompiled images live and which
/// aliases resolve to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub url: String,

    /// alias -> fully qualified image reference
    #[serde(default = "default_images")]
    pub images: BTreeMap<String, String>,

    /// Substring used by `list` to pick out project images that are not
    /// hosted on the registry.
    #[serde(default = "default_project_filter")]
    pub project_filter: String,
}

fn default_registry_url() -> String {
    "localhost:5000".to_string()
}

fn default_project_filter() -> String {
    "semantic-kernel".to_string()
}

fn default_images() -> BTreeMap<String, String> {
    let url = default_registry_url();
    BTreeMap::from([
        (
            "embeddings".to_string(),
            format!("{url}/semantic-kernel/embeddings:latest"),
        ),
        (
            "vector".to_string(),
            format!("{url}/semantic-kernel/vector:latest"),
        ),
        (
            "engine".to_string(),
            format!("{url}/semantic-kernel/engine:latest"),
        ),
        (
            "face-matcher".to_string(),
            format!("{url}/semantic-kernel/face-matcher:latest"),
        ),
        (
            "tools".to_string(),
            "semantic-kernel-tools:precompiled".to_string(),
        ),
    ])
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            images: default_images(),
            project_filter: default_project_filter(),
        }
    }
}

impl RegistryConfig {
    /// Resolve an image alias through the precompiled table; unknown names
    /// pass through untouched.
    pub fn resolve(&self, image: &str) -> String {
        self.images
            .get(image)
            .cloned()
            .unwrap_or_else(|| image.to_string())
    }

    /// Qualify a bare image name with the registry host.
    pub fn qualify(&self, image: &str) -> String {
        if image.contains('/') {
            image.to_string()
        } else {
            format!("{}/{}", self.url, image)
        }
    }
}

/// GPU environment injected into containers when a task asks for GPU access.
/// Defaults target a single consumer card with 6GB of VRAM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuConfig {
    #[serde(default)]
    pub device_id: u32,

    #[serde(default = "default_memory_fraction")]
    pub memory_fraction: f64,

    #[serde(default = "default_visible_devices")]
    pub cuda_visible_devices: String,

    #[serde(default = "default_nvidia_runtime")]
    pub nvidia_runtime: String,

    #[serde(default = "default_true")]
    pub tensorrt_enabled: bool,

    #[serde(default = "default_true")]
    pub mixed_precision: bool,

    #[serde(default = "default_true")]
    pub tf32_enabled: bool,

    #[serde(default = "default_true")]
    pub flash_attention: bool,

    #[serde(default = "default_memory_pool_mb")]
    pub memory_pool_mb: u64,
}

fn default_memory_fraction() -> f64 {
    0.75
}

fn default_visible_devices() -> String {
    "0".to_string()
}

fn default_nvidia_runtime() -> String {
    "nvidia".to_string()
}

fn default_true() -> bool {
    true
}

fn default_memory_pool_mb() -> u64 {
    4096
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            memory_fraction: default_memory_fraction(),
            cuda_visible_devices: default_visible_devices(),
            nvidia_runtime: default_nvidia_runtime(),
            tensorrt_enabled: default_true(),
            mixed_precision: default_true(),
            tf32_enabled: default_true(),
            flash_attention: default_true(),
            memory_pool_mb: default_memory_pool_mb(),
        }
    }
}

impl GpuConfig {
    /// CUDA environment variables injected into GPU container runs.
    pub fn container_env(&self) -> Vec<(String, String)> {
        vec![
            (
                "CUDA_VISIBLE_DEVICES".to_string(),
                self.cuda_visible_devices.clone(),
            ),
            (
                "CUDA_MEMORY_FRACTION".to_string(),
                self.memory_fraction.to_string(),
            ),
            (
                "CUDA_MIXED_PRECISION".to_string(),
                self.mixed_precision.to_string(),
            ),
            (
                "CUDA_TF32_ENABLED".to_string(),
                self.tf32_enabled.to_string(),
            ),
            (
                "NVIDIA_DRIVER_CAPABILITIES".to_string(),
                "compute,utility".to_string(),
            ),
            ("NVIDIA_VISIBLE_DEVICES".to_string(), "all".to_string()),
        ]
    }
}

/// Logging knobs consumed by the CLI when wiring up tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// EnvFilter string, e.g. "info" or "subagent_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_logging_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_values() {
        let profile = ExecutionProfile::default();
        assert_eq!(profile.max_parallel_agents, 8);
        assert_eq!(profile.timeout_seconds, 30.0);
        assert_eq!(profile.default_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn unknown_profile_falls_back_to_defaults() {
        let cfg = OrchestratorConfig::default();
        let profile = cfg.profile("does-not-exist");
        assert_eq!(profile.max_parallel_agents, 8);
    }

    #[test]
    fn profile_validation_rejects_zero_parallelism() {
        let profile = ExecutionProfile {
            max_parallel_agents: 0,
            timeout_seconds: 30.0,
        };
        assert!(profile.validated("bad").is_err());
    }

    #[test]
    fn registry_alias_resolution() {
        let registry = RegistryConfig::default();
        assert_eq!(
            registry.resolve("embeddings"),
            "localhost:5000/semantic-kernel/embeddings:latest"
        );
        assert_eq!(registry.resolve("alpine"), "alpine");
        assert_eq!(registry.qualify("alpine"), "localhost:5000/alpine");
        assert_eq!(registry.qualify("library/alpine"), "library/alpine");
    }
}
