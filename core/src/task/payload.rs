use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TaskKind;

/// Tagged payload, one variant per implemented task kind.
///
/// Reserved kinds (`FileSearch`, `BatchEdit`, `Research`, `Diagnostics`) carry
/// a `Raw` JSON value so embedding callers can register their own executors
/// without extending this enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskPayload {
    DockerRun(DockerRunPayload),
    GpuInference(GpuInferencePayload),
    Upsert(UpsertPayload),
    Downsert(DownsertPayload),
    RegistrySync(RegistrySyncPayload),
    ParallelSearch(SearchPayload),
    Validation(ValidationPayload),
    Raw(Value),
}

impl TaskPayload {
    /// Whether the payload variant is the one expected for `kind`. Reserved
    /// kinds accept `Raw` only.
    pub fn matches_kind(&self, kind: TaskKind) -> bool {
        matches!(
            (self, kind),
            (Self::DockerRun(_), TaskKind::DockerRun)
                | (Self::GpuInference(_), TaskKind::GpuInference)
                | (Self::Upsert(_), TaskKind::Upsert)
                | (Self::Downsert(_), TaskKind::Downsert)
                | (Self::RegistrySync(_), TaskKind::RegistrySync)
                | (Self::ParallelSearch(_), TaskKind::ParallelSearch)
                | (Self::Validation(_), TaskKind::Validation)
                | (
                    Self::Raw(_),
                    TaskKind::FileSearch
                        | TaskKind::BatchEdit
                        | TaskKind::Research
                        | TaskKind::Diagnostics
                )
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockerRunPayload {
    pub image: String,

    #[serde(default)]
    pub command: Vec<String>,

    #[serde(default)]
    pub gpu: bool,

    /// host path -> container path
    #[serde(default)]
    pub volumes: BTreeMap<String, String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub workdir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuInferencePayload {
    #[serde(default = "default_model_type")]
    pub model_type: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_model_type() -> String {
    "arcface".to_string()
}

fn default_batch_size() -> u32 {
    1
}

impl Default for GpuInferencePayload {
    fn default() -> Self {
        Self {
            model_type: default_model_type(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertPayload {
    pub items: Vec<UpsertItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertItem {
    /// File path or store key, backend-dependent.
    pub target: String,

    /// Structured data is serialized, strings are written verbatim,
    /// everything else is stringified.
    pub data: Value,

    /// Optional expiry, honored by store backends and ignored by the
    /// filesystem backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
}

impl UpsertItem {
    pub fn new(target: impl Into<String>, data: Value) -> Self {
        Self {
            target: target.into(),
            data,
            ttl_seconds: None,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownsertPayload {
    #[serde(default)]
    pub targets: Vec<String>,

    /// Glob/match expression resolved to concrete targets before deletion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryAction {
    List,
    Pull,
    Push,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySyncPayload {
    pub action: RegistryAction,

    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPayload {
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationPayload {
    pub files: Vec<String>,

    #[serde(default = "default_validation_profile")]
    pub profile: String,
}

fn default_validation_profile() -> String {
    "development".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn payload_kind_matching() {
        let p = TaskPayload::Upsert(UpsertPayload { items: vec![] });
        assert!(p.matches_kind(TaskKind::Upsert));
        assert!(!p.matches_kind(TaskKind::Downsert));

        let raw = TaskPayload::Raw(Value::Null);
        assert!(raw.matches_kind(TaskKind::Research));
        assert!(!raw.matches_kind(TaskKind::DockerRun));
    }

    #[test]
    fn downsert_accepts_pattern_only() {
        let json = r#"{"type": "downsert", "pattern": "cache/*"}"#;
        let p: TaskPayload = serde_json::from_str(json).unwrap();
        match p {
            TaskPayload::Downsert(d) => {
                assert!(d.targets.is_empty());
                assert_eq!(d.pattern.as_deref(), Some("cache/*"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
