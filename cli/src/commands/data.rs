use serde_json::Value;
use subagent_core::api::{
    batch_downsert, batch_upsert, parallel_search, parallel_validation, OrchestratorConfig,
    UpsertItem,
};

use super::emit_result;

pub async fn upsert(
    config: OrchestratorConfig,
    profile: &str,
    target: String,
    data: String,
    ttl: Option<u64>,
) -> anyhow::Result<i32> {
    // JSON data when it parses, verbatim text otherwise.
    let data: Value = serde_json::from_str(&data).unwrap_or(Value::String(data));
    let mut item = UpsertItem::new(target, data);
    item.ttl_seconds = ttl;

    let result = batch_upsert(config, profile, vec![item]).await?;
    emit_result(&result)
}

pub async fn downsert(
    config: OrchestratorConfig,
    profile: &str,
    targets: Vec<String>,
    pattern: Option<String>,
) -> anyhow::Result<i32> {
    if targets.is_empty() && pattern.is_none() {
        anyhow::bail!("downsert needs at least one target or --pattern");
    }
    let result = batch_downsert(config, profile, targets, pattern).await?;
    emit_result(&result)
}

pub async fn search(
    config: OrchestratorConfig,
    profile: &str,
    patterns: Vec<String>,
) -> anyhow::Result<i32> {
    if patterns.is_empty() {
        anyhow::bail!("search needs at least one pattern");
    }
    let result = parallel_search(config, profile, patterns).await?;
    emit_result(&result)
}

pub async fn validate(
    config: OrchestratorConfig,
    profile: &str,
    files: Vec<String>,
    validation_profile: &str,
) -> anyhow::Result<i32> {
    if files.is_empty() {
        anyhow::bail!("validate needs at least one file");
    }
    let result = parallel_validation(config, profile, files, validation_profile).await?;
    emit_result(&result)
}
