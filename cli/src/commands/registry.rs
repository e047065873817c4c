use subagent_core::api::{
    run_gpu_inference, sync_registry, GpuInferencePayload, OrchestratorConfig, RegistryAction,
    RegistrySyncPayload,
};

use super::emit_result;

pub async fn sync(
    config: OrchestratorConfig,
    profile: &str,
    action: RegistryAction,
    images: Vec<String>,
) -> anyhow::Result<i32> {
    if images.is_empty() && !matches!(action, RegistryAction::List) {
        anyhow::bail!("{action:?} needs at least one image");
    }

    let result = sync_registry(config, profile, RegistrySyncPayload { action, images }).await?;
    emit_result(&result)
}

pub async fn gpu_check(
    config: OrchestratorConfig,
    profile: &str,
    model: String,
    batch_size: u32,
) -> anyhow::Result<i32> {
    let result = run_gpu_inference(
        config,
        profile,
        GpuInferencePayload {
            model_type: model,
            batch_size,
        },
    )
    .await?;
    emit_result(&result)
}
