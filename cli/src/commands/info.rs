use subagent_core::api::OrchestratorConfig;

/// Print the alias -> image table the orchestrator resolves against.
pub fn images(config: &OrchestratorConfig) -> anyhow::Result<i32> {
    println!("{}", serde_json::to_string_pretty(&config.registry.images)?);
    Ok(0)
}

/// Print the effective configuration after defaults are applied.
pub fn config(config: &OrchestratorConfig) -> anyhow::Result<i32> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(0)
}
