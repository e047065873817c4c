use std::path::Path;

use anyhow::Context;
use serde_json::Value;
use subagent_core::api::{full_orchestrator, OrchestratorConfig, Task};

use super::emit_result;

/// Execute a batch described in a JSON file: either a single task object or
/// an array of tasks.
pub async fn run(
    config: OrchestratorConfig,
    profile: &str,
    progress: bool,
    file: &Path,
    report: bool,
) -> anyhow::Result<i32> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading task file {}", file.display()))?;
    let parsed: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing task file {}", file.display()))?;

    let tasks: Vec<Task> = if parsed.is_array() {
        serde_json::from_value(parsed)?
    } else {
        vec![serde_json::from_value(parsed)?]
    };

    let mut orch = full_orchestrator(config, profile)?.with_progress(progress);
    let results = orch.execute_batch(tasks).await?;
    let run_report = orch.generate_report();

    if results.len() == 1 && !report {
        return emit_result(&results[0]);
    }

    if report {
        println!("{}", serde_json::to_string_pretty(&run_report)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&run_report.summary)?);
    }
    Ok(if run_report.all_succeeded() { 0 } else { 1 })
}
