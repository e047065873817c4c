use std::path::Path;

use super::types::OrchestratorConfig;

/// Default config file name looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "orchestrator.toml";

/// Load configuration from `./orchestrator.toml` when present, falling back
/// to built-in defaults otherwise. A missing file is not an error; an
/// unreadable or malformed file is.
pub fn load_default() -> anyhow::Result<OrchestratorConfig> {
    let local = Path::new(DEFAULT_CONFIG_FILE);
    if local.exists() {
        load_from(local)
    } else {
        tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using built-in defaults");
        Ok(OrchestratorConfig::default())
    }
}

/// Load configuration from an explicit path. Unlike [`load_default`], a
/// missing or malformed file here is a hard error: the caller asked for this
/// file specifically.
pub fn load_from(path: &Path) -> anyhow::Result<OrchestratorConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read config {}: {e}", path.display()))?;
    let cfg: OrchestratorConfig = toml::from_str(&s)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
    Ok(cfg)
}
