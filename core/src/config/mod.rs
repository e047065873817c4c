//! Orchestrator configuration: execution profiles, registry alias table and
//! GPU environment, loaded from TOML with sane built-in defaults.

mod load;
mod types;

pub use load::{load_default, load_from, DEFAULT_CONFIG_FILE};
pub use types::{
    ExecutionProfile, GpuConfig, LoggingConfig, OrchestratorConfig, RegistryConfig,
};
