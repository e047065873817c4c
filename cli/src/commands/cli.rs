use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use subagent_core::api::RegistryAction;

#[derive(Parser, Debug)]
#[command(
    name = "subagent",
    about = "Run batches of subagent tasks with bounded parallelism",
    version
)]
pub struct Args {
    /// Execution profile to run under.
    #[arg(long, global = true, default_value = "development")]
    pub profile: String,

    /// Path to a TOML config file. Defaults to `orchestrator.toml` in the
    /// working directory; built-in defaults are used when it is absent.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show live progress bars while the batch runs.
    #[arg(long, global = true)]
    pub progress: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a batch of tasks described in a JSON file.
    Run {
        /// JSON file containing one task object or an array of tasks.
        file: PathBuf,

        /// Print the full run report instead of just the summary.
        #[arg(long)]
        report: bool,
    },

    /// Create or update a single target.
    Upsert {
        target: String,

        /// JSON value to write; plain strings are written verbatim.
        data: String,

        /// Expiry in seconds (store backends only).
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Delete targets if they exist.
    Downsert {
        targets: Vec<String>,

        /// Glob pattern expanded into additional targets.
        #[arg(long)]
        pattern: Option<String>,
    },

    /// List, pull, or push images against the configured registry.
    Registry {
        #[arg(value_enum)]
        action: RegistryActionArg,

        /// Image names or aliases. Ignored by `list`.
        images: Vec<String>,
    },

    /// Probe GPU inference readiness for a model type.
    GpuCheck {
        #[arg(long, default_value = "arcface")]
        model: String,

        #[arg(long, default_value_t = 1)]
        batch_size: u32,
    },

    /// Search the filesystem with one or more glob patterns.
    Search { patterns: Vec<String> },

    /// Validate a set of files.
    Validate {
        files: Vec<String>,

        /// Validation profile name.
        #[arg(long, default_value = "development")]
        validation_profile: String,
    },

    /// Print the precompiled image alias table.
    Images,

    /// Print the effective configuration.
    Config,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum RegistryActionArg {
    List,
    Pull,
    Push,
}

impl From<RegistryActionArg> for RegistryAction {
    fn from(arg: RegistryActionArg) -> Self {
        match arg {
            RegistryActionArg::List => RegistryAction::List,
            RegistryActionArg::Pull => RegistryAction::Pull,
            RegistryActionArg::Push => RegistryAction::Push,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_profile() {
        let args = Args::parse_from(["subagent", "--profile", "batch", "run", "tasks.json"]);
        assert_eq!(args.profile, "batch");
        assert!(matches!(args.command, Command::Run { .. }));
    }

    #[test]
    fn parses_registry_pull() {
        let args = Args::parse_from(["subagent", "registry", "pull", "embeddings", "vector"]);
        match args.command {
            Command::Registry { action, images } => {
                assert!(matches!(action, RegistryActionArg::Pull));
                assert_eq!(images, vec!["embeddings", "vector"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn downsert_accepts_pattern_without_targets() {
        let args = Args::parse_from(["subagent", "downsert", "--pattern", "/tmp/cache/*"]);
        match args.command {
            Command::Downsert { targets, pattern } => {
                assert!(targets.is_empty());
                assert_eq!(pattern.as_deref(), Some("/tmp/cache/*"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
