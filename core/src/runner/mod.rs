//! Subprocess collaborator contract.
//!
//! Executors that shell out (container runs, registry sync) go through
//! [`CommandRunner`] instead of spawning processes directly, so tests can
//! substitute a stub and the timeout policy lives in one place.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;

/// Captured outcome of one subprocess invocation. A nonzero exit code is not
/// an error at this layer; `Err` is reserved for spawn failures.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Run an argv with a deadline, capturing stdout/stderr/exit code.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, argv: &[String], timeout: Duration) -> std::io::Result<CommandOutput>;
}

/// Real implementation over `tokio::process`.
///
/// On deadline expiry the child future is dropped with `kill_on_drop`, so the
/// process is signalled but its exit is not awaited - abandoned, not reaped
/// synchronously.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, argv: &[String], timeout: Duration) -> std::io::Result<CommandOutput> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv")
        })?;

        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => {
                let output = output?;
                Ok(CommandOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code: output.status.code().unwrap_or(-1),
                    timed_out: false,
                })
            }
            Err(_) => {
                tracing::warn!(program = %program, ?timeout, "subprocess timed out, killing");
                Ok(CommandOutput {
                    exit_code: -1,
                    timed_out: true,
                    ..Default::default()
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let out = SystemRunner
            .run(&argv(&["sh", "-c", "echo hi"]), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hi");
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_an_error() {
        let out = SystemRunner
            .run(
                &argv(&["sh", "-c", "echo oops >&2; exit 3"]),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert!(!out.success());
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn deadline_marks_timed_out() {
        let start = std::time::Instant::now();
        let out = SystemRunner
            .run(&argv(&["sleep", "10"]), Duration::from_millis(100))
            .await
            .unwrap();
        assert!(out.timed_out);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let res = SystemRunner
            .run(
                &argv(&["definitely-not-a-binary-xyz"]),
                Duration::from_secs(1),
            )
            .await;
        assert!(res.is_err());
    }
}
