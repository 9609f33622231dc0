//! Type-safe external tool execution
//!
//! [`run_tool_safe`] is the only place lhaudit spawns an external program.
//! Going through it guarantees:
//!
//! - Process group isolation, so Chrome dies with Lighthouse
//! - PID registration for cleanup on interrupt
//! - Argument lists built from a [`ToolArgs`] struct, never ad hoc

use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use crate::tool_args::ToolArgs;
use anyhow::{Context, Result};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Execute an external tool with typed arguments.
///
/// # Returns
///
/// - `Ok(output)` with `success == false` when the tool ran and exited non-zero
/// - `Err` when the tool could not be spawned or waited on
pub fn run_tool_safe<T: ToolArgs>(args: &T) -> Result<ToolOutput> {
    let program = args.program();
    let cli_args = args.to_cli_args();

    debug!("run_tool_safe: {} args={:?}", program, cli_args);

    // The report goes to --output-path; only stderr carries anything we use
    let mut cmd = Command::new(program);
    cmd.args(&cli_args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .in_new_process_group();

    let child = cmd
        .spawn()
        .with_context(|| format!("Failed to spawn {}", program))?;
    let pid = child.id();

    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.register(pid);
    }

    let output = child.wait_with_output();

    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.unregister(pid);
    }

    let output = output.with_context(|| format!("Failed waiting for {} (pid {})", program, pid))?;

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code();
    let success = output.status.success();

    if success {
        debug!("{} (pid {}) exited successfully", program, pid);
    } else {
        info!("{} (pid {}) failed with exit code {}", program, pid, exit_code.unwrap_or(-1));
    }

    Ok(ToolOutput {
        stderr,
        exit_code,
        success,
    })
}

/// Output from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the tool exited with code 0.
    pub success: bool,
}

impl ToolOutput {
    /// Check if the tool succeeded and return an error if not.
    pub fn ensure_success(&self, context: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            anyhow::bail!(
                "{} failed (exit code {}): {}",
                context,
                self.exit_code.unwrap_or(-1),
                self.last_stderr_line()
            )
        }
    }

    /// Last non-empty stderr line; Lighthouse puts its fatal error there
    pub fn last_stderr_line(&self) -> &str {
        self.stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bash(&'static str);

    impl ToolArgs for Bash {
        fn program(&self) -> &str {
            "bash"
        }

        fn to_cli_args(&self) -> Vec<String> {
            vec!["-c".to_string(), self.0.to_string()]
        }
    }

    struct Missing;

    impl ToolArgs for Missing {
        fn program(&self) -> &str {
            "/nonexistent/lighthouse-binary"
        }

        fn to_cli_args(&self) -> Vec<String> {
            vec![]
        }
    }

    #[test]
    fn test_captures_stderr() {
        let output = run_tool_safe(&Bash("echo out; echo err >&2")).unwrap();
        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stderr.trim(), "err");
        assert!(output.ensure_success("echo").is_ok());
    }

    #[test]
    fn test_non_zero_exit_is_ok_with_failure() {
        let output = run_tool_safe(&Bash("echo 'first' >&2; echo 'Runtime error' >&2; exit 3")).unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.last_stderr_line(), "Runtime error");

        let err = output.ensure_success("audit home").unwrap_err().to_string();
        assert!(err.contains("audit home"));
        assert!(err.contains("exit code 3"));
        assert!(err.contains("Runtime error"));
    }

    #[test]
    fn test_spawn_failure_is_err() {
        let err = run_tool_safe(&Missing).unwrap_err();
        assert!(err.to_string().contains("Failed to spawn"));
    }
}
