//! Typed argument contracts for external tool invocations.
//!
//! Instead of assembling raw string vectors at call sites, each external
//! invocation is a struct implementing [`ToolArgs`]. The struct definition is
//! the contract: flag spellings live in exactly one `to_cli_args` impl.

use crate::types::{Category, FormFactor};
use std::path::PathBuf;

/// Chrome flags passed to every Lighthouse run unless configured otherwise
pub const DEFAULT_CHROME_FLAGS: &[&str] = &["--headless", "--no-sandbox"];

/// Load timeout handed to Lighthouse, in milliseconds
pub const DEFAULT_MAX_WAIT_MS: u64 = 45_000;

/// Trait for typed tool arguments.
///
/// # Contract
///
/// - `program()`: executable to launch (name on `PATH` or a path).
/// - `to_cli_args()`: arguments exactly as the tool's parser expects them.
pub trait ToolArgs {
    fn program(&self) -> &str;

    fn to_cli_args(&self) -> Vec<String>;

    /// Shell-style rendering of the command line, for logs and dry runs
    fn command_line(&self) -> String {
        let mut parts = vec![self.program().to_string()];
        parts.extend(self.to_cli_args().into_iter().map(|arg| {
            if arg.contains(' ') {
                format!("'{}'", arg)
            } else {
                arg
            }
        }));
        parts.join(" ")
    }
}

/// Arguments for one `lighthouse` run against one URL and form factor.
#[derive(Debug, Clone)]
pub struct LighthouseArgs {
    /// Executable, `lighthouse` by default
    pub program: String,
    /// Arguments placed before the URL, e.g. `lighthouse` when `program` is `npx`
    pub launcher_args: Vec<String>,
    /// Page URL to audit
    pub url: String,
    /// Where Lighthouse writes its JSON report
    pub output_path: PathBuf,
    pub form_factor: FormFactor,
    /// `--max-wait-for-load` ceiling
    pub max_wait_ms: u64,
    /// Flags for the Chrome instance Lighthouse launches
    pub chrome_flags: Vec<String>,
}

impl ToolArgs for LighthouseArgs {
    fn program(&self) -> &str {
        &self.program
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = self.launcher_args.clone();
        args.extend([
            self.url.clone(),
            format!("--only-categories={}", Category::only_categories_flag()),
            "--output=json".to_string(),
            format!("--output-path={}", self.output_path.display()),
            format!("--chrome-flags={}", self.chrome_flags.join(" ")),
            format!("--max-wait-for-load={}", self.max_wait_ms),
            "--quiet".to_string(),
        ]);
        // Mobile keeps Lighthouse's default emulation
        if self.form_factor == FormFactor::Desktop {
            args.push("--form-factor=desktop".to_string());
            args.push("--screenEmulation.disabled".to_string());
        }
        args
    }
}
