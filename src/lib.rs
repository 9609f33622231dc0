//! lhaudit library
//!
//! Batch Lighthouse audits for a site's pages: a runner that fans out one
//! `lighthouse` process per (page, form factor), and a reporter that turns
//! the resulting JSON files into a Markdown table.

pub mod cli;
pub mod config;
pub mod error;
pub mod pages;
pub mod process_guard;
pub mod report;
pub mod runner;
pub mod tool_args;
pub mod tool_runner;
pub mod types;

pub use config::AuditConfig;
pub use error::AuditError;
pub use pages::{result_file_name, PageEntry, PageRegistry, DEFAULT_BASE_URL};
pub use process_guard::{ChildRegistry, CommandProcessGroup};
pub use report::{
    build_report, load_result, render_markdown, AuditResult, AuditScores, ReportRow,
    ResultStatus, Score, NO_RESULT,
};
pub use runner::{plan_jobs, run_audits, AuditJob, JobOutcome, JobStatus, RunSettings, RunSummary};
pub use tool_args::{LighthouseArgs, ToolArgs};
pub use tool_runner::{run_tool_safe, ToolOutput};
pub use types::{Category, FormFactor};
