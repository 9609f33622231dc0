//! Audit orchestration: one Lighthouse run per (page, form factor).
//!
//! Jobs are queued on a channel and drained by a pool of worker threads.
//! With no concurrency limit the pool has one worker per job, so every
//! audit starts at once. Each job settles independently: a failing
//! audit is logged and recorded, never propagated to its siblings.

use crate::error::Result;
use crate::pages::{result_file_name, PageEntry, PageRegistry};
use crate::tool_args::{LighthouseArgs, ToolArgs, DEFAULT_CHROME_FLAGS, DEFAULT_MAX_WAIT_MS};
use crate::tool_runner::run_tool_safe;
use crate::types::FormFactor;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// One Lighthouse invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditJob {
    pub page: PageEntry,
    pub form_factor: FormFactor,
    pub url: String,
    pub output_path: PathBuf,
}

impl AuditJob {
    pub fn lighthouse_args(&self, settings: &RunSettings) -> LighthouseArgs {
        LighthouseArgs {
            program: settings.program.clone(),
            launcher_args: settings.program_args.clone(),
            url: self.url.clone(),
            output_path: self.output_path.clone(),
            form_factor: self.form_factor,
            max_wait_ms: settings.max_wait_ms,
            chrome_flags: settings.chrome_flags.clone(),
        }
    }
}

/// Knobs shared by every job in a run
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Lighthouse executable
    pub program: String,
    /// Leading arguments for `program`, before the URL
    pub program_args: Vec<String>,
    pub max_wait_ms: u64,
    pub chrome_flags: Vec<String>,
    /// Maximum simultaneous audits; `None` starts them all at once
    pub concurrency: Option<usize>,
    /// Print command lines instead of running them
    pub dry_run: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            program: "lighthouse".to_string(),
            program_args: vec![],
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
            chrome_flags: DEFAULT_CHROME_FLAGS.iter().map(|s| s.to_string()).collect(),
            concurrency: None,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    Failed(String),
    /// Dry run: nothing was spawned
    Skipped,
}

#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job: AuditJob,
    pub status: JobStatus,
}

/// Outcomes of a run, in plan order
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<JobOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Succeeded))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Skipped))
    }

    fn count(&self, pred: impl Fn(&JobStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Jobs for every page, page-major, desktop before mobile
pub fn plan_jobs(registry: &PageRegistry, base_url: &str, out_dir: &Path) -> Vec<AuditJob> {
    registry
        .iter()
        .flat_map(|page| {
            FormFactor::all().into_iter().map(move |form_factor| AuditJob {
                page: page.clone(),
                form_factor,
                url: page.url(base_url),
                output_path: out_dir.join(result_file_name(page, form_factor)),
            })
        })
        .collect()
}

/// Create the directory result files are written to
pub fn prepare_output_dir(out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;
    Ok(())
}

/// Run every job and wait until all of them have settled.
pub fn run_audits(jobs: Vec<AuditJob>, settings: &RunSettings) -> RunSummary {
    if jobs.is_empty() {
        return RunSummary::default();
    }

    let workers = settings.concurrency.unwrap_or(jobs.len()).clamp(1, jobs.len());
    info!("starting {} audit(s) with {} worker(s)", jobs.len(), workers);

    let (job_tx, job_rx) = mpsc::channel::<(usize, AuditJob)>();
    for entry in jobs.into_iter().enumerate() {
        // Receiver is alive until the end of this function
        let _ = job_tx.send(entry);
    }
    drop(job_tx);
    let job_rx = Mutex::new(job_rx);

    let (outcome_tx, outcome_rx) = mpsc::channel::<(usize, JobOutcome)>();

    std::thread::scope(|scope| {
        for worker in 0..workers {
            let job_rx = &job_rx;
            let outcome_tx = outcome_tx.clone();
            scope.spawn(move || {
                debug!(worker, "audit worker started");
                loop {
                    let next = match job_rx.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => break,
                    };
                    let Ok((index, job)) = next else { break };

                    let status = execute_job(&job, settings);
                    print_progress(&job, &status);

                    if outcome_tx.send((index, JobOutcome { job, status })).is_err() {
                        break;
                    }
                }
                debug!(worker, "audit worker finished");
            });
        }
    });
    drop(outcome_tx);

    let mut outcomes: Vec<(usize, JobOutcome)> = outcome_rx.into_iter().collect();
    outcomes.sort_by_key(|(index, _)| *index);

    RunSummary {
        outcomes: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
    }
}

fn execute_job(job: &AuditJob, settings: &RunSettings) -> JobStatus {
    let args = job.lighthouse_args(settings);

    if settings.dry_run {
        println!("[DRY RUN] {}", args.command_line());
        return JobStatus::Skipped;
    }

    // A stale file from an earlier run would mask a failure of this one
    if let Err(e) = std::fs::remove_file(&job.output_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("could not remove stale {}: {}", job.output_path.display(), e);
        }
    }

    let status = match run_tool_safe(&args).and_then(|output| output.ensure_success(&args.program)) {
        Err(e) => JobStatus::Failed(format!("{:#}", e)),
        Ok(()) if !job.output_path.is_file() => {
            JobStatus::Failed("exited successfully but wrote no result file".to_string())
        }
        Ok(()) => JobStatus::Succeeded,
    };

    if let JobStatus::Failed(reason) = &status {
        warn!(
            page = %job.page.name,
            form_factor = %job.form_factor,
            url = %job.url,
            "audit failed: {}",
            reason
        );
    }
    status
}

fn print_progress(job: &AuditJob, status: &JobStatus) {
    match status {
        JobStatus::Succeeded => println!(
            "✓ {} ({}) -> {}",
            job.page.name,
            job.form_factor,
            job.output_path.display()
        ),
        JobStatus::Failed(reason) => {
            println!("✗ {} ({}) failed: {}", job.page.name, job.form_factor, reason)
        }
        JobStatus::Skipped => {}
    }
}
