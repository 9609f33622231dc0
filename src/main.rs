//! lhaudit - main entry point
//!
//! Wires the CLI to the audit runner and the Markdown reporter.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use lhaudit::cli::{Cli, Commands};
use lhaudit::config::AuditConfig;
use lhaudit::process_guard;
use lhaudit::report::{build_report, render_markdown};
use lhaudit::runner::{plan_jobs, prepare_output_dir, run_audits};

/// Initialize the tracing subscriber; logs go to stderr so stdout stays clean
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);
    debug!("CLI arguments parsed: {:?}", cli);

    // Audit children are killed on SIGINT/SIGTERM/SIGHUP
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            base_url,
            out_dir,
            jobs,
            only,
            lighthouse,
            max_wait_ms,
        } => {
            let mut config = AuditConfig::resolve(cli.config.as_deref())?;
            if let Some(base_url) = base_url {
                config.base_url = base_url;
            }
            if let Some(out_dir) = out_dir {
                config.output_dir = out_dir;
            }
            if let Some(jobs) = jobs {
                config.concurrency = Some(jobs);
            }
            if let Some(lighthouse) = lighthouse {
                config.lighthouse = lighthouse;
            }
            if let Some(max_wait_ms) = max_wait_ms {
                config.max_wait_ms = max_wait_ms;
            }
            config.validate()?;
            run_command(&config, &only, cli.dry_run)
        }
        Commands::Report {
            dir,
            base_url,
            only,
        } => {
            let mut config = AuditConfig::resolve(cli.config.as_deref())?;
            if let Some(base_url) = base_url {
                config.base_url = base_url;
            }
            if let Some(dir) = dir {
                config.output_dir = dir;
            }
            config.validate()?;
            report_command(&config, &only)
        }
        Commands::Pages { base_url } => {
            let mut config = AuditConfig::resolve(cli.config.as_deref())?;
            if let Some(base_url) = base_url {
                config.base_url = base_url;
            }
            config.validate()?;
            for page in &config.pages {
                println!("{:<16} {:<24} {}", page.name, page.label, page.url(&config.base_url));
            }
            Ok(())
        }
        Commands::Validate { config } => validate_command(config),
    }
}

/// Audit every selected page; individual audit failures do not fail the command
fn run_command(config: &AuditConfig, only: &[String], dry_run: bool) -> Result<()> {
    let pages = config.pages.select(only)?;
    if !dry_run {
        prepare_output_dir(&config.output_dir)?;
    }

    info!(
        "Auditing {} page(s) of {} into {}",
        pages.len(),
        config.base_url,
        config.output_dir.display()
    );

    let jobs = plan_jobs(&pages, &config.base_url, &config.output_dir);
    let summary = run_audits(jobs, &config.run_settings(dry_run));

    if dry_run {
        info!("Dry run: {} audit(s) planned", summary.skipped());
    } else {
        println!(
            "\n{} audit(s) succeeded, {} failed",
            summary.succeeded(),
            summary.failed()
        );
    }
    Ok(())
}

/// Print the Markdown table for whatever result files exist
fn report_command(config: &AuditConfig, only: &[String]) -> Result<()> {
    let pages = config.pages.select(only)?;
    let rows = build_report(&pages, &config.base_url, &config.output_dir);

    let unavailable = rows
        .iter()
        .flat_map(|r| [&r.desktop, &r.mobile])
        .filter(|r| !r.status.is_loaded())
        .count();
    if unavailable > 0 {
        info!("{} of {} result file(s) had no usable scores", unavailable, rows.len() * 2);
    }

    print!("{}", render_markdown(&rows));
    Ok(())
}

fn validate_command(path: PathBuf) -> Result<()> {
    info!("Validating configuration file: {:?}", path);
    let config = AuditConfig::load_from_file(&path)?;
    config.validate()?;
    println!(
        "✓ Configuration file is valid: {} page(s) under {}",
        config.pages.len(),
        config.base_url
    );
    Ok(())
}
