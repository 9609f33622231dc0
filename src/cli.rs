use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// lhaudit - Lighthouse audits for every page of a site, as one Markdown table
#[derive(Parser, Debug)]
#[command(name = "lhaudit")]
#[command(about = "Run Lighthouse against a site's pages and summarise the scores")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file (base URL, pages, Lighthouse options)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the Lighthouse command lines instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// More log output on stderr (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Audit every page on desktop and mobile, writing lh-<page>-<form factor>.json files
    Run {
        /// Site root to audit (defaults to the production site)
        base_url: Option<String>,

        /// Directory for result files
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Maximum simultaneous audits (default: all at once)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Only audit these pages (repeatable)
        #[arg(long = "only", value_name = "PAGE")]
        only: Vec<String>,

        /// Lighthouse executable
        #[arg(long)]
        lighthouse: Option<String>,

        /// Page load timeout passed to Lighthouse, in milliseconds
        #[arg(long)]
        max_wait_ms: Option<u64>,
    },
    /// Print a Markdown table of the scores found in existing result files
    Report {
        /// Directory holding result files
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Site root shown in the URL column
        #[arg(long)]
        base_url: Option<String>,

        /// Only report these pages (repeatable)
        #[arg(long = "only", value_name = "PAGE")]
        only: Vec<String>,
    },
    /// List the pages that are audited and reported
    Pages {
        /// Site root used to show full URLs
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
