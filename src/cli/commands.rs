//! CLI command definitions using clap.
//!
//! - run: one orchestration pass
//! - add / import: register companies
//! - status / show: inspect the store
//! - reset: make items pending again
//! - export: dump successful results

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// orderscout - extract company order histories with a browser automation agent
#[derive(Parser, Debug)]
#[command(name = "orderscout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the database path from the config
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Overrides for a pass
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Most agent tasks running at once
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Most items fetched for this pass
    #[arg(short, long)]
    pub batch_limit: Option<usize>,

    /// Per-task timeout in seconds
    #[arg(short, long)]
    pub timeout_secs: Option<u64>,

    /// Use a mock agent that returns empty histories
    #[arg(long)]
    pub dry_run: bool,
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one extraction pass over pending companies
    Run(RunArgs),

    /// Add a company to the store
    Add {
        /// Company name
        name: String,

        /// Page where the company's records live
        url: String,
    },

    /// Import companies from a JSON lines file of {company_name, info_url}
    Import {
        file: PathBuf,
    },

    /// Show outcome counts
    Status,

    /// Show one stored company
    Show {
        id: String,
    },

    /// Clear outcomes so companies are pending again
    Reset {
        /// Company id to reset
        #[arg(required_unless_present = "failed", conflicts_with = "failed")]
        id: Option<String>,

        /// Reset every failed company
        #[arg(long)]
        failed: bool,
    },

    /// Write successful results as JSON lines
    Export {
        file: PathBuf,
    },
}
