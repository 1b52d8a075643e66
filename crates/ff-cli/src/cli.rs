//! Command-line argument definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::commands::util::parse_cutoff;
use crate::config::Config;

/// Feature flag lifecycle reports from the audit log.
///
/// Pairs flag toggles and measured-rollout start/stop entries into
/// durations, and splits rollbacks into automatic and manual.
#[derive(Debug, Parser)]
#[command(name = "ffaudit", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write flag on-duration and rollout rollback reports.
    Report {
        #[command(flatten)]
        fetch: FetchArgs,

        /// Directory to write CSV files into.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Write the consolidated list of flags that were turned off.
    TurnedOff {
        #[command(flatten)]
        fetch: FetchArgs,

        /// Directory to write CSV files into.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Print classified audit events as JSONL.
    Events {
        #[command(flatten)]
        fetch: FetchArgs,
    },
}

/// Audit-log filters shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct FetchArgs {
    /// Project key to search, or `*` for all projects.
    #[arg(long)]
    pub project: Option<String>,

    /// Environment key whose flag changes are reported.
    #[arg(long)]
    pub environment: Option<String>,

    /// Cutoff: epoch milliseconds, ISO 8601, or relative (e.g. "30 days ago").
    #[arg(long)]
    pub after: Option<String>,
}

impl FetchArgs {
    /// Overrides configuration values with the flags that were given.
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(project) = &self.project {
            config.project.clone_from(project);
        }
        if let Some(environment) = &self.environment {
            config.environment.clone_from(environment);
        }
        if let Some(after) = &self.after {
            config.search_date = parse_cutoff(after)?;
        }
        Ok(())
    }
}
