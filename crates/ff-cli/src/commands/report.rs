//! Report command for flag lifecycle tables.
//!
//! This module implements `ffaudit report`: it pairs flag toggles and
//! measured-rollout entries and writes one CSV file per table.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use ff_core::{RawAuditEvent, ReportSet, classify_all, correlate};

use crate::Config;
use crate::commands::fetch::fetch_events;
use crate::output::write_table_file;

pub const ON_DURATIONS_FILE: &str = "flag_on_durations.csv";
pub const AUTOMATIC_ROLLBACKS_FILE: &str = "rollouts_automatic_rollback.csv";
pub const MANUAL_ROLLBACKS_FILE: &str = "rollouts_manual_rollback.csv";

/// A written report file and its row count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReport {
    pub path: PathBuf,
    pub rows: usize,
}

/// Runs the report command.
pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let events = fetch_events(config)?;
    let reports = build_reports(events);
    let written = write_reports(&config.output_dir, &reports)?;
    write!(writer, "{}", format_summary(&written))?;
    Ok(())
}

/// Classifies and correlates events into the three tables.
pub fn build_reports(events: Vec<RawAuditEvent>) -> ReportSet {
    let classified = classify_all(events);
    let pairs = correlate(classified);
    tracing::debug!(pairs = pairs.len(), "correlated audit events");
    ReportSet::from_pairs(&pairs)
}

/// Writes each table to its own file under `dir`.
pub fn write_reports(dir: &Path, reports: &ReportSet) -> Result<Vec<WrittenReport>> {
    let written = vec![
        WrittenReport {
            path: write_table_file(dir, ON_DURATIONS_FILE, &reports.on_durations)?,
            rows: reports.on_durations.len(),
        },
        WrittenReport {
            path: write_table_file(dir, AUTOMATIC_ROLLBACKS_FILE, &reports.automatic_rollbacks)?,
            rows: reports.automatic_rollbacks.len(),
        },
        WrittenReport {
            path: write_table_file(dir, MANUAL_ROLLBACKS_FILE, &reports.manual_rollbacks)?,
            rows: reports.manual_rollbacks.len(),
        },
    ];
    Ok(written)
}

fn format_summary(written: &[WrittenReport]) -> String {
    written
        .iter()
        .map(|report| {
            let noun = if report.rows == 1 { "row" } else { "rows" };
            format!("Wrote {} {noun} to {}\n", report.rows, report.path.display())
        })
        .collect()
}
