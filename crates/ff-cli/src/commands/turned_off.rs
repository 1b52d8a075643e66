//! Implementation of the `ffaudit turned-off` command.

use std::io::Write;

use anyhow::Result;
use ff_core::{classify_all, turned_off_rows};

use crate::Config;
use crate::commands::fetch::fetch_events;
use crate::output::write_table_file;

pub const TURNED_OFF_FILE: &str = "turned_off_flags.csv";

/// Writes one row per distinct turn-off, newest first.
pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let events = classify_all(fetch_events(config)?);
    let rows = turned_off_rows(&events);
    let path = write_table_file(&config.output_dir, TURNED_OFF_FILE, &rows)?;
    writeln!(
        writer,
        "Extracted and consolidated {} unique entries and saved to {}",
        rows.len(),
        path.display()
    )?;
    Ok(())
}
