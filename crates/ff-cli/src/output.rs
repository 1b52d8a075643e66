//! CSV table output.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ff_core::Tabular;

/// Writes the header and every row as CSV.
///
/// The header is always written, so empty tables still carry their columns.
pub fn write_table<T: Tabular, W: Write>(writer: W, rows: &[T]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(T::COLUMNS)
        .context("failed to write CSV header")?;
    for row in rows {
        csv.serialize(row).context("failed to write CSV row")?;
    }
    csv.flush().context("failed to flush CSV output")?;
    Ok(())
}

/// Writes a table to `dir/file_name`, creating `dir` if needed.
pub fn write_table_file<T: Tabular>(dir: &Path, file_name: &str, rows: &[T]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(file_name);
    let file = File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    write_table(BufWriter::new(file), rows)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote report");
    Ok(path)
}
