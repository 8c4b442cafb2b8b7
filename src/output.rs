use crate::error::Result;
use crate::types::Table;
use crate::util::render_value;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tabled::{settings::Style, Table as TextTable, Tabled};

/// Write `table` as CSV with a header row and no index column.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(table.column_names())?;
    for i in 0..table.n_rows() {
        wtr.write_record(table.row(i).map(render_value))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Pretty-printed JSON run summary, newline terminated. The parent
/// directory is created if needed.
pub fn write_summary_json<T: Serialize>(path: &Path, summary: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, summary)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Markdown table of `rows` under a `title:` line.
pub fn render_preview<T: Tabled + Clone>(title: &str, rows: &[T]) -> String {
    if rows.is_empty() {
        return format!("{title}: nothing to show\n");
    }
    let table = TextTable::new(rows.to_vec())
        .with(Style::markdown())
        .to_string();
    format!("{title}:\n\n{table}\n")
}

pub fn preview_table<T: Tabled + Clone>(title: &str, rows: &[T]) {
    println!("\n{}", render_preview(title, rows));
}
