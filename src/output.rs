use crate::aggregate::PivotTable;
use crate::error::Result;
use crate::reports::execution::ExecutionExportRow;
use crate::util::format_number;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use tracing::info;

/// Header row plus one serialized record per row. An empty slice still
/// produces a file (with no header, as `csv` only learns it from a record).
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = rows.len(), "csv written");
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    info!(path = %path.display(), "json written");
    Ok(())
}

/// Write the filtered execution table to `<output_dir>/execution_filtered.csv`.
pub fn export_execution_csv(output_dir: &Path, rows: &[ExecutionExportRow]) -> Result<PathBuf> {
    let path = output_dir.join("execution_filtered.csv");
    write_csv(&path, rows)?;
    Ok(path)
}

pub fn markdown_table<T>(rows: &[T], max_rows: usize) -> Option<String>
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return None;
    }
    Some(Table::new(slice).with(Style::markdown()).to_string())
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    match markdown_table(rows, max_rows) {
        Some(table) => {
            println!("{}", table);
            if rows.len() > max_rows {
                println!("... {} more rows", rows.len() - max_rows);
            }
            println!();
        }
        None => println!("(no rows)\n"),
    }
}

/// Pivot rendered with row labels in the first column.
pub fn pivot_markdown(pivot: &PivotTable, corner: &str) -> Option<String> {
    if pivot.is_empty() {
        return None;
    }
    let mut builder = Builder::default();
    let mut header = vec![corner.to_string()];
    header.extend(pivot.col_labels.iter().cloned());
    builder.push_record(header);
    for (label, cells) in pivot.row_labels.iter().zip(&pivot.cells) {
        let mut record = vec![label.clone()];
        record.extend(cells.iter().map(|v| format_number(*v, 0)));
        builder.push_record(record);
    }
    Some(builder.build().with(Style::markdown()).to_string())
}

pub fn preview_pivot(title: &str, pivot: &PivotTable, corner: &str) {
    println!("\n{}\n", title);
    match pivot_markdown(pivot, corner) {
        Some(table) => println!("{}\n", table),
        None => println!("(no rows)\n"),
    }
}
