//! Writer module for producing and updating dashboard workbooks

mod xlsx_writer;

pub use xlsx_writer::{SheetSpec, upsert_sheet_xlsx, write_workbook_xlsx};

use crate::dataset::{RagMetric, RagStatus, SheetKind};
use crate::parse::{RAG_HEADER_ROW, cell_label};
use crate::reader::{self, CellValue};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Column widths of the "RAG Metrics" sheet
pub const RAG_COLUMN_WIDTHS: [f64; 3] = [20.0, 40.0, 10.0];

fn ensure_xlsx(path: &Path) -> Result<()> {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("xlsx") => Ok(()),
        Some("ods") => anyhow::bail!("ODS format not yet supported for writing"),
        _ => anyhow::bail!("Unsupported file format: {}", path.display()),
    }
}

/// Write a new workbook
pub fn write_workbook<P: AsRef<Path>>(path: P, sheets: &[SheetSpec]) -> Result<()> {
    let path = path.as_ref();
    ensure_xlsx(path)?;
    write_workbook_xlsx(path, sheets)
}

/// Copy a workbook, replacing or adding one sheet. `input` and `output` must differ.
pub fn upsert_sheet<P: AsRef<Path>, Q: AsRef<Path>>(
    input_path: P,
    output_path: Q,
    sheet: &SheetSpec,
) -> Result<()> {
    let input = input_path.as_ref();
    let output = output_path.as_ref();
    ensure_xlsx(input)?;
    if input == output {
        anyhow::bail!("Input and output must be different files");
    }
    upsert_sheet_xlsx(input, output, sheet)
}

/// Rows of a freshly created "RAG Metrics" sheet
pub fn default_rag_metrics() -> Vec<RagMetric> {
    [
        ("capabilityAI", "Capability Development in AI"),
        ("accountStrategy", "Account Strategy"),
        ("archDomain", "Architecture & Domain Knowledge"),
    ]
    .into_iter()
    .map(|(key, label)| RagMetric {
        key: key.to_string(),
        label: label.to_string(),
        status: RagStatus::Red,
    })
    .collect()
}

/// "RAG Metrics" sheet for `metrics`: header row, then one row per metric
pub fn rag_sheet(metrics: &[RagMetric]) -> SheetSpec {
    let mut rows = vec![vec!["Key".into(), "Label".into(), "Value".into()]];
    rows.extend(metrics.iter().map(|m| {
        vec![
            CellValue::text(m.key.as_str()),
            CellValue::text(m.label.as_str()),
            CellValue::text(m.status.as_str()),
        ]
    }));
    SheetSpec::new(SheetKind::RagMetrics.sheet_name(), rows).with_column_widths(&RAG_COLUMN_WIDTHS)
}

/// Set the status of RAG metric `key` in the workbook at `path`, in place.
///
/// The sheet is created with the default metrics when missing. Every other
/// row is written back unchanged. Fails when no row carries `key`.
pub fn set_rag_status<P: AsRef<Path>>(path: P, key: &str, status: RagStatus) -> Result<()> {
    let path = path.as_ref();
    ensure_xlsx(path)?;
    let workbook = reader::read_workbook(path)?;

    let mut sheet = match workbook.get_sheet(SheetKind::RagMetrics.sheet_name()) {
        Some(existing) => SheetSpec::new(existing.name.clone(), existing.rows.clone())
            .with_column_widths(&RAG_COLUMN_WIDTHS),
        None => rag_sheet(&default_rag_metrics()),
    };

    let row = sheet
        .rows
        .iter_mut()
        .skip(RAG_HEADER_ROW + 1)
        .find(|row| row.first().map(|cell| cell_label(cell) == key).unwrap_or(false))
        .with_context(|| format!("RAG metric key \"{}\" not found in sheet", key))?;
    if row.len() < 3 {
        row.resize(3, CellValue::Empty);
    }
    row[2] = CellValue::text(status.as_str());

    let staging = staging_path(path);
    upsert_sheet_xlsx(path, &staging, &sheet)?;
    fs::rename(&staging, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    info!(path = %path.display(), key, %status, "RAG status updated");
    Ok(())
}

/// Sibling file used to stage an in-place rewrite
fn staging_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", file_name))
}
